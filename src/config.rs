//! Generation limits and modes.
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GenError, Result};

/// Hard bounds on program shape. Every recursive production consults these,
/// which is what makes generation terminate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenConfig {
    /// Compilation units (`main`, `a`, `b`, ...).
    pub units: usize,
    /// Output files per unit.
    pub files: usize,
    /// Statements per unit.
    pub statements: usize,
    pub expr_depth: usize,
    /// Expressions per statement.
    pub expr_count: usize,
    /// Expressions per unit.
    pub total_expr_count: usize,
    pub type_depth: usize,
    pub single_unit: bool,
    pub single_file: bool,
    /// Allow `goto`, which usually yields programs that never exit.
    pub nonterminating: bool,
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            units: 3,
            files: 3,
            statements: 30,
            expr_depth: 6,
            expr_count: 20,
            total_expr_count: 1000,
            type_depth: 3,
            single_unit: false,
            single_file: false,
            nonterminating: false,
        }
    }
}

impl GenConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let src = std::fs::read_to_string(path).map_err(GenError::io("read", path))?;
        crate::path_de::from_str_with_path(&src).map_err(|message| GenError::Config {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn unit_count(&self) -> usize {
        if self.single_unit { 1 } else { self.units.max(1) }
    }

    pub fn file_count(&self) -> usize {
        if self.single_file { 1 } else { self.files.max(1) }
    }
}
