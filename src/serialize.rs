//! Program assembly: every unit's top-level declarations spread over that
//! unit's files, plus the boilerplate each file needs to compile.
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::context::Context;
use crate::error::{GenError, Result};

/// One generated source file, relative to the output root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub text: String,
}

#[derive(Clone, Debug, Default)]
pub struct Program {
    pub files: Vec<SourceFile>,
}

const GC_STRESS: &str = "import \"runtime\"
func init() {
\tgo func() {
\t\tfor {
\t\t\truntime.GC()
\t\t\truntime.Gosched()
\t\t}
\t}()
}
";

impl Context {
    /// Lay the generated tree out as files. Each top-level declaration is
    /// written whole to a randomly chosen file of its unit.
    pub fn assemble(&mut self) -> Program {
        let mut program = Program::default();
        for u in 0..self.units.len() {
            let unit = &self.units[u];
            let mut texts: Vec<String> = (0..self.config.file_count())
                .map(|i| file_header(&unit.name, unit.imports.iter(), i))
                .collect();
            let decls = self.tree.block(unit.top).nodes.clone();
            for decl in decls {
                let file = self.rnd(texts.len());
                let mut lines = Vec::new();
                self.tree.collect_text(decl, &mut lines);
                for line in lines {
                    texts[file].push_str(&line);
                    texts[file].push('\n');
                }
            }
            let dir = PathBuf::from("src").join(&self.units[u].name);
            for (i, text) in texts.into_iter().enumerate() {
                program.files.push(SourceFile { path: dir.join(format!("{}.go", i)), text });
            }
        }
        program
    }
}

fn file_header<'a>(unit: &str, imports: impl Iterator<Item = &'a String> + Clone, index: usize) -> String {
    let mut out = format!("package {}\n", unit);
    for imp in imports.clone() {
        let _ = writeln!(out, "import \"{}\"", imp);
    }
    if index == 0 && unit == "main" {
        out.push_str(GC_STRESS);
    }
    for imp in imports {
        let _ = writeln!(out, "var _ = {}.UsePackage", imp);
    }
    if index == 0 {
        out.push_str("var UsePackage = 0\n");
        out.push_str("var SINK interface{}\n");
    }
    out
}

impl Program {
    /// Write every file under `dir`, creating the unit directories.
    pub fn write_to(&self, dir: &Path) -> Result<()> {
        for file in &self.files {
            let path = dir.join(&file.path);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(GenError::io("create directory", parent))?;
            }
            std::fs::write(&path, &file.text).map_err(GenError::io("write", &path))?;
        }
        debug!(files = self.files.len(), dir = %dir.display(), "program written");
        Ok(())
    }

    pub fn file(&self, path: impl AsRef<Path>) -> Option<&SourceFile> {
        self.files.iter().find(|f| f.path == path.as_ref())
    }

    /// Number of `.go` lines across every file, boilerplate included.
    pub fn line_count(&self) -> usize {
        self.files.iter().map(|f| f.text.lines().count()).sum()
    }
}
