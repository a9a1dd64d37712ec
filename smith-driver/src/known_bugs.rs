//! Known-bug rule tables.
//!
//! Rules are regexes grouped under a key: a full check identity such as
//! `gc..amd64.race`, a family such as `gccgo` or `exec`, or `all`. A failure
//! is looked up along the chain of keys its check names, most specific
//! first. Classification is a pure function of the tables and the text.
use std::path::Path;

use indexmap::IndexMap;
use regex::Regex;

use crate::error::{DriverError, Result};

#[derive(Clone, Debug, Default)]
pub struct KnownBugs {
    tables: IndexMap<String, Vec<Regex>>,
}

const ICE_REGS: &str = "internal compiler error: out of fixed registers";

const BUILTIN: &[(&str, &[&str])] = &[
    // the generator's own limitation, not a toolchain bug
    ("all", &["constant .* overflows"]),
    ("gc", &[]),
    ("gc..amd64", &[]),
    ("gc..386", &[ICE_REGS]),
    ("gc..arm", &[ICE_REGS]),
    ("gc..amd64.race", &[ICE_REGS, "internal compiler error: treecopy Name"]),
    (
        "gccgo",
        &[
            r"internal compiler error: in fold_binary_loc, at fold-const\.c",
            r"internal compiler error: in write_specific_type_functions, at go/gofrontend/types\.cc",
            r"internal compiler error: in fold_convert_loc, at fold-const\.c",
            r"internal compiler error: in do_determine_types, at go/gofrontend/statements\.cc",
            "internal compiler error: verify_gimple failed",
            r"internal compiler error: in descriptor, at go/gofrontend/gogo\.cc",
            r"internal compiler error: in check_bounds, at go/gofrontend/expressions\.cc",
            "error: too many arguments",
            "error: expected '<-' or '='",
            "error: slice end must be integer",
            "error: argument 2 has incompatible type",
            r"error: incompatible types in assignment \(multiple-value function call in single-value context\)",
            "__normal_iterator",
            "Unsafe_type_conversion_expression::do_get_backend",
        ],
    ),
    (
        "exec",
        &[
            "panic: ",
            "go of nil func value",
            "fatal error: all goroutines are asleep - deadlock!",
            // timeouts: gc aborts, gccgo prints Aborted
            "SIGABRT: abort",
            "Aborted",
            // generated programs may race
            "DATA RACE",
            "limit on 8192 simultaneously alive goroutines is exceeded",
            "fatal error: out of memory",
            "unexpected return pc for runtime.goexit called from 0x0",
            "__go_map_delete",
            r"ssa/interp\.\(\*frame\)\.runDefers",
        ],
    ),
    ("ssa", &[]),
    ("cover", &["syntax error near GoCover_"]),
    ("gofmt", &[]),
];

impl KnownBugs {
    pub fn builtin() -> Self {
        let mut bugs = Self::default();
        for (key, patterns) in BUILTIN {
            for pattern in *patterns {
                // the built-in table is fixed; a bad entry is a bug here
                match Regex::new(pattern) {
                    Ok(re) => bugs.push(key, re),
                    Err(err) => tracing::error!(key, %err, "skipping built-in rule"),
                }
            }
            bugs.tables.entry(key.to_string()).or_default();
        }
        bugs
    }

    fn push(&mut self, key: &str, re: Regex) {
        self.tables.entry(key.to_string()).or_default().push(re);
    }

    /// Add rules from a JSON object of `{ "<key>": ["regex", ...] }`.
    pub fn extend_from_json(&mut self, src: &str, origin: &Path) -> Result<()> {
        let raw: IndexMap<String, Vec<String>> = crate::path_de::from_str_with_path(src)
            .map_err(|message| DriverError::Rules { path: origin.to_path_buf(), message })?;
        for (key, patterns) in raw {
            for pattern in patterns {
                let re = Regex::new(&pattern).map_err(|source| DriverError::Pattern { key: key.clone(), source })?;
                self.push(&key, re);
            }
        }
        Ok(())
    }

    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let src = std::fs::read_to_string(path).map_err(DriverError::io("read", path))?;
        self.extend_from_json(&src, path)
    }

    /// First rule matching `output` along `keys`.
    pub fn classify<'a, K: AsRef<str>>(&'a self, keys: &[K], output: &str) -> Option<&'a Regex> {
        keys.iter()
            .filter_map(|k| self.tables.get(k.as_ref()))
            .flat_map(|rules| rules.iter())
            .find(|re| re.is_match(output))
    }

    pub fn rule_count(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }
}
