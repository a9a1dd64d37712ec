//! The check pipeline: which checks run, in what order, and how a failure
//! of each is keyed, labelled and counted.
use crate::toolchain::{COVER_TARGET, SsaMode, TARGETS, Target};

/// `--checkers` allow-list. A check is on when the list is `all` or
/// contains its name as a substring.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckSet(String);

impl CheckSet {
    pub fn new(list: impl Into<String>) -> Self {
        Self(list.into())
    }

    pub fn enabled(&self, name: &str) -> bool {
        self.0 == "all" || self.0.contains(name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Check {
    Build(Target),
    Exec(Target),
    Ssa(SsaMode),
    Cover(Target),
    Gofmt,
}

/// Which statistics counter a failure of a check bumps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Category {
    Build,
    Exec,
    Ssadump,
    Gofmt,
}

impl Check {
    /// Name used in logs and artifact files.
    pub fn identity(&self) -> String {
        match self {
            Check::Build(t) => t.key(),
            Check::Exec(t) => format!("exec.{}", t.key()),
            Check::Ssa(SsaMode::Dump) => "ssadump".to_string(),
            Check::Ssa(SsaMode::Run) => "ssadump.run".to_string(),
            Check::Cover(t) => format!("cover.{}", t.key()),
            Check::Gofmt => "gofmt".to_string(),
        }
    }

    /// Known-bug table keys, most specific first.
    pub fn rule_keys(&self) -> Vec<String> {
        let mut keys = vec![self.identity()];
        match self {
            Check::Build(t) => keys.push(t.compiler.to_string()),
            Check::Exec(_) | Check::Ssa(SsaMode::Run) => keys.push("exec".to_string()),
            Check::Ssa(SsaMode::Dump) => keys.push("ssa".to_string()),
            Check::Cover(t) => keys.extend([t.key(), t.compiler.to_string(), "cover".to_string()]),
            Check::Gofmt => {}
        }
        keys.push("all".to_string());
        keys
    }

    pub fn category(&self) -> Category {
        match self {
            Check::Build(_) | Check::Cover(_) => Category::Build,
            Check::Exec(_) => Category::Exec,
            Check::Ssa(_) => Category::Ssadump,
            Check::Gofmt => Category::Gofmt,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Check::Build(_) => "build failed",
            Check::Exec(_) => "exec failed",
            Check::Ssa(SsaMode::Dump) => "ssadump failed",
            Check::Ssa(SsaMode::Run) => "ssadump.run failed",
            Check::Cover(_) => "cover build failed",
            Check::Gofmt => "gofmt failed",
        }
    }
}

/// Ordered checks enabled by `set`: every target's build followed by its
/// run, then the SSA interpreter, coverage and the formatter.
pub fn pipeline(set: &CheckSet) -> Vec<Check> {
    let exec = set.enabled("exec");
    let mut checks = Vec::new();
    for target in TARGETS.iter().filter(|t| set.enabled(t.checker)) {
        checks.push(Check::Build(*target));
        if exec && target.runnable {
            checks.push(Check::Exec(*target));
        }
    }
    if set.enabled("ssa") {
        checks.push(Check::Ssa(SsaMode::Dump));
        if exec {
            checks.push(Check::Ssa(SsaMode::Run));
        }
    }
    if set.enabled("cover") {
        checks.push(Check::Cover(COVER_TARGET));
    }
    if set.enabled("gofmt") {
        checks.push(Check::Gofmt);
    }
    checks
}
