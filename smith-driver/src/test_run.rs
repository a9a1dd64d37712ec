//! One seed end to end: generate, run the pipeline until the first novel
//! failure, then archive or discard the scratch directory.
//!
//! Nothing in here returns an error to the worker loop. Harness I/O
//! problems are logged and the run carries on as far as it can.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::checks::{Category, Check};
use crate::known_bugs::KnownBugs;
use crate::stats::Stats;
use crate::supervisor::{Outcome, Supervisor};
use crate::toolchain::{self, Target, Toolchain};

/// Everything a worker needs; shared read-only between workers apart from
/// the atomic statistics.
#[derive(Debug)]
pub struct Harness {
    pub workdir: PathBuf,
    pub checks: Vec<Check>,
    pub rules: KnownBugs,
    pub supervisor: Supervisor,
    pub toolchain: Toolchain,
    pub stats: Arc<Stats>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    /// Failed, but matched this known-bug rule.
    Known(String),
    Novel { reason: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    GenerationFailed,
    Clean,
    Archived { check: String, reason: String },
}

pub struct TestRun<'a> {
    harness: &'a Harness,
    seed: i64,
    dir: PathBuf,
    /// Absolute `dir`, for GOPATH.
    gopath: PathBuf,
    keep: bool,
}

impl Harness {
    pub fn scratch_dir(&self, seed: i64) -> PathBuf {
        self.workdir.join("tmp").join(seed.to_string())
    }

    pub fn bug_dir(&self, seed: i64) -> PathBuf {
        self.workdir.join("bug").join(seed.to_string())
    }

    pub fn prepare(&self) -> crate::error::Result<()> {
        for sub in ["tmp", "bug"] {
            let dir = self.workdir.join(sub);
            std::fs::create_dir_all(&dir).map_err(crate::error::DriverError::io("create", dir))?;
        }
        Ok(())
    }

    pub fn run_seed(&self, seed: i64) -> RunOutcome {
        let dir = self.scratch_dir(seed);
        let gopath = std::path::absolute(&dir).unwrap_or_else(|_| dir.clone());
        let mut run = TestRun { harness: self, seed, dir, gopath, keep: false };
        let outcome = run.execute();
        run.teardown();
        Stats::bump(&self.stats.total);
        outcome
    }
}

impl TestRun<'_> {
    fn execute(&mut self) -> RunOutcome {
        if let Err(err) = std::fs::create_dir_all(&self.dir) {
            warn!(seed = self.seed, %err, "cannot create scratch directory");
        }
        if !self.generate() {
            Stats::bump(&self.harness.stats.generator);
            return RunOutcome::GenerationFailed;
        }
        for check in &self.harness.checks {
            let verdict = self.run_check(check);
            match verdict {
                Verdict::Pass => {}
                Verdict::Known(rule) => {
                    debug!(seed = self.seed, check = %check.identity(), rule, "known bug");
                    Stats::bump(&self.harness.stats.known);
                }
                Verdict::Novel { reason } => {
                    self.keep = true;
                    self.bump_failure(check.category());
                    info!(seed = self.seed, check = %check.identity(), "{}", reason);
                    return RunOutcome::Archived { check: check.identity(), reason };
                }
            }
        }
        RunOutcome::Clean
    }

    fn generate(&self) -> bool {
        let cmd = self.harness.toolchain.generate(self.seed, &self.dir);
        match self.harness.supervisor.run(cmd) {
            Ok(out) if out.success() => true,
            Ok(out) => {
                warn!(seed = self.seed, output = %out.output.trim_end(), "generator failed");
                false
            }
            Err(err) => {
                warn!(seed = self.seed, %err, "generator failed");
                false
            }
        }
    }

    fn teardown(&self) {
        if self.keep {
            let bug = self.harness.bug_dir(self.seed);
            if let Err(err) = std::fs::rename(&self.dir, &bug) {
                warn!(seed = self.seed, %err, "cannot archive {}", self.dir.display());
            }
        } else if let Err(err) = std::fs::remove_dir_all(&self.dir) {
            warn!(seed = self.seed, %err, "cannot remove {}", self.dir.display());
        }
    }

    fn bump_failure(&self, category: Category) {
        let stats = &self.harness.stats;
        Stats::bump(match category {
            Category::Build => &stats.build,
            Category::Exec => &stats.exec,
            Category::Ssadump => &stats.ssadump,
            Category::Gofmt => &stats.gofmt,
        });
    }

    // ---- Checks ---- //

    fn run_check(&self, check: &Check) -> Verdict {
        let tc = &self.harness.toolchain;
        let cmd = match check {
            Check::Build(t) => tc.build(t, &self.dir, &self.gopath),
            Check::Exec(t) => match self.built_binary(t) {
                Some(bin) => tc.exec(t, &bin),
                None => return Verdict::Pass,
            },
            Check::Ssa(mode) => tc.ssadump(*mode, &self.gopath),
            Check::Cover(t) => tc.cover(t, &self.dir, &self.gopath),
            Check::Gofmt => return self.gofmt_all(),
        };
        let Some(out) = self.supervise(cmd) else { return Verdict::Pass };
        if out.success() {
            return Verdict::Pass;
        }
        self.classify(check, &out.output)
    }

    /// Run through the supervisor; a tool that cannot even start is a
    /// harness problem, not a finding.
    fn supervise(&self, cmd: std::process::Command) -> Option<Outcome> {
        match self.harness.supervisor.run(cmd) {
            Ok(out) => Some(out),
            Err(err) => {
                warn!(seed = self.seed, %err, "skipping check");
                None
            }
        }
    }

    /// Known-bug lookup; a novel failure leaves its output in a file named
    /// after the check.
    fn classify(&self, check: &Check, output: &str) -> Verdict {
        if let Some(rule) = self.harness.rules.classify(&check.rule_keys(), output) {
            return Verdict::Known(rule.as_str().to_string());
        }
        self.write_artifact(&self.dir.join(check.identity()), output.as_bytes());
        Verdict::Novel { reason: format!("{} {}", check.identity(), check.reason()) }
    }

    fn built_binary(&self, target: &Target) -> Option<PathBuf> {
        let bin = toolchain::binary_path(target, &self.dir);
        bin.is_file().then_some(bin)
    }

    fn write_artifact(&self, path: &Path, data: &[u8]) {
        if let Err(err) = std::fs::write(path, data) {
            warn!(seed = self.seed, %err, "cannot write {}", path.display());
        }
    }

    // ---- Formatter ---- //

    fn gofmt_all(&self) -> Verdict {
        let pattern = self.dir.join("src").join("*").join("*.go");
        let files: Vec<PathBuf> = match glob::glob(&pattern.to_string_lossy()) {
            Ok(paths) => paths.filter_map(|p| p.ok()).collect(),
            Err(err) => {
                warn!(seed = self.seed, %err, "bad source pattern");
                return Verdict::Pass;
            }
        };
        for file in files {
            let verdict = self.gofmt_file(&file);
            if verdict != Verdict::Pass {
                return verdict;
            }
        }
        Verdict::Pass
    }

    /// Format twice: both runs must succeed, agree byte for byte, and
    /// differ from the original only in characters gofmt may move.
    fn gofmt_file(&self, file: &Path) -> Verdict {
        let tc = &self.harness.toolchain;
        let artifact = |suffix: &str| {
            let mut name = file.as_os_str().to_owned();
            name.push(suffix);
            PathBuf::from(name)
        };
        let Some(first) = self.supervise(tc.gofmt(file)) else { return Verdict::Pass };
        if !first.success() {
            return self.gofmt_failure(Some(&artifact(".gofmt")), &first.output, "gofmt failed");
        }
        let formatted = artifact(".formatted");
        self.write_artifact(&formatted, first.output.as_bytes());

        let Some(second) = self.supervise(tc.gofmt(&formatted)) else { return Verdict::Pass };
        if !second.success() {
            return self.gofmt_failure(Some(&artifact(".gofmt")), &second.output, "gofmt failed");
        }
        self.write_artifact(&artifact(".formatted2"), second.output.as_bytes());

        if first.output != second.output {
            return self.gofmt_failure(None, "", "nonidempotent gofmt");
        }
        let original = match std::fs::read_to_string(file) {
            Ok(text) => text,
            Err(err) => {
                warn!(seed = self.seed, %err, "cannot read {}", file.display());
                return Verdict::Pass;
            }
        };
        let (before, after) = (strip_insignificant(&original), strip_insignificant(&first.output));
        if before != after {
            self.write_artifact(&artifact(".stripped0"), wrap_lines(&before, 80).as_bytes());
            self.write_artifact(&artifact(".stripped1"), wrap_lines(&after, 80).as_bytes());
            return self.gofmt_failure(None, "", "corrupting gofmt");
        }
        Verdict::Pass
    }

    /// Formatter failures go through the `gofmt` rules when there is
    /// output to match; mismatches have none and are always novel.
    fn gofmt_failure(&self, artifact: Option<&Path>, output: &str, reason: &str) -> Verdict {
        if !output.is_empty() {
            if let Some(rule) = self.harness.rules.classify(&Check::Gofmt.rule_keys(), output) {
                return Verdict::Known(rule.as_str().to_string());
            }
        }
        if let Some(path) = artifact {
            self.write_artifact(path, output.as_bytes());
        }
        Verdict::Novel { reason: reason.to_string() }
    }
}

/// Drop the characters gofmt is allowed to add, remove or shuffle.
pub fn strip_insignificant(text: &str) -> String {
    text.chars().filter(|c| !matches!(c, ' ' | '\t' | '\n' | '(' | ')' | ',' | ';')).collect()
}

/// Break `text` into `width`-character lines.
pub fn wrap_lines(text: &str, width: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + text.len() / width + 1);
    for chunk in chars.chunks(width) {
        out.extend(chunk);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stripping_ignores_layout_and_grouping() {
        let a = "x := f(a, b);\n\tif (x) {\n}\n";
        let b = "x := f(a,b)\nif x {}\n";
        assert_eq!(strip_insignificant(a), strip_insignificant(b));
        assert_ne!(strip_insignificant("x + y"), strip_insignificant("x - y"));
    }

    #[test]
    fn wrapping_is_fixed_width() {
        let text = "a".repeat(170);
        let wrapped = wrap_lines(&text, 80);
        let lens: Vec<usize> = wrapped.lines().map(str::len).collect();
        assert_eq!(lens, [80, 80, 10]);
    }
}
