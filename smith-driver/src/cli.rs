//! Driver CLI: configure the harness, start the workers, report forever.
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::checks::{CheckSet, pipeline};
use crate::known_bugs::KnownBugs;
use crate::stats::Stats;
use crate::supervisor::Supervisor;
use crate::test_run::Harness;
use crate::toolchain::Toolchain;
use crate::worker::{SeedCounter, spawn_workers};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// run generated Go programs through every enabled toolchain check, forever
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    /// number of parallel workers (default: available parallelism)
    #[arg(short = 'p', long)]
    workers: Option<usize>,

    /// comma-delimited checkers (amd64,386,arm,wasm,wasip1,race,gccgo,ssa,cover,gofmt,exec) or `all`
    #[arg(long, default_value = "all")]
    checkers: String,

    /// working directory; seeds live in <workdir>/tmp, failures in <workdir>/bug
    #[arg(long, default_value = "./work")]
    workdir: PathBuf,

    /// per-task timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// seconds between SIGABRT and SIGTERM for a timed-out task
    #[arg(long, default_value_t = 5)]
    grace: u64,

    #[arg(long, default_value = "gosmith")]
    generator: PathBuf,

    #[arg(long, default_value = "go")]
    go: PathBuf,

    #[arg(long, default_value = "gofmt")]
    gofmt: PathBuf,

    #[arg(long, default_value = "ssadump")]
    ssadump: PathBuf,

    /// extra known-bug rules: JSON object of check key → list of regexes
    #[arg(long)]
    known_bugs: Option<PathBuf>,

    /// first seed minus one (default: derived from the clock)
    #[arg(long, allow_negative_numbers = true)]
    seed: Option<i64>,

    /// seconds between statistics lines
    #[arg(long, default_value_t = 3)]
    report_interval: u64,

    /// debug logging
    #[arg(short, long)]
    verbose: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }
    pub fn run(&self) -> anyhow::Result<()> {
        init_tracing(self.verbose);
        let workers = self.workers.unwrap_or_else(default_parallelism).max(1);
        let harness = Arc::new(self.harness()?);
        harness.prepare().context("preparing the work directory")?;

        let first = self.seed.unwrap_or_else(|| chrono::Utc::now().timestamp_micros());
        info!(workers, checks = harness.checks.len(), rules = harness.rules.rule_count(), first_seed = first, "testing");
        let stats = Arc::clone(&harness.stats);
        let _pool = spawn_workers(harness, Arc::new(SeedCounter::starting_at(first)), workers)?;
        stats.report_forever(Duration::from_secs(self.report_interval.max(1)))
    }

    pub fn harness(&self) -> anyhow::Result<Harness> {
        let mut rules = KnownBugs::builtin();
        if let Some(path) = self.known_bugs.as_ref() {
            rules.load_file(path)?;
        }
        Ok(Harness {
            workdir: self.workdir.clone(),
            checks: pipeline(&CheckSet::new(self.checkers.as_str())),
            rules,
            supervisor: Supervisor::new(Duration::from_secs(self.timeout), Duration::from_secs(self.grace)),
            toolchain: Toolchain {
                generator: self.generator.clone(),
                go: self.go.clone(),
                gofmt: self.gofmt.clone(),
                ssadump: self.ssadump.clone(),
            },
            stats: Arc::new(Stats::default()),
        })
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn default_parallelism() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .with(fmt::layer())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_flags() {
        let cli = CommandLineInterface::parse_from(["smith-driver"]);
        assert_eq!(cli.checkers, "all");
        assert_eq!(cli.workdir, PathBuf::from("./work"));
        assert_eq!(cli.timeout, 10);
        let harness = cli.harness().unwrap();
        assert_eq!(harness.supervisor.grace, Duration::from_secs(5));
        assert_eq!(harness.checks.len(), 17);
    }

    #[test]
    fn checkers_narrow_the_pipeline() {
        let cli = CommandLineInterface::parse_from(["smith-driver", "-p", "2", "--checkers", "gofmt"]);
        assert_eq!(cli.workers, Some(2));
        assert_eq!(cli.harness().unwrap().checks, [crate::checks::Check::Gofmt]);
    }
}
