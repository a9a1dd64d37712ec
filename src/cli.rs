//! Generator CLI: seed + limits → Go source tree under `--dir`.
use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::GenConfig;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// generate a random, valid Go program for toolchain differential testing
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    /// random seed; the same seed and limits always give the same program.
    /// Negative seeds are taken bit for bit as unsigned (-1 is 2^64-1)
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    seed: i64,

    /// output root; files land in <dir>/src/<unit>/<n>.go
    #[arg(long, default_value = "tmp")]
    dir: PathBuf,

    /// generate only the `main` unit
    #[arg(long)]
    single_unit: bool,

    /// one file per unit
    #[arg(long)]
    single_file: bool,

    /// allow goto (programs will usually not terminate)
    #[arg(long)]
    nonterminating: bool,

    /// JSON limits file; omitted fields keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

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
        let config = self.resolve_config()?;
        let seed = rng_seed(self.seed);
        let program = crate::generate(seed, config);
        program
            .write_to(&self.dir)
            .with_context(|| format!("writing program for seed {}", self.seed))?;
        info!(
            seed = self.seed,
            files = program.files.len(),
            lines = program.line_count(),
            dir = %self.dir.display(),
            "program generated"
        );
        Ok(())
    }

    /// Limits file first, then the mode flags on top.
    fn resolve_config(&self) -> anyhow::Result<GenConfig> {
        let mut config = match self.config.as_ref() {
            Some(path) => GenConfig::load(path)?,
            None => GenConfig::default(),
        };
        config.single_unit |= self.single_unit;
        config.single_file |= self.single_file;
        config.nonterminating |= self.nonterminating;
        Ok(config)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// Two's-complement reinterpretation: every `i64` the driver hands out names
/// a distinct generator seed.
fn rng_seed(seed: i64) -> u64 {
    u64::from_ne_bytes(seed.to_ne_bytes())
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .with(fmt::layer().without_time().with_writer(std::io::stderr))
        .try_init();
}
