//! Random generator of valid, self-contained Go programs for differential
//! testing of Go toolchains.
//!
//! A run owns one [`context::Context`]: types, scopes and units are built
//! bottom-up while statements are emitted, then [`context::Context::assemble`]
//! lays the finished tree out as source files.
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod expr;
pub mod materialize;
pub mod path_de;
pub mod scope;
pub mod serialize;
pub mod stmt;
pub mod types;

use config::GenConfig;
use serialize::Program;

/// Generate the whole program for `seed`.
pub fn generate(seed: u64, config: GenConfig) -> Program {
    let mut ctx = context::Context::new(seed, config);
    ctx.generate();
    ctx.assemble()
}
