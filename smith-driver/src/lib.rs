//! Differential-testing driver for Go toolchains.
//!
//! Workers draw seeds, have the external generator write a program for
//! each, and push it through the enabled checks. Failures matching a
//! known-bug rule are counted and dropped; anything else is archived under
//! `<workdir>/bug/<seed>` together with the tool output.
pub mod checks;
pub mod cli;
pub mod error;
pub mod known_bugs;
pub mod path_de;
pub mod stats;
pub mod supervisor;
pub mod test_run;
pub mod toolchain;
pub mod worker;
