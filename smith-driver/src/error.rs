use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid known-bug rules in {path}: {message}")]
    Rules { path: PathBuf, message: String },
    #[error("bad known-bug pattern for {key:?}: {source}")]
    Pattern {
        key: String,
        #[source]
        source: regex::Error,
    },
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl DriverError {
    pub fn io(action: &'static str, path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| DriverError::Io { action, path, source }
    }
}

pub type Result<T, E = DriverError> = std::result::Result<T, E>;
