use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenError {
    #[error("failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid limits file {path}: {message}")]
    Config { path: PathBuf, message: String },
}

impl GenError {
    pub fn io(action: &'static str, path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| GenError::Io { action, path, source }
    }
}

pub type Result<T, E = GenError> = std::result::Result<T, E>;
