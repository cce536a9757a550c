use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io { source: io::Error, path: PathBuf },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        source: toml::de::Error,
        path: PathBuf,
    },
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that abort a whole duration-fix pass.
#[derive(Debug, Error)]
pub enum FixerError {
    #[error("input directory {} not found", .0.display())]
    InputMissing(PathBuf),
    #[error("io error at {path}: {source}")]
    Io { source: io::Error, path: PathBuf },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl FixerError {
    pub(crate) fn io(source: io::Error, path: impl Into<PathBuf>) -> Self {
        FixerError::Io {
            source,
            path: path.into(),
        }
    }
}

pub type FixerResult<T> = std::result::Result<T, FixerError>;
