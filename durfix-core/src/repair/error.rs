use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepairError {
    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        source: std::io::Error,
    },
    #[error("{tool} exited with status {status:?}: {stderr}")]
    Command {
        tool: String,
        status: Option<i32>,
        stderr: String,
    },
    #[error("{tool} timed out after {limit:?}")]
    Timeout { tool: String, limit: Duration },
    #[error("io error at {path}: {source}")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
}

impl RepairError {
    pub(crate) fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        RepairError::Io {
            source,
            path: path.into(),
        }
    }
}

pub type RepairResult<T> = Result<T, RepairError>;
