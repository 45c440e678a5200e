//! Worker process error types

use thiserror::Error;

/// Worker-process errors
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("worker not installed: {0}")]
    NotInstalled(String),

    #[error("failed to configure worker: {0}")]
    ConfigureFailed(String),

    #[error("failed to spawn worker: {0}")]
    SpawnFailed(String),

    #[error("a worker is already running for this tab")]
    AlreadyRunning,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<WorkerError> for String {
    fn from(err: WorkerError) -> String {
        err.to_string()
    }
}
