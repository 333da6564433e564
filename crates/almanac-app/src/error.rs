use std::path::PathBuf;

use thiserror::Error;

/// Application-level errors (file loading and task plumbing)
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to read {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse task failed: {0}")]
    TaskError(#[from] tokio::task::JoinError),

    #[error(transparent)]
    RfcError(#[from] almanac_rfc::error::RfcError),

    #[error(transparent)]
    CoreError(#[from] almanac_core::error::CoreError),
}

pub type AppResult<T> = std::result::Result<T, AppError>;
