//! Error types raised by repository implementations.

use thiserror::Error;

/// Errors surfaced by repository implementations.
///
/// None of these are retried by the runtime; retry policy belongs to the
/// caller issuing the command.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("document repository lock was poisoned")]
    LockPoisoned,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("corrupted data: {0}")]
    CorruptedData(String),

    #[error("persistence unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, RepositoryError>;
