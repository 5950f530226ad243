//! Unified error types surfaced by the runtime API.
//!
//! Wraps failures from game rules, the extension registry, persistence, and
//! the chat collaborators so callers can bubble them up with consistent
//! context.

use thiserror::Error;

use game_core::ValidationError;

use crate::directory::DirectoryError;
use crate::extensions::{CatalogueError, ConflictError, HookError};
use crate::notify::NotifyError;

pub use crate::repository::RepositoryError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    /// A game rule rejected the operation; nothing was changed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error("unknown extension `{0}`")]
    UnknownExtension(String),

    #[error(transparent)]
    Catalogue(#[from] CatalogueError),

    /// The store could not be read or written; nothing was changed.
    #[error(transparent)]
    Persistence(#[from] RepositoryError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Notify(#[from] NotifyError),

    /// The extension owning the vote hook failed; the vote was not recorded.
    #[error("extension `{extension}` failed to record the vote")]
    VoteHook {
        extension: &'static str,
        #[source]
        source: HookError,
    },

    #[error("vote {index} of day {day} does not exist")]
    MissingVote { day: u32, index: usize },
}

impl RuntimeError {
    /// Whether the failure is a rule rejection rather than an infrastructure fault.
    pub fn is_validation(&self) -> bool {
        matches!(self, RuntimeError::Validation(_))
    }
}
