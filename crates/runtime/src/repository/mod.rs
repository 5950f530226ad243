//! Repository layer for per-instance game documents.
//!
//! Every instance owns one [`InstanceDocuments`] bundle: the game state, the
//! per-day vote ledgers, signups, the pending schedules, and extension data.
//! [`DocumentRepository`] implementations decide where bundles live;
//! [`GameStore`] layers per-instance transactions on top so read-then-write
//! sequences are serializable.

mod documents;
mod error;
mod file;
mod memory;
mod store;
mod traits;

pub use documents::InstanceDocuments;
pub use error::{RepositoryError, Result};
pub use file::FileDocumentRepository;
pub use memory::InMemoryDocumentRepo;
pub use store::{GameStore, Transaction};
pub use traits::DocumentRepository;
