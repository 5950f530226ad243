//! In-memory repository implementations for testing and development.

mod documents;

pub use documents::InMemoryDocumentRepo;
