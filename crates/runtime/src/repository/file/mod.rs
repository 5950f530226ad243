//! File-based repository implementations.

mod documents;

pub use documents::FileDocumentRepository;
