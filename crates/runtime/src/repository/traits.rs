//! Repository contract for saving and loading instance documents.

use game_core::InstanceId;

use super::{InstanceDocuments, Result};

/// Repository for per-instance document bundles.
///
/// Implementations only move bundles in and out of storage; isolation between
/// concurrent writers is provided by [`GameStore`](super::GameStore).
pub trait DocumentRepository: Send + Sync {
    /// Load the bundle of an instance, `None` if it was never saved.
    fn load(&self, instance: InstanceId) -> Result<Option<InstanceDocuments>>;

    /// Replace the bundle of an instance.
    fn save(&self, instance: InstanceId, documents: &InstanceDocuments) -> Result<()>;

    /// Delete the bundle of an instance.
    fn delete(&self, instance: InstanceId) -> Result<()>;

    /// List every instance with a saved bundle.
    fn list_instances(&self) -> Result<Vec<InstanceId>> {
        Ok(vec![])
    }
}
