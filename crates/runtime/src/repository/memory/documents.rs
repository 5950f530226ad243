//! In-memory DocumentRepository implementation for tests and local runs.

use std::collections::HashMap;
use std::sync::RwLock;

use game_core::InstanceId;

use crate::repository::{DocumentRepository, InstanceDocuments, RepositoryError, Result};

/// In-memory implementation of DocumentRepository.
///
/// Thread-safe but not persistent across process restarts.
pub struct InMemoryDocumentRepo {
    instances: RwLock<HashMap<InstanceId, InstanceDocuments>>,
}

impl InMemoryDocumentRepo {
    /// Create a new empty in-memory repository.
    pub fn new() -> Self {
        Self {
            instances: RwLock::new(HashMap::new()),
        }
    }

    /// Create with one instance already populated.
    pub fn with_instance(instance: InstanceId, documents: InstanceDocuments) -> Self {
        let mut instances = HashMap::new();
        instances.insert(instance, documents);
        Self {
            instances: RwLock::new(instances),
        }
    }
}

impl Default for InMemoryDocumentRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentRepository for InMemoryDocumentRepo {
    fn load(&self, instance: InstanceId) -> Result<Option<InstanceDocuments>> {
        let instances = self
            .instances
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(instances.get(&instance).cloned())
    }

    fn save(&self, instance: InstanceId, documents: &InstanceDocuments) -> Result<()> {
        let mut instances = self
            .instances
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        instances.insert(instance, documents.clone());
        Ok(())
    }

    fn delete(&self, instance: InstanceId) -> Result<()> {
        let mut instances = self
            .instances
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        instances.remove(&instance);
        Ok(())
    }

    fn list_instances(&self) -> Result<Vec<InstanceId>> {
        let instances = self
            .instances
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        let mut ids: Vec<InstanceId> = instances.keys().copied().collect();
        ids.sort_unstable();
        Ok(ids)
    }
}
