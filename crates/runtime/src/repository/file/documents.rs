//! File-based DocumentRepository implementation.

use std::fs;
use std::path::{Path, PathBuf};

use game_core::InstanceId;

use crate::repository::{DocumentRepository, InstanceDocuments, RepositoryError, Result};

/// File-based implementation of DocumentRepository.
///
/// Stores each instance as `instance_{id}.json`. Writes go to a temp file and
/// are renamed into place, so a crash never leaves a half-written bundle.
pub struct FileDocumentRepository {
    base_dir: PathBuf,
}

impl FileDocumentRepository {
    /// Create a new file-based repository rooted at `base_dir`.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir).map_err(RepositoryError::Io)?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn instance_path(&self, instance: InstanceId) -> PathBuf {
        self.base_dir.join(format!("instance_{}.json", instance))
    }
}

impl DocumentRepository for FileDocumentRepository {
    fn load(&self, instance: InstanceId) -> Result<Option<InstanceDocuments>> {
        let path = self.instance_path(instance);

        if !path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&path).map_err(RepositoryError::Io)?;
        let documents: InstanceDocuments = serde_json::from_slice(&bytes).map_err(|e| {
            RepositoryError::CorruptedData(format!("{}: {}", path.display(), e))
        })?;

        tracing::trace!("Loaded instance[{}] from {}", instance, path.display());

        Ok(Some(documents))
    }

    fn save(&self, instance: InstanceId, documents: &InstanceDocuments) -> Result<()> {
        let path = self.instance_path(instance);
        let temp_path = path.with_extension("json.tmp");

        let bytes = serde_json::to_vec_pretty(documents)
            .map_err(|e| RepositoryError::Json(e.to_string()))?;

        fs::write(&temp_path, bytes).map_err(RepositoryError::Io)?;

        // Atomic rename
        fs::rename(&temp_path, &path).map_err(RepositoryError::Io)?;

        tracing::debug!("Saved instance[{}] to {}", instance, path.display());

        Ok(())
    }

    fn delete(&self, instance: InstanceId) -> Result<()> {
        let path = self.instance_path(instance);

        if path.exists() {
            fs::remove_file(&path).map_err(RepositoryError::Io)?;
            tracing::debug!("Deleted instance[{}]", instance);
        }

        Ok(())
    }

    fn list_instances(&self) -> Result<Vec<InstanceId>> {
        let mut ids = Vec::new();

        let entries = fs::read_dir(&self.base_dir).map_err(RepositoryError::Io)?;

        for entry in entries {
            let entry = entry.map_err(RepositoryError::Io)?;
            let path = entry.path();

            if let Some(filename) = path.file_name().and_then(|s| s.to_str())
                && let Some(id) = filename
                    .strip_prefix("instance_")
                    .and_then(|s| s.strip_suffix(".json"))
                && let Ok(id) = id.parse::<u64>()
            {
                ids.push(InstanceId(id));
            }
        }

        ids.sort_unstable();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_core::{GameId, Player, PlayerId};
    use tempfile::TempDir;

    fn setup() -> (TempDir, FileDocumentRepository) {
        let temp_dir = TempDir::new().unwrap();
        let repo = FileDocumentRepository::new(temp_dir.path()).unwrap();
        (temp_dir, repo)
    }

    #[test]
    fn test_save_and_load() {
        let (_temp, repo) = setup();

        let mut documents = InstanceDocuments::default();
        documents
            .state
            .start(GameId(4), vec![Player::new(PlayerId(1)), Player::new(PlayerId(2))])
            .unwrap();
        documents.ledgers.insert(0, game_core::DayLedger::new(0));
        repo.save(InstanceId(7), &documents).unwrap();

        let loaded = repo.load(InstanceId(7)).unwrap();
        assert_eq!(loaded, Some(documents));
        assert!(repo.load(InstanceId(8)).unwrap().is_none());
    }

    #[test]
    fn test_list_and_delete() {
        let (_temp, repo) = setup();

        repo.save(InstanceId(20), &InstanceDocuments::default()).unwrap();
        repo.save(InstanceId(3), &InstanceDocuments::default()).unwrap();
        assert_eq!(
            repo.list_instances().unwrap(),
            vec![InstanceId(3), InstanceId(20)]
        );

        repo.delete(InstanceId(3)).unwrap();
        assert_eq!(repo.list_instances().unwrap(), vec![InstanceId(20)]);
    }

    #[test]
    fn test_corrupted_file_is_reported() {
        let (temp, repo) = setup();

        fs::write(temp.path().join("instance_5.json"), b"{not json").unwrap();
        let err = repo.load(InstanceId(5)).unwrap_err();
        assert!(matches!(err, RepositoryError::CorruptedData(_)));
    }
}
