//! Transactional access to instance documents.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use game_core::{
    DayLedger, GameId, GameState, InstanceId, PendingGrace, PendingTransition, SignupSheet,
};

use super::{DocumentRepository, InstanceDocuments, RepositoryError, Result};

/// Persistence collaborator shared by every runtime component.
///
/// Transactions on the same instance are serialized by a per-instance async
/// mutex; transactions on different instances never contend.
#[derive(Clone)]
pub struct GameStore {
    repository: Arc<dyn DocumentRepository>,
    locks: Arc<Mutex<HashMap<InstanceId, Arc<AsyncMutex<()>>>>>,
}

impl GameStore {
    pub fn new(repository: Arc<dyn DocumentRepository>) -> Self {
        Self {
            repository,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Begins a transaction over every document of `instance`.
    ///
    /// Suspends until any other transaction on the instance has committed or
    /// been dropped. Instances that were never saved start from empty
    /// documents.
    pub async fn begin(&self, instance: InstanceId) -> Result<Transaction> {
        let lock = self.instance_lock(instance)?;
        let guard = lock.lock_owned().await;
        let documents = self.repository.load(instance)?.unwrap_or_default();

        Ok(Transaction {
            instance,
            documents,
            repository: Arc::clone(&self.repository),
            _guard: guard,
        })
    }

    /// Reads the committed documents of `instance` without taking its lock.
    pub fn read(&self, instance: InstanceId) -> Result<InstanceDocuments> {
        Ok(self.repository.load(instance)?.unwrap_or_default())
    }

    /// Reads the committed game state of `instance`.
    pub fn read_state(&self, instance: InstanceId) -> Result<GameState> {
        Ok(self.read(instance)?.state)
    }

    pub fn instances(&self) -> Result<Vec<InstanceId>> {
        self.repository.list_instances()
    }

    fn instance_lock(&self, instance: InstanceId) -> Result<Arc<AsyncMutex<()>>> {
        let mut locks = self.locks.lock().map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(Arc::clone(locks.entry(instance).or_default()))
    }
}

/// Working copy of an instance's documents.
///
/// Changes become visible only through [`Transaction::commit`]; dropping the
/// transaction discards them and releases the instance.
pub struct Transaction {
    instance: InstanceId,
    documents: InstanceDocuments,
    repository: Arc<dyn DocumentRepository>,
    _guard: OwnedMutexGuard<()>,
}

impl Transaction {
    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    pub fn documents(&self) -> &InstanceDocuments {
        &self.documents
    }

    pub fn state(&self) -> &GameState {
        &self.documents.state
    }

    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.documents.state
    }

    pub fn ledger(&self, day: u32) -> Option<&DayLedger> {
        self.documents.ledgers.get(&day)
    }

    /// The ledger of `day`, created empty if the day has no record yet.
    pub fn ledger_mut(&mut self, day: u32) -> &mut DayLedger {
        self.documents
            .ledgers
            .entry(day)
            .or_insert_with(|| DayLedger::new(day))
    }

    /// Starts `day` on an empty ledger, replacing any earlier record of it.
    pub fn open_ledger(&mut self, day: u32) {
        self.documents.ledgers.insert(day, DayLedger::new(day));
    }

    /// Drops every day ledger of the instance.
    pub fn clear_ledgers(&mut self) {
        self.documents.ledgers.clear();
    }

    pub fn signups(&self, game: GameId) -> Option<&SignupSheet> {
        self.documents.signups.get(&game)
    }

    pub fn signups_mut(&mut self, game: GameId) -> &mut SignupSheet {
        self.documents
            .signups
            .entry(game)
            .or_insert_with(|| SignupSheet::new(game))
    }

    pub fn pending_transition(&self) -> &PendingTransition {
        &self.documents.pending_transition
    }

    pub fn pending_transition_mut(&mut self) -> &mut PendingTransition {
        &mut self.documents.pending_transition
    }

    pub fn pending_grace(&self) -> &PendingGrace {
        &self.documents.pending_grace
    }

    pub fn pending_grace_mut(&mut self) -> &mut PendingGrace {
        &mut self.documents.pending_grace
    }

    /// Decodes the data stored under `extension`, or `T::default()` if none.
    pub fn extension_data<T>(&self, extension: &str) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        match self.documents.extension_data.get(extension) {
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| RepositoryError::CorruptedData(format!("{extension}: {e}"))),
            None => Ok(T::default()),
        }
    }

    pub fn set_extension_data<T: Serialize>(&mut self, extension: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value).map_err(|e| RepositoryError::Json(e.to_string()))?;
        self.documents
            .extension_data
            .insert(extension.to_owned(), value);
        Ok(())
    }

    pub fn clear_extension_data(&mut self, extension: &str) {
        self.documents.extension_data.remove(extension);
    }

    /// Saves the working copy and releases the instance.
    ///
    /// Returns the committed documents. On error nothing is published.
    pub fn commit(self) -> Result<InstanceDocuments> {
        self.repository.save(self.instance, &self.documents)?;
        Ok(self.documents)
    }
}
