//! Per-instance extension enablement with exclusive hook ownership.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use game_core::{GameState, InstanceId};

use super::{Extension, ExtensionCatalogue, HookName};
use crate::api::{Result, RuntimeError};
use crate::repository::GameStore;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("extension `{extension}` cannot take {hook}: already owned by `{owner}`")]
pub struct ConflictError {
    pub extension: String,
    pub hook: HookName,
    pub owner: String,
}

/// Resolves which catalogue extensions are active for an instance.
///
/// The enabled set itself is part of `GameState`; the registry only mutates it
/// through store transactions and answers lookups against a given state.
#[derive(Clone)]
pub struct ExtensionRegistry {
    catalogue: Arc<ExtensionCatalogue>,
    store: GameStore,
}

impl ExtensionRegistry {
    pub fn new(catalogue: Arc<ExtensionCatalogue>, store: GameStore) -> Self {
        Self { catalogue, store }
    }

    pub fn catalogue(&self) -> &ExtensionCatalogue {
        &self.catalogue
    }

    /// Enables `name` for `instance`.
    ///
    /// Enabling an already-enabled extension is a no-op. Fails without any
    /// change if another enabled extension owns one of its exclusive hooks.
    pub async fn enable(&self, instance: InstanceId, name: &str) -> Result<()> {
        let extension = self
            .catalogue
            .get(name)
            .ok_or_else(|| RuntimeError::UnknownExtension(name.to_owned()))?;

        let mut tx = self.store.begin(instance).await?;
        if tx.state().is_extension_enabled(name) {
            return Ok(());
        }

        self.check_conflicts(tx.state(), extension.as_ref())?;
        tx.state_mut().enable_extension(name);
        tx.commit()?;

        info!(target: "runtime::extensions", %instance, extension = name, "Extension enabled");
        Ok(())
    }

    /// Disables `name` for `instance`; returns whether it was enabled.
    pub async fn disable(&self, instance: InstanceId, name: &str) -> Result<bool> {
        if !self.catalogue.contains(name) {
            return Err(RuntimeError::UnknownExtension(name.to_owned()));
        }

        let mut tx = self.store.begin(instance).await?;
        if !tx.state_mut().disable_extension(name) {
            return Ok(false);
        }
        tx.commit()?;

        info!(target: "runtime::extensions", %instance, extension = name, "Extension disabled");
        Ok(true)
    }

    /// Checks `candidate` against the exclusive hooks owned in `state`.
    pub fn check_conflicts(
        &self,
        state: &GameState,
        candidate: &dyn Extension,
    ) -> std::result::Result<(), ConflictError> {
        for hook in candidate.exclusive_hooks() {
            if let Some(owner) = self.exclusive_owner(state, *hook)
                && owner.name() != candidate.name()
            {
                return Err(ConflictError {
                    extension: candidate.name().to_owned(),
                    hook: *hook,
                    owner: owner.name().to_owned(),
                });
            }
        }
        Ok(())
    }

    /// Enabled extensions of `state`, in enable order.
    ///
    /// Names no longer present in the catalogue are skipped.
    pub fn enabled(&self, state: &GameState) -> Vec<Arc<dyn Extension>> {
        state
            .extensions
            .iter()
            .filter_map(|name| self.catalogue.get(name))
            .cloned()
            .collect()
    }

    /// The enabled extension owning the exclusive `hook`, if any.
    pub fn exclusive_owner(&self, state: &GameState, hook: HookName) -> Option<Arc<dyn Extension>> {
        state
            .extensions
            .iter()
            .filter_map(|name| self.catalogue.get(name))
            .find(|extension| extension.exclusive_hooks().contains(&hook))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::repository::InMemoryDocumentRepo;

    struct RivalWeights;

    #[async_trait]
    impl Extension for RivalWeights {
        fn name(&self) -> &'static str {
            "rival-weights"
        }

        fn exclusive_hooks(&self) -> &'static [HookName] {
            &[HookName::OnVote]
        }
    }

    fn registry() -> ExtensionRegistry {
        let catalogue = ExtensionCatalogue::builtin()
            .and_then(|c| c.with(Arc::new(RivalWeights)))
            .unwrap();
        let store = GameStore::new(Arc::new(InMemoryDocumentRepo::new()));
        ExtensionRegistry::new(Arc::new(catalogue), store)
    }

    #[tokio::test]
    async fn second_owner_of_an_exclusive_hook_is_rejected() {
        let registry = registry();
        let instance = InstanceId(1);

        registry.enable(instance, "weighted-votes").await.unwrap();
        let err = registry.enable(instance, "rival-weights").await.unwrap_err();
        match err {
            RuntimeError::Conflict(conflict) => {
                assert_eq!(conflict.hook, HookName::OnVote);
                assert_eq!(conflict.owner, "weighted-votes");
            }
            other => panic!("unexpected error: {other}"),
        }

        let state = registry.store.read_state(instance).unwrap();
        assert_eq!(state.extensions, vec!["weighted-votes".to_string()]);
    }

    #[tokio::test]
    async fn reenabling_is_a_noop_and_disable_frees_the_hook() {
        let registry = registry();
        let instance = InstanceId(1);

        registry.enable(instance, "weighted-votes").await.unwrap();
        registry.enable(instance, "weighted-votes").await.unwrap();
        assert_eq!(registry.store.read_state(instance).unwrap().extensions.len(), 1);

        assert!(registry.disable(instance, "weighted-votes").await.unwrap());
        assert!(!registry.disable(instance, "weighted-votes").await.unwrap());
        registry.enable(instance, "rival-weights").await.unwrap();

        let state = registry.store.read_state(instance).unwrap();
        let owner = registry.exclusive_owner(&state, HookName::OnVote).unwrap();
        assert_eq!(owner.name(), "rival-weights");
    }

    #[tokio::test]
    async fn unknown_extensions_are_rejected() {
        let registry = registry();
        assert!(matches!(
            registry.enable(InstanceId(1), "nope").await,
            Err(RuntimeError::UnknownExtension(name)) if name == "nope"
        ));
    }
}
