//! Process-wide catalogue of available extensions.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use super::builtin::{HiddenBoard, LastWords, WeightedVotes};
use super::{Extension, HookName};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogueError {
    #[error("extension `{0}` is registered twice")]
    DuplicateName(String),

    #[error("extension `{extension}` declares non-exclusive hook {hook} as exclusive")]
    NotExclusive {
        extension: String,
        hook: HookName,
    },
}

/// Every extension the process can offer, keyed by name.
///
/// Built once at startup; declarations are validated here so the registry can
/// trust them afterwards.
#[derive(Default)]
pub struct ExtensionCatalogue {
    extensions: BTreeMap<&'static str, Arc<dyn Extension>>,
}

impl ExtensionCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalogue containing the extensions shipped with the runtime.
    pub fn builtin() -> Result<Self, CatalogueError> {
        let mut catalogue = Self::new();
        catalogue.register(Arc::new(WeightedVotes))?;
        catalogue.register(Arc::new(HiddenBoard))?;
        catalogue.register(Arc::new(LastWords))?;
        Ok(catalogue)
    }

    pub fn register(&mut self, extension: Arc<dyn Extension>) -> Result<(), CatalogueError> {
        let name = extension.name();

        if let Some(hook) = extension
            .exclusive_hooks()
            .iter()
            .find(|hook| !hook.is_exclusive())
        {
            return Err(CatalogueError::NotExclusive {
                extension: name.to_owned(),
                hook: *hook,
            });
        }

        if self.extensions.contains_key(name) {
            return Err(CatalogueError::DuplicateName(name.to_owned()));
        }

        self.extensions.insert(name, extension);
        Ok(())
    }

    /// Builder-style [`ExtensionCatalogue::register`].
    pub fn with(mut self, extension: Arc<dyn Extension>) -> Result<Self, CatalogueError> {
        self.register(extension)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Extension>> {
        self.extensions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.extensions.contains_key(name)
    }

    /// Returns an iterator over names and descriptions (for listings).
    pub fn describe(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.extensions
            .values()
            .map(|extension| (extension.name(), extension.description()))
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;

    struct Misdeclared;

    #[async_trait]
    impl Extension for Misdeclared {
        fn name(&self) -> &'static str {
            "misdeclared"
        }

        fn exclusive_hooks(&self) -> &'static [HookName] {
            &[HookName::OnLock]
        }
    }

    #[test]
    fn builtin_catalogue_is_valid() {
        let catalogue = ExtensionCatalogue::builtin().unwrap();
        assert_eq!(catalogue.len(), 3);
        assert!(catalogue.contains("weighted-votes"));
        assert!(catalogue.contains("hidden-board"));
        assert!(catalogue.contains("last-words"));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut catalogue = ExtensionCatalogue::builtin().unwrap();
        let err = catalogue.register(Arc::new(HiddenBoard)).unwrap_err();
        assert_eq!(err, CatalogueError::DuplicateName("hidden-board".into()));
    }

    #[test]
    fn non_exclusive_declarations_are_rejected() {
        let err = ExtensionCatalogue::new()
            .with(Arc::new(Misdeclared))
            .err()
            .unwrap();
        assert_eq!(
            err,
            CatalogueError::NotExclusive {
                extension: "misdeclared".into(),
                hook: HookName::OnLock,
            }
        );
    }
}
