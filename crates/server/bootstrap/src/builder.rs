//! Builds the runtime and collaborators used by the server binary.
use std::sync::Arc;

use anyhow::{Context, Result};
use runtime::{
    ExtensionCatalogue, FileDocumentRepository, InMemoryDocumentRepo, Notifier, Runtime,
    StaticDirectory,
};
use tracing::info;

use crate::config::ServerConfig;

/// Builder that assembles a runtime from a [`ServerConfig`].
pub struct ServerBuilder {
    config: ServerConfig,
    catalogue: Option<ExtensionCatalogue>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl ServerBuilder {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            catalogue: None,
            notifier: None,
        }
    }

    /// Replace the built-in extension catalogue.
    pub fn catalogue(mut self, catalogue: ExtensionCatalogue) -> Self {
        self.catalogue = Some(catalogue);
        self
    }

    /// Chat platform notifier; messages are only logged when unset.
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn build(self) -> Result<ServerSetup> {
        let config = self.config;

        let directory = config
            .instances
            .iter()
            .fold(StaticDirectory::new(), |directory, instance| {
                directory.with_instance(instance.id, instance.channels)
            });

        let mut builder = Runtime::builder()
            .config(config.runtime.clone())
            .directory(Arc::new(directory));

        if config.in_memory {
            builder = builder.repository(Arc::new(InMemoryDocumentRepo::new()));
        } else {
            let data_dir = config.data_dir();
            let repository = FileDocumentRepository::new(&data_dir).with_context(|| {
                format!("Failed to open data directory {}", data_dir.display())
            })?;
            info!(target: "server", data_dir = %data_dir.display(), "Using file persistence");
            builder = builder.repository(Arc::new(repository));
        }

        if let Some(catalogue) = self.catalogue {
            builder = builder.catalogue(catalogue);
        }
        if let Some(notifier) = self.notifier {
            builder = builder.notifier(notifier);
        }

        let runtime = builder.build().context("Failed to assemble runtime")?;

        Ok(ServerSetup { config, runtime })
    }
}

pub struct ServerSetup {
    pub config: ServerConfig,
    pub runtime: Runtime,
}

#[cfg(test)]
mod tests {
    use game_core::{GameId, InstanceId, PlayerId};
    use runtime::{ChannelRef, InstanceChannels, TracingNotifier};

    use super::*;
    use crate::config::InstanceConfig;

    fn instance() -> InstanceConfig {
        InstanceConfig {
            id: InstanceId(1),
            channels: InstanceChannels {
                announcements: ChannelRef(10),
                votes: ChannelRef(20),
                operator: ChannelRef(30),
            },
        }
    }

    #[tokio::test]
    async fn file_backed_setup_persists_signups() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            instances: vec![instance()],
            data_dir: Some(dir.path().to_path_buf()),
            ..ServerConfig::default()
        };

        let setup = ServerBuilder::new(config.clone()).build().unwrap();
        setup
            .runtime
            .phases()
            .sign_up(InstanceId(1), GameId(1), PlayerId(5))
            .await
            .unwrap();
        drop(setup);

        let setup = ServerBuilder::new(config).build().unwrap();
        let report = setup
            .runtime
            .phases()
            .start(InstanceId(1), GameId(1))
            .await
            .unwrap();
        assert_eq!(report.state.player_count(), 1);
    }

    #[tokio::test]
    async fn in_memory_setup_enables_nothing_by_default() {
        let config = ServerConfig {
            in_memory: true,
            ..ServerConfig::default()
        };

        let setup = ServerBuilder::new(config)
            .catalogue(ExtensionCatalogue::builtin().unwrap())
            .notifier(Arc::new(TracingNotifier::new()))
            .build()
            .unwrap();
        assert_eq!(setup.runtime.extensions().catalogue().len(), 3);
        let state = setup.runtime.store().read_state(InstanceId(3)).unwrap();
        assert!(state.extensions.is_empty());
        assert!(!state.started);
    }
}
