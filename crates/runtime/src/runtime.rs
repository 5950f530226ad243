//! Runtime assembly and scheduling entry points.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::watch;
use tracing::info;

use game_core::{InstanceId, PendingGrace, PendingTransition, TransitionKind};

use crate::api::Result;
use crate::clock::{Clock, SystemClock};
use crate::directory::{CachedDirectory, InstanceChannels, InstanceDirectory, StaticDirectory};
use crate::events::{EventBus, ScheduleEvent};
use crate::extensions::{ExtensionCatalogue, ExtensionRegistry};
use crate::notify::{Notifier, TracingNotifier};
use crate::phase::PhaseOrchestrator;
use crate::repository::{DocumentRepository, GameStore, InMemoryDocumentRepo};
use crate::voting::VoteEngine;
use crate::workers::{
    GraceJob, JobKind, ScheduleSignals, ScheduleWorker, ScheduledJob, SchedulerHandle,
    TransitionJob,
};

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Period of every scheduler worker.
    pub tick_interval: Duration,
    /// How early a tick may claim a pending change before its time.
    pub schedule_epsilon: Duration,
    pub event_buffer_size: usize,
    pub directory_cache_capacity: usize,
    pub directory_cache_ttl: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(15),
            schedule_epsilon: Duration::from_secs(25),
            event_buffer_size: 100,
            directory_cache_capacity: 256,
            directory_cache_ttl: Duration::from_secs(300),
        }
    }
}

/// Main runtime: every collaborator wired together.
///
/// Cheap to clone; clones share the same store, registry, and event bus.
#[derive(Clone)]
pub struct Runtime {
    config: RuntimeConfig,
    store: GameStore,
    extensions: ExtensionRegistry,
    phases: PhaseOrchestrator,
    votes: VoteEngine,
    events: EventBus,
    clock: Arc<dyn Clock>,
    signals: ScheduleSignals,
}

impl Runtime {
    /// Create a new runtime builder
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn store(&self) -> &GameStore {
        &self.store
    }

    pub fn extensions(&self) -> &ExtensionRegistry {
        &self.extensions
    }

    pub fn phases(&self) -> &PhaseOrchestrator {
        &self.phases
    }

    pub fn votes(&self) -> &VoteEngine {
        &self.votes
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Replaces the pending lock/unlock of `instance`.
    ///
    /// Any earlier record is discarded, including one a worker has already
    /// claimed and is waiting on.
    pub async fn schedule_transition(
        &self,
        instance: InstanceId,
        when: DateTime<Utc>,
        kind: TransitionKind,
        increment_day: bool,
        grace: bool,
    ) -> Result<()> {
        let pending = PendingTransition::at(when, kind)
            .increment_day(increment_day)
            .grace(grace);
        self.write_transition(instance, pending).await
    }

    pub async fn cancel_transition(&self, instance: InstanceId) -> Result<()> {
        self.write_transition(instance, PendingTransition::default())
            .await
    }

    /// Replaces the pending grace change of `instance`.
    pub async fn schedule_grace(
        &self,
        instance: InstanceId,
        when: DateTime<Utc>,
        target: bool,
    ) -> Result<()> {
        self.write_grace(instance, PendingGrace::at(when, target))
            .await
    }

    pub async fn cancel_grace(&self, instance: InstanceId) -> Result<()> {
        self.write_grace(instance, PendingGrace::default()).await
    }

    pub fn transition_job(&self) -> TransitionJob {
        TransitionJob::new(
            self.store.clone(),
            self.phases.clone(),
            Arc::clone(&self.clock),
            self.signals.clone(),
            self.events.clone(),
            self.epsilon(),
        )
    }

    pub fn grace_job(&self) -> GraceJob {
        GraceJob::new(
            self.store.clone(),
            self.phases.clone(),
            Arc::clone(&self.clock),
            self.signals.clone(),
            self.events.clone(),
            self.epsilon(),
        )
    }

    /// Spawns the transition and grace workers of `instance`.
    pub fn spawn_schedulers(&self, instance: InstanceId) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let jobs: [Arc<dyn ScheduledJob>; 2] =
            [Arc::new(self.transition_job()), Arc::new(self.grace_job())];

        let tasks = jobs
            .into_iter()
            .map(|job| {
                let worker = ScheduleWorker::new(
                    instance,
                    job,
                    self.config.tick_interval,
                    self.phases.clone(),
                    self.events.clone(),
                    shutdown_rx.clone(),
                );
                tokio::spawn(worker.run())
            })
            .collect();

        SchedulerHandle::new(shutdown_tx, tasks)
    }

    async fn write_transition(&self, instance: InstanceId, pending: PendingTransition) -> Result<()> {
        let when = pending.when;
        let mut tx = self.store.begin(instance).await?;
        *tx.pending_transition_mut() = pending;
        self.signals.bump(instance, JobKind::Transition);
        tx.commit()?;

        info!(target: "runtime::scheduler", %instance, ?when, "Transition scheduled");
        self.events.publish(ScheduleEvent::Scheduled {
            instance,
            job: JobKind::Transition,
            when,
        });
        Ok(())
    }

    async fn write_grace(&self, instance: InstanceId, pending: PendingGrace) -> Result<()> {
        let when = pending.when;
        let mut tx = self.store.begin(instance).await?;
        *tx.pending_grace_mut() = pending;
        self.signals.bump(instance, JobKind::Grace);
        tx.commit()?;

        info!(target: "runtime::scheduler", %instance, ?when, "Grace change scheduled");
        self.events.publish(ScheduleEvent::Scheduled {
            instance,
            job: JobKind::Grace,
            when,
        });
        Ok(())
    }

    fn epsilon(&self) -> TimeDelta {
        TimeDelta::from_std(self.config.schedule_epsilon).unwrap_or(TimeDelta::MAX)
    }
}

/// Builder for assembling a [`Runtime`].
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    repository: Option<Arc<dyn DocumentRepository>>,
    catalogue: Option<ExtensionCatalogue>,
    notifier: Option<Arc<dyn Notifier>>,
    directory: Option<Arc<dyn InstanceDirectory>>,
    clock: Option<Arc<dyn Clock>>,
}

impl RuntimeBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            repository: None,
            catalogue: None,
            notifier: None,
            directory: None,
            clock: None,
        }
    }

    /// Override runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Document storage; defaults to an in-memory repository.
    pub fn repository(mut self, repository: Arc<dyn DocumentRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Available extensions; defaults to [`ExtensionCatalogue::builtin`].
    pub fn catalogue(mut self, catalogue: ExtensionCatalogue) -> Self {
        self.catalogue = Some(catalogue);
        self
    }

    /// Chat notifier; defaults to logging every message.
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Instance directory; lookups are cached per the configured capacity and
    /// TTL. Defaults to posting every instance to channel 0.
    pub fn directory(mut self, directory: Arc<dyn InstanceDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<Runtime> {
        let config = self.config;

        let repository = self
            .repository
            .unwrap_or_else(|| Arc::new(InMemoryDocumentRepo::new()));
        let catalogue = match self.catalogue {
            Some(catalogue) => catalogue,
            None => ExtensionCatalogue::builtin()?,
        };
        let notifier = self
            .notifier
            .unwrap_or_else(|| Arc::new(TracingNotifier::new()));
        let directory = self.directory.unwrap_or_else(|| {
            Arc::new(StaticDirectory::new().with_fallback(InstanceChannels::default()))
        });
        let directory: Arc<dyn InstanceDirectory> = Arc::new(CachedDirectory::new(
            directory,
            config.directory_cache_capacity,
            config.directory_cache_ttl,
        ));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let store = GameStore::new(repository);
        let events = EventBus::with_capacity(config.event_buffer_size);
        let extensions = ExtensionRegistry::new(Arc::new(catalogue), store.clone());
        let phases = PhaseOrchestrator::new(
            store.clone(),
            extensions.clone(),
            Arc::clone(&notifier),
            directory,
            events.clone(),
        );
        let votes = VoteEngine::new(
            store.clone(),
            extensions.clone(),
            phases.clone(),
            notifier,
            events.clone(),
            Arc::clone(&clock),
        );

        info!(
            target: "runtime",
            extensions = extensions.catalogue().len(),
            tick_interval = ?config.tick_interval,
            "Runtime assembled"
        );

        Ok(Runtime {
            config,
            store,
            extensions,
            phases,
            votes,
            events,
            clock,
            signals: ScheduleSignals::default(),
        })
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
