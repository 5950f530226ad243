#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};

use game_core::{GameId, InstanceId, MessageId, PlayerId};
use runtime::{
    ChannelRef, Clock, DocumentRepository, Extension, ExtensionCatalogue, HookContext, HookError,
    HookResult, InMemoryDocumentRepo, InstanceChannels, InstanceDocuments, Message, Notifier,
    NotifyError, RepositoryError, Runtime, RuntimeConfig, StaticDirectory,
};

pub const INSTANCE: InstanceId = InstanceId(1);
pub const GAME: GameId = GameId(7);

pub const CHANNELS: InstanceChannels = InstanceChannels {
    announcements: ChannelRef(10),
    votes: ChannelRef(20),
    operator: ChannelRef(30),
};

/// Notifier that keeps every message and can be told to reject one channel.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(ChannelRef, Message)>>,
    reject: Mutex<Option<ChannelRef>>,
}

impl RecordingNotifier {
    pub fn reject(&self, channel: ChannelRef) {
        *self.reject.lock().unwrap() = Some(channel);
    }

    pub fn sent(&self) -> Vec<(ChannelRef, Message)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts_on(&self, channel: ChannelRef) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(sent_to, _)| *sent_to == channel)
            .map(|(_, message)| match message {
                Message::Text(text) => text,
                Message::Board { body, .. } => body,
            })
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, channel: ChannelRef, message: Message) -> Result<MessageId, NotifyError> {
        if *self.reject.lock().unwrap() == Some(channel) {
            return Err(NotifyError {
                channel,
                reason: "channel rejected".into(),
            });
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push((channel, message));
        Ok(MessageId(sent.len() as u64))
    }
}

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()),
        }
    }

    pub fn advance(&self, delta: TimeDelta) {
        *self.now.lock().unwrap() += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Extension whose lifecycle hooks fail (or succeed) on demand.
pub struct ScriptedExtension {
    pub name: &'static str,
    pub fail_with: Option<&'static str>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedExtension {
    pub fn ok(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            fail_with: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(name: &'static str, reason: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            fail_with: Some(reason),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> HookResult {
        self.calls.lock().unwrap().push(call);
        match self.fail_with {
            Some(reason) => Err(HookError::failed(reason)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Extension for ScriptedExtension {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn on_start(&self, _ctx: &HookContext<'_>) -> HookResult {
        self.record("start".into())
    }

    async fn on_lock(&self, ctx: &HookContext<'_>) -> HookResult {
        // the committed state must already be visible
        assert!(ctx.state.locked);
        self.record("lock".into())
    }

    async fn on_unlock(&self, _ctx: &HookContext<'_>, incremented: bool) -> HookResult {
        self.record(format!("unlock:{incremented}"))
    }

    async fn on_end(&self, _ctx: &HookContext<'_>) -> HookResult {
        self.record("end".into())
    }

    async fn on_hammer(&self, _ctx: &HookContext<'_>, target: PlayerId) -> HookResult {
        self.record(format!("hammer:{target}"))
    }

    async fn on_remove(&self, _ctx: &HookContext<'_>, player: PlayerId) -> HookResult {
        self.record(format!("remove:{player}"))
    }
}

/// In-memory repository whose writes can be switched off.
#[derive(Default)]
pub struct FlakyRepository {
    inner: InMemoryDocumentRepo,
    down: AtomicBool,
}

impl FlakyRepository {
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }
}

impl DocumentRepository for FlakyRepository {
    fn load(&self, instance: InstanceId) -> Result<Option<InstanceDocuments>, RepositoryError> {
        self.inner.load(instance)
    }

    fn save(&self, instance: InstanceId, documents: &InstanceDocuments) -> Result<(), RepositoryError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("store offline".into()));
        }
        self.inner.save(instance, documents)
    }

    fn delete(&self, instance: InstanceId) -> Result<(), RepositoryError> {
        self.inner.delete(instance)
    }
}

pub struct Harness {
    pub runtime: Runtime,
    pub notifier: Arc<RecordingNotifier>,
    pub clock: Arc<ManualClock>,
}

pub struct HarnessBuilder {
    catalogue: ExtensionCatalogue,
    repository: Arc<dyn DocumentRepository>,
    config: RuntimeConfig,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            catalogue: ExtensionCatalogue::builtin().expect("builtin catalogue is valid"),
            repository: Arc::new(InMemoryDocumentRepo::new()),
            config: RuntimeConfig::default(),
        }
    }

    pub fn extension(mut self, extension: Arc<dyn Extension>) -> Self {
        self.catalogue
            .register(extension)
            .expect("test extension registers");
        self
    }

    pub fn repository(mut self, repository: Arc<dyn DocumentRepository>) -> Self {
        self.repository = repository;
        self
    }

    pub fn build(self) -> Harness {
        let notifier = Arc::new(RecordingNotifier::default());
        let clock = Arc::new(ManualClock::new());
        let runtime = Runtime::builder()
            .config(self.config)
            .catalogue(self.catalogue)
            .repository(self.repository)
            .notifier(notifier.clone())
            .directory(Arc::new(StaticDirectory::new().with_instance(INSTANCE, CHANNELS)))
            .clock(clock.clone())
            .build()
            .expect("runtime builds");

        Harness {
            runtime,
            notifier,
            clock,
        }
    }
}

impl Harness {
    pub fn new() -> Self {
        HarnessBuilder::new().build()
    }

    /// Signs up players `1..=players`, starts the game, and unlocks day 1.
    pub async fn open_day_one(&self, players: u64) {
        let phases = self.runtime.phases();
        for player in 1..=players {
            phases
                .sign_up(INSTANCE, GAME, PlayerId(player))
                .await
                .expect("sign up succeeds");
        }
        phases.start(INSTANCE, GAME).await.expect("game starts");
        phases.unlock(INSTANCE, true).await.expect("day 1 opens");
    }
}
