//! Async runtime for the Mafia phase engine.
//!
//! This crate wires the pure rules of `game-core` to persistence, chat
//! collaborators, extensions, and timed workers. Consumers embed [`Runtime`]
//! to run phase transitions, place votes, and schedule lock/unlock changes.
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the builder and scheduling entry points
//! - [`phase`] and [`voting`] implement the transition and vote operations
//! - [`extensions`] provides the hook system, catalogue, and registry
//! - [`repository`] stores instance documents behind per-instance transactions
//! - [`events`] provides a topic-based event bus for observers
//! - [`notify`] and [`directory`] describe the chat platform collaborators
//! - `workers` keeps the scheduler tasks internal to the crate
pub mod api;
pub mod cache;
pub mod clock;
pub mod directory;
pub mod events;
pub mod extensions;
pub mod notify;
pub mod phase;
pub mod repository;
pub mod runtime;
pub mod voting;

mod workers;

pub use api::{Result, RuntimeError};
pub use cache::InstanceCache;
pub use clock::{Clock, SystemClock};
pub use directory::{
    CachedDirectory, DirectoryError, InstanceChannels, InstanceDirectory, StaticDirectory,
};
pub use events::{Event, EventBus, PhaseEvent, ScheduleEvent, Topic, VoteEvent};
pub use extensions::{
    AggregateHookFailure, CatalogueError, ConflictError, Extension, ExtensionCatalogue,
    ExtensionRegistry, HiddenBoard, HookCall, HookContext, HookError, HookFailure, HookName,
    HookReport, HookResult, LastWords, LedgerEntry, VoteOutcome, WeightedVotes,
};
pub use notify::{ChannelRef, Message, Notifier, NotifyError, TracingNotifier};
pub use phase::{PhaseOrchestrator, TransitionReport};
pub use repository::{
    DocumentRepository, FileDocumentRepository, GameStore, InMemoryDocumentRepo,
    InstanceDocuments, RepositoryError, Transaction,
};
pub use runtime::{Runtime, RuntimeBuilder, RuntimeConfig};
pub use voting::{Ballot, VoteEngine, VoteReceipt, VoteRecord};
pub use workers::{
    GraceJob, JobKind, ScheduleSignals, ScheduledJob, SchedulerHandle, TickOutcome, TransitionJob,
};
