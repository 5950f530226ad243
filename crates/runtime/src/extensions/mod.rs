//! Extension system for phase and vote hooks.
//!
//! Extensions are named plug-ins that react to phase transitions and may take
//! over vote handling or board rendering for the instances that enable them.
//!
//! # Architecture
//!
//! - Every extension is registered once in the [`ExtensionCatalogue`] at startup
//! - Instances enable extensions by name; the set lives in `GameState`
//! - Lifecycle hooks (`on_start`, `on_lock`, ...) fan out concurrently to every
//!   enabled extension after the transition is committed, and failures are
//!   collected into a [`HookReport`] instead of aborting the others
//! - `on_vote` and `on_votes` are exclusive: at most one enabled extension per
//!   instance may declare each, and only that owner is consulted
//!
//! # Exclusivity
//!
//! The registry refuses to enable an extension whose exclusive hooks are
//! already owned by another enabled extension, so the owner lookup is always
//! unambiguous.

mod builtin;
mod catalogue;
mod fanout;
mod registry;

pub use builtin::{HiddenBoard, LastWords, WeightedVotes};
pub use catalogue::{CatalogueError, ExtensionCatalogue};
pub use fanout::{AggregateHookFailure, HookFailure, HookReport, fan_out};
pub use registry::{ConflictError, ExtensionRegistry};

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use game_core::{BoardView, GameState, HammerOutcome, InstanceId, PlayerId};

use crate::directory::InstanceChannels;
use crate::notify::{Notifier, NotifyError};
use crate::repository::{GameStore, RepositoryError, Transaction};
use crate::voting::Ballot;

/// Closed set of hook names an extension can participate in.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "camelCase")]
pub enum HookName {
    OnStart,
    OnLock,
    OnUnlock,
    OnEnd,
    OnHammer,
    OnRemove,
    OnVote,
    OnVotes,
}

impl HookName {
    /// Exclusive hooks have a single owner per instance.
    pub const fn is_exclusive(self) -> bool {
        matches!(self, HookName::OnVote | HookName::OnVotes)
    }
}

#[derive(Debug, Error)]
pub enum HookError {
    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Notify(#[from] NotifyError),
}

impl HookError {
    pub fn failed(reason: impl Into<String>) -> Self {
        HookError::Failed(reason.into())
    }
}

pub type HookResult = Result<(), HookError>;

/// Everything a lifecycle hook can see and use.
///
/// `state` is the committed state after the transition. The instance is not
/// locked while hooks run; extensions that persist data open their own
/// transaction through `store`.
pub struct HookContext<'a> {
    pub instance: InstanceId,
    pub state: &'a GameState,
    pub store: &'a GameStore,
    pub notifier: &'a dyn Notifier,
    pub channels: &'a InstanceChannels,
}

/// Result of an `on_vote` override, shaped like the default vote path.
#[derive(Debug, Clone)]
pub struct VoteOutcome {
    /// Board text to post in reply to the vote.
    pub reply: String,
    pub hammer: HammerOutcome,
    /// Ledger position of the recorded vote, if one was recorded.
    pub recorded: Option<LedgerEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerEntry {
    pub day: u32,
    pub index: usize,
}

#[async_trait]
pub trait Extension: Send + Sync {
    /// Unique name used to enable the extension and key its data.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str {
        ""
    }

    /// Exclusive hooks this extension takes ownership of when enabled.
    fn exclusive_hooks(&self) -> &'static [HookName] {
        &[]
    }

    async fn on_start(&self, _ctx: &HookContext<'_>) -> HookResult {
        Ok(())
    }

    async fn on_lock(&self, _ctx: &HookContext<'_>) -> HookResult {
        Ok(())
    }

    async fn on_unlock(&self, _ctx: &HookContext<'_>, _incremented: bool) -> HookResult {
        Ok(())
    }

    async fn on_end(&self, _ctx: &HookContext<'_>) -> HookResult {
        Ok(())
    }

    async fn on_hammer(&self, _ctx: &HookContext<'_>, _target: PlayerId) -> HookResult {
        Ok(())
    }

    async fn on_remove(&self, _ctx: &HookContext<'_>, _player: PlayerId) -> HookResult {
        Ok(())
    }

    /// Records a vote in place of the default path.
    ///
    /// Runs inside the vote's transaction. Returning `Ok(None)` falls back to
    /// the default path, in which case nothing may have been appended.
    async fn on_vote(
        &self,
        _ballot: &Ballot<'_>,
        _tx: &mut Transaction,
    ) -> Result<Option<VoteOutcome>, HookError> {
        Ok(None)
    }

    /// Renders the vote board in place of the default rendering.
    fn on_votes(&self, _view: &BoardView<'_>) -> Option<String> {
        None
    }
}

/// A lifecycle hook invocation together with its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookCall {
    Start,
    Lock,
    Unlock { incremented: bool },
    End,
    Hammer { target: PlayerId },
    Remove { player: PlayerId },
}

impl HookCall {
    pub fn hook(&self) -> HookName {
        match self {
            HookCall::Start => HookName::OnStart,
            HookCall::Lock => HookName::OnLock,
            HookCall::Unlock { .. } => HookName::OnUnlock,
            HookCall::End => HookName::OnEnd,
            HookCall::Hammer { .. } => HookName::OnHammer,
            HookCall::Remove { .. } => HookName::OnRemove,
        }
    }

    fn invoke<'a>(
        self,
        extension: &'a dyn Extension,
        ctx: &'a HookContext<'a>,
    ) -> BoxFuture<'a, HookResult> {
        match self {
            HookCall::Start => extension.on_start(ctx),
            HookCall::Lock => extension.on_lock(ctx),
            HookCall::Unlock { incremented } => extension.on_unlock(ctx, incremented),
            HookCall::End => extension.on_end(ctx),
            HookCall::Hammer { target } => extension.on_hammer(ctx, target),
            HookCall::Remove { player } => extension.on_remove(ctx, player),
        }
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn only_vote_hooks_are_exclusive() {
        let exclusive: Vec<HookName> = HookName::iter().filter(|h| h.is_exclusive()).collect();
        assert_eq!(exclusive, vec![HookName::OnVote, HookName::OnVotes]);
    }

    #[test]
    fn hook_names_render_in_camel_case() {
        assert_eq!(HookName::OnVotes.to_string(), "onVotes");
        assert_eq!(HookCall::Unlock { incremented: true }.hook(), HookName::OnUnlock);
    }
}
