//! Phase transition orchestrator.
//!
//! Every transition follows the same sequence:
//! 1. Begin a transaction on the instance and check the rule preconditions
//! 2. Mutate and commit; a rejected precondition leaves the store untouched
//! 3. Announce the transition and fan the matching hook out to every enabled
//!    extension, concurrently
//! 4. Mirror any failure to the instance's operator channel
//!
//! Nothing after the commit can roll the transition back; failures of step 3
//! are returned in the [`TransitionReport`] instead.

use std::sync::Arc;

use tracing::{info, warn};

use game_core::{
    Alignment, GameId, GameState, InstanceId, PlayerId, SignupSheet, Transition, ValidationError,
};

use crate::api::Result;
use crate::directory::{InstanceChannels, InstanceDirectory};
use crate::events::{EventBus, PhaseEvent};
use crate::extensions::{ExtensionRegistry, HookCall, HookContext, HookReport, fan_out};
use crate::notify::{Message, Notifier};
use crate::repository::GameStore;

/// Outcome of a committed transition.
#[derive(Debug, Clone)]
pub struct TransitionReport {
    pub transition: Transition,
    /// State as committed by the transition.
    pub state: GameState,
    pub hooks: HookReport,
}

#[derive(Clone)]
pub struct PhaseOrchestrator {
    store: GameStore,
    registry: ExtensionRegistry,
    notifier: Arc<dyn Notifier>,
    directory: Arc<dyn InstanceDirectory>,
    events: EventBus,
}

impl PhaseOrchestrator {
    pub fn new(
        store: GameStore,
        registry: ExtensionRegistry,
        notifier: Arc<dyn Notifier>,
        directory: Arc<dyn InstanceDirectory>,
        events: EventBus,
    ) -> Self {
        Self {
            store,
            registry,
            notifier,
            directory,
            events,
        }
    }

    /// Starts `game` with its signups, locked on day 0.
    pub async fn start(&self, instance: InstanceId, game: GameId) -> Result<TransitionReport> {
        let channels = self.directory.channels(instance).await?;

        let mut tx = self.store.begin(instance).await?;
        let roster = tx
            .signups(game)
            .map(SignupSheet::roster)
            .unwrap_or_default();
        let transition = tx.state_mut().start(game, roster)?;
        tx.clear_ledgers();
        tx.open_ledger(0);
        let documents = tx.commit()?;

        Ok(self
            .complete(instance, &channels, transition, documents.state, HookCall::Start)
            .await)
    }

    pub async fn lock(&self, instance: InstanceId) -> Result<TransitionReport> {
        let channels = self.directory.channels(instance).await?;

        let mut tx = self.store.begin(instance).await?;
        let transition = tx.state_mut().lock()?;
        let documents = tx.commit()?;

        Ok(self
            .complete(instance, &channels, transition, documents.state, HookCall::Lock)
            .await)
    }

    /// Opens voting, advancing to a fresh day ledger when `increment` is set.
    ///
    /// Without `increment` the current day resumes with its votes intact.
    pub async fn unlock(&self, instance: InstanceId, increment: bool) -> Result<TransitionReport> {
        let channels = self.directory.channels(instance).await?;

        let mut tx = self.store.begin(instance).await?;
        let transition = tx.state_mut().unlock(increment)?;
        let day = tx.state().day;
        if increment {
            tx.open_ledger(day);
        } else {
            tx.ledger_mut(day);
        }
        let documents = tx.commit()?;

        Ok(self
            .complete(
                instance,
                &channels,
                transition,
                documents.state,
                HookCall::Unlock {
                    incremented: increment,
                },
            )
            .await)
    }

    pub async fn end(&self, instance: InstanceId) -> Result<TransitionReport> {
        let channels = self.directory.channels(instance).await?;

        let mut tx = self.store.begin(instance).await?;
        let transition = tx.state_mut().end()?;
        tx.clear_ledgers();
        let documents = tx.commit()?;

        Ok(self
            .complete(instance, &channels, transition, documents.state, HookCall::End)
            .await)
    }

    /// Adds `player` to the signups of `game`. Only while no game runs.
    pub async fn sign_up(&self, instance: InstanceId, game: GameId, player: PlayerId) -> Result<()> {
        let mut tx = self.store.begin(instance).await?;
        if tx.state().started {
            return Err(ValidationError::AlreadyStarted.into());
        }
        tx.signups_mut(game).sign_up(player)?;
        tx.commit()?;
        Ok(())
    }

    pub async fn withdraw(&self, instance: InstanceId, game: GameId, player: PlayerId) -> Result<()> {
        let mut tx = self.store.begin(instance).await?;
        if tx.state().started {
            return Err(ValidationError::AlreadyStarted.into());
        }
        tx.signups_mut(game).withdraw(player)?;
        tx.commit()?;
        Ok(())
    }

    pub async fn set_grace(&self, instance: InstanceId, grace: bool) -> Result<()> {
        let mut tx = self.store.begin(instance).await?;
        tx.state_mut().grace = grace;
        tx.commit()?;

        self.events.publish(PhaseEvent::GraceChanged { instance, grace });
        Ok(())
    }

    pub async fn set_hammer(&self, instance: InstanceId, enabled: bool) -> Result<()> {
        let mut tx = self.store.begin(instance).await?;
        tx.state_mut().hammer_enabled = enabled;
        tx.commit()?;
        Ok(())
    }

    pub async fn set_alignment(
        &self,
        instance: InstanceId,
        player: PlayerId,
        alignment: Alignment,
    ) -> Result<()> {
        let mut tx = self.store.begin(instance).await?;
        tx.state_mut().set_alignment(player, alignment)?;
        tx.commit()?;
        Ok(())
    }

    /// Removes a player from the running game and fans out `on_remove`.
    pub async fn remove_player(&self, instance: InstanceId, player: PlayerId) -> Result<HookReport> {
        let channels = self.directory.channels(instance).await?;

        let mut tx = self.store.begin(instance).await?;
        tx.state_mut().remove_player(player)?;
        let documents = tx.commit()?;

        info!(target: "runtime::phase", %instance, %player, "Player removed");
        self.events.publish(PhaseEvent::PlayerRemoved { instance, player });

        Ok(self
            .dispatch(instance, &channels, &documents.state, HookCall::Remove { player })
            .await)
    }

    /// Fans `call` out to the extensions enabled in `state` and reports failures.
    pub(crate) async fn dispatch(
        &self,
        instance: InstanceId,
        channels: &InstanceChannels,
        state: &GameState,
        call: HookCall,
    ) -> HookReport {
        let extensions = self.registry.enabled(state);
        let ctx = HookContext {
            instance,
            state,
            store: &self.store,
            notifier: self.notifier.as_ref(),
            channels,
        };

        let hooks = fan_out(&extensions, call, &ctx).await;
        self.mirror_failures(instance, channels, &hooks).await;
        hooks
    }

    pub(crate) async fn channels(&self, instance: InstanceId) -> Result<InstanceChannels> {
        Ok(self.directory.channels(instance).await?)
    }

    /// Posts `text` to the operator channel, logging rather than returning failures.
    pub(crate) async fn alert_operator(&self, instance: InstanceId, text: String) {
        let channels = match self.directory.channels(instance).await {
            Ok(channels) => channels,
            Err(e) => {
                warn!(target: "runtime::phase", %instance, error = %e, "Operator channel unavailable");
                return;
            }
        };
        if let Err(e) = self.notifier.send(channels.operator, Message::Text(text)).await {
            warn!(target: "runtime::phase", %instance, error = %e, "Failed to alert operator channel");
        }
    }

    async fn complete(
        &self,
        instance: InstanceId,
        channels: &InstanceChannels,
        transition: Transition,
        state: GameState,
        call: HookCall,
    ) -> TransitionReport {
        info!(
            target: "runtime::phase",
            %instance,
            transition = transition.as_str(),
            day = state.day,
            "Transition committed"
        );
        self.events.publish(PhaseEvent::Transitioned {
            instance,
            transition,
            day: state.day,
        });

        let extensions = self.registry.enabled(&state);
        let ctx = HookContext {
            instance,
            state: &state,
            store: &self.store,
            notifier: self.notifier.as_ref(),
            channels,
        };
        let announcement = Message::text(announcement(&transition, &state));

        let (announced, mut hooks) = tokio::join!(
            self.notifier.send(channels.announcements, announcement),
            fan_out(&extensions, call, &ctx)
        );
        if let Err(e) = announced {
            warn!(target: "runtime::phase", %instance, error = %e, "Announcement failed");
            hooks.record_failure("announcement", e);
        }

        self.mirror_failures(instance, channels, &hooks).await;

        TransitionReport {
            transition,
            state,
            hooks,
        }
    }

    async fn mirror_failures(
        &self,
        instance: InstanceId,
        channels: &InstanceChannels,
        hooks: &HookReport,
    ) {
        let Some(failure) = hooks.failure() else {
            return;
        };

        self.events.publish(PhaseEvent::HooksFailed {
            instance,
            hook: hooks.hook,
            failed: hooks.failed_sources(),
        });

        let alert = Message::text(format!("{} failed:\n{}", hooks.hook, failure));
        if let Err(e) = self.notifier.send(channels.operator, alert).await {
            warn!(
                target: "runtime::phase",
                %instance,
                error = %e,
                "Failed to alert operator channel"
            );
        }
    }
}

fn announcement(transition: &Transition, state: &GameState) -> String {
    match transition {
        Transition::Start { game } => format!(
            "Game {game} has started with {} players. Day {} is locked.",
            state.player_count(),
            state.day
        ),
        Transition::Lock => format!("Day {} is now locked.", state.day),
        Transition::Unlock { .. } => format!("Day {} is open for voting.", state.day),
        Transition::End => "The game has ended.".to_owned(),
    }
}
