//! Vote placement, tally, and hammer detection.
//!
//! A vote is validated, recorded, counted, and checked for a hammer inside a
//! single instance transaction, so concurrent votes always see each other in
//! commit order. The board message is posted afterwards and its id attached to
//! the ledger entry in a second, short transaction.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use game_core::{
    BoardView, HammerOutcome, InstanceId, MessageId, PlayerId, Tally, ValidationError, Vote,
    VoteTarget, render_board,
};

use crate::api::{Result, RuntimeError};
use crate::clock::Clock;
use crate::events::{EventBus, VoteEvent};
use crate::extensions::{
    Extension, ExtensionRegistry, HookCall, HookName, HookReport, LedgerEntry, VoteOutcome,
};
use crate::notify::{Message, Notifier};
use crate::phase::PhaseOrchestrator;
use crate::repository::{GameStore, Transaction};

/// A vote being placed, as seen by the vote path and by `on_vote` owners.
pub struct Ballot<'a> {
    pub instance: InstanceId,
    pub voter: PlayerId,
    pub target: VoteTarget,
    pub timestamp: DateTime<Utc>,
    board: Option<&'a dyn Extension>,
}

impl Ballot<'_> {
    /// Records the vote in the current day's ledger and evaluates the result.
    ///
    /// `weight` gives the multiplier of each voter; the default path uses 1.
    pub fn cast(&self, tx: &mut Transaction, weight: impl Fn(PlayerId) -> u32) -> VoteOutcome {
        let day = tx.state().day;
        let index = tx
            .ledger_mut(day)
            .append(Vote::new(self.voter, self.target, day, self.timestamp));

        let state = tx.state();
        let tally = tx
            .ledger(day)
            .map(|ledger| Tally::among(ledger, &state.players, weight))
            .unwrap_or_default();
        let hammer = tally.evaluate_hammer(self.target, state.player_count(), state.hammer_enabled);
        let reply = self.render_board(&BoardView {
            day,
            tally: &tally,
            players: &state.players,
            hammer_enabled: state.hammer_enabled,
        });

        VoteOutcome {
            reply,
            hammer,
            recorded: Some(LedgerEntry { day, index }),
        }
    }

    /// Renders through the `on_votes` owner, or the default board.
    pub fn render_board(&self, view: &BoardView<'_>) -> String {
        self.board
            .and_then(|extension| extension.on_votes(view))
            .unwrap_or_else(|| render_board(view))
    }
}

/// Handle for attaching the posted board message to the recorded vote.
#[derive(Clone)]
pub struct VoteRecord {
    store: GameStore,
    instance: InstanceId,
    entry: Option<LedgerEntry>,
}

impl std::fmt::Debug for VoteRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoteRecord")
            .field("instance", &self.instance)
            .field("entry", &self.entry)
            .finish_non_exhaustive()
    }
}

impl VoteRecord {
    pub fn entry(&self) -> Option<LedgerEntry> {
        self.entry
    }

    /// Attaches `message` to the recorded ledger entry.
    ///
    /// A vote that recorded no entry has nothing to attach to and succeeds.
    pub async fn persist(&self, message: MessageId) -> Result<()> {
        let Some(LedgerEntry { day, index }) = self.entry else {
            return Ok(());
        };

        let mut tx = self.store.begin(self.instance).await?;
        let attached = tx.ledger(day).is_some() && tx.ledger_mut(day).attach_message(index, message);
        if !attached {
            return Err(RuntimeError::MissingVote { day, index });
        }
        tx.commit()?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct VoteReceipt {
    pub day: u32,
    /// Board text to post in reply to the vote.
    pub reply: String,
    pub hammer: HammerOutcome,
    pub record: VoteRecord,
}

impl VoteReceipt {
    pub async fn persist(&self, message: MessageId) -> Result<()> {
        self.record.persist(message).await
    }
}

#[derive(Clone)]
pub struct VoteEngine {
    store: GameStore,
    registry: ExtensionRegistry,
    phases: PhaseOrchestrator,
    notifier: Arc<dyn Notifier>,
    events: EventBus,
    clock: Arc<dyn Clock>,
}

impl VoteEngine {
    pub fn new(
        store: GameStore,
        registry: ExtensionRegistry,
        phases: PhaseOrchestrator,
        notifier: Arc<dyn Notifier>,
        events: EventBus,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            registry,
            phases,
            notifier,
            events,
            clock,
        }
    }

    /// Places `voter`'s vote on `target` for the current day.
    ///
    /// Nothing is recorded when a precondition fails or the `on_vote` owner
    /// returns an error.
    pub async fn place_vote(
        &self,
        instance: InstanceId,
        voter: PlayerId,
        target: VoteTarget,
    ) -> Result<VoteReceipt> {
        let mut tx = self.store.begin(instance).await?;

        let state = tx.state();
        state.ensure_voting_open()?;
        if !state.is_playing(voter) {
            return Err(ValidationError::NotPlaying(voter).into());
        }
        if let Some(player) = target.player()
            && !state.is_playing(player)
        {
            return Err(ValidationError::NotPlaying(player).into());
        }
        let vote_owner = self.registry.exclusive_owner(state, HookName::OnVote);
        let board_owner = self.registry.exclusive_owner(state, HookName::OnVotes);

        let ballot = Ballot {
            instance,
            voter,
            target,
            timestamp: self.clock.now(),
            board: board_owner.as_deref(),
        };

        let overridden = match &vote_owner {
            Some(owner) => owner
                .on_vote(&ballot, &mut tx)
                .await
                .map_err(|source| RuntimeError::VoteHook {
                    extension: owner.name(),
                    source,
                })?,
            None => None,
        };
        let outcome = match overridden {
            Some(outcome) => outcome,
            None => ballot.cast(&mut tx, |_| 1),
        };

        let day = tx.state().day;
        tx.commit()?;

        debug!(
            target: "runtime::voting",
            %instance,
            day,
            %voter,
            ?target,
            handled_by = vote_owner.as_ref().map(|owner| owner.name()),
            "Vote recorded"
        );
        self.events.publish(VoteEvent::Placed {
            instance,
            day,
            voter,
            target,
        });
        if let Some(hammered) = outcome.hammer.target.filter(|_| outcome.hammer.hammered) {
            info!(target: "runtime::voting", %instance, day, target = %hammered, "Hammer reached");
            self.events.publish(VoteEvent::Hammered {
                instance,
                day,
                target: hammered,
            });
        }

        Ok(VoteReceipt {
            day,
            reply: outcome.reply,
            hammer: outcome.hammer,
            record: VoteRecord {
                store: self.store.clone(),
                instance,
                entry: outcome.recorded,
            },
        })
    }

    /// Posts the receipt's board (and hammer message) and attaches the board
    /// message to the vote.
    pub async fn announce(&self, instance: InstanceId, receipt: &VoteReceipt) -> Result<MessageId> {
        let channels = self.phases.channels(instance).await?;

        let message = self
            .notifier
            .send(
                channels.votes,
                Message::Board {
                    title: format!("Day {} votes", receipt.day),
                    body: receipt.reply.clone(),
                },
            )
            .await?;
        receipt.persist(message).await?;

        if receipt.hammer.hammered {
            self.notifier
                .send(channels.announcements, Message::text(&receipt.hammer.message))
                .await?;
        }

        Ok(message)
    }

    /// Fans out `on_hammer` once the hammered player's elimination is applied.
    pub async fn confirm_hammer(&self, instance: InstanceId, target: PlayerId) -> Result<HookReport> {
        let channels = self.phases.channels(instance).await?;
        let state = self.store.read_state(instance)?;

        Ok(self
            .phases
            .dispatch(instance, &channels, &state, HookCall::Hammer { target })
            .await)
    }
}
