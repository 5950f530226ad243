//! Votes, the per-day ledger, and the tally derived from it.
//!
//! The ledger is append-only: a later vote (or an unvote) from the same voter
//! supersedes the earlier one for tallying, but the earlier entry is kept. The
//! only mutation allowed after the fact is attaching the id of the message that
//! announced a vote.

mod board;
mod tally;

pub use board::{BoardView, render_board};
pub use tally::{HammerOutcome, Tally, TargetTally, hammer_threshold};

use chrono::{DateTime, Utc};

use crate::state::{MessageId, PlayerId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum VoteTarget {
    Player(PlayerId),
    Unvote,
}

impl VoteTarget {
    pub fn player(&self) -> Option<PlayerId> {
        match self {
            VoteTarget::Player(id) => Some(*id),
            VoteTarget::Unvote => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vote {
    pub voter: PlayerId,
    pub target: VoteTarget,
    pub timestamp: DateTime<Utc>,
    pub day: u32,
    /// Announcement message, attached once the board has been posted.
    #[cfg_attr(feature = "serde", serde(default))]
    pub message: Option<MessageId>,
}

impl Vote {
    pub fn new(voter: PlayerId, target: VoteTarget, day: u32, timestamp: DateTime<Utc>) -> Self {
        Self {
            voter,
            target,
            timestamp,
            day,
            message: None,
        }
    }
}

/// All votes cast on one day, in the order they were cast.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DayLedger {
    pub day: u32,
    votes: Vec<Vote>,
}

impl DayLedger {
    pub fn new(day: u32) -> Self {
        Self {
            day,
            votes: Vec::new(),
        }
    }

    /// Appends a vote and returns its index in the ledger.
    pub fn append(&mut self, vote: Vote) -> usize {
        self.votes.push(vote);
        self.votes.len() - 1
    }

    pub fn votes(&self) -> &[Vote] {
        &self.votes
    }

    pub fn len(&self) -> usize {
        self.votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    /// Returns false when `index` is out of range.
    pub fn attach_message(&mut self, index: usize, message: MessageId) -> bool {
        match self.votes.get_mut(index) {
            Some(vote) => {
                vote.message = Some(message);
                true
            }
            None => false,
        }
    }

    /// The counted vote of every voter, ordered by when that vote was cast.
    pub fn latest_votes(&self) -> Vec<&Vote> {
        let mut latest: Vec<&Vote> = Vec::new();
        for vote in &self.votes {
            latest.retain(|counted| counted.voter != vote.voter);
            latest.push(vote);
        }
        latest
    }

    /// The counted target of `voter`, if their latest entry is not an unvote.
    pub fn current_target(&self, voter: PlayerId) -> Option<PlayerId> {
        self.votes
            .iter()
            .rev()
            .find(|vote| vote.voter == voter)
            .and_then(|vote| vote.target.player())
    }
}
