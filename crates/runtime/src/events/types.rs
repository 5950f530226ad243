//! Event types for different topics.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use game_core::{InstanceId, PlayerId, Transition, VoteTarget};

use crate::extensions::HookName;
use crate::workers::JobKind;

/// Events related to phase changes and game configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PhaseEvent {
    /// A transition was committed.
    Transitioned {
        instance: InstanceId,
        transition: Transition,
        day: u32,
    },

    /// Some extension hooks failed after a committed transition.
    HooksFailed {
        instance: InstanceId,
        hook: HookName,
        failed: Vec<String>,
    },

    GraceChanged { instance: InstanceId, grace: bool },

    PlayerRemoved {
        instance: InstanceId,
        player: PlayerId,
    },
}

/// Events related to the vote ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum VoteEvent {
    Placed {
        instance: InstanceId,
        day: u32,
        voter: PlayerId,
        target: VoteTarget,
    },

    Hammered {
        instance: InstanceId,
        day: u32,
        target: PlayerId,
    },
}

/// Events related to scheduled transitions (lightweight)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScheduleEvent {
    /// A pending record was written, replacing any earlier one.
    Scheduled {
        instance: InstanceId,
        job: JobKind,
        when: Option<DateTime<Utc>>,
    },

    /// A job claimed its record and is waiting out the remaining delay.
    Waiting {
        instance: InstanceId,
        job: JobKind,
        delay: Duration,
    },

    Applied { instance: InstanceId, job: JobKind },

    /// The claimed record was superseded while waiting.
    Cancelled { instance: InstanceId, job: JobKind },

    /// The claimed record needed no change.
    Skipped {
        instance: InstanceId,
        job: JobKind,
        reason: String,
    },

    Failed {
        instance: InstanceId,
        job: JobKind,
        error: String,
    },
}
