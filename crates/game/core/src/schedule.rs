//! Pending (future) transitions and the decision each scheduler tick makes.
//!
//! Each instance holds at most one [`PendingTransition`] and one
//! [`PendingGrace`]. Scheduling overwrites the record; there is no queue.
//! `when == None` means nothing is pending.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display, strum::IntoStaticStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case")]
pub enum TransitionKind {
    #[default]
    Lock,
    Unlock,
}

impl TransitionKind {
    /// True when the game is already in the state this transition produces.
    pub fn is_applied(&self, locked: bool) -> bool {
        match self {
            TransitionKind::Lock => locked,
            TransitionKind::Unlock => !locked,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PendingTransition {
    pub when: Option<DateTime<Utc>>,
    pub kind: TransitionKind,
    pub increment_day: bool,
    /// Grace value applied when the transition becomes due.
    pub grace: bool,
}

impl PendingTransition {
    pub fn at(when: DateTime<Utc>, kind: TransitionKind) -> Self {
        Self {
            when: Some(when),
            kind,
            increment_day: false,
            grace: false,
        }
    }

    pub fn increment_day(mut self, increment: bool) -> Self {
        self.increment_day = increment;
        self
    }

    pub fn grace(mut self, grace: bool) -> Self {
        self.grace = grace;
        self
    }

    pub fn is_pending(&self) -> bool {
        self.when.is_some()
    }

    pub fn decide(&self, now: DateTime<Utc>, epsilon: TimeDelta) -> TickDecision {
        decide(self.when, now, epsilon)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PendingGrace {
    pub when: Option<DateTime<Utc>>,
    pub target: bool,
}

impl PendingGrace {
    pub fn at(when: DateTime<Utc>, target: bool) -> Self {
        Self {
            when: Some(when),
            target,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.when.is_some()
    }

    pub fn decide(&self, now: DateTime<Utc>, epsilon: TimeDelta) -> TickDecision {
        decide(self.when, now, epsilon)
    }
}

/// What a scheduler tick should do with a pending record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickDecision {
    /// Nothing is scheduled.
    Idle,
    /// Scheduled, but more than epsilon away.
    NotYet,
    /// Within the epsilon window (or past it): claim the record, then wait
    /// `delay` before applying.
    Due {
        delay: Duration,
        /// How far past `when` the tick fired, when beyond the epsilon window.
        overdue: Option<TimeDelta>,
    },
}

fn decide(when: Option<DateTime<Utc>>, now: DateTime<Utc>, epsilon: TimeDelta) -> TickDecision {
    let Some(when) = when else {
        return TickDecision::Idle;
    };
    if now < when - epsilon {
        return TickDecision::NotYet;
    }

    let delay = (when - now).to_std().unwrap_or(Duration::ZERO);
    let late = now - when;
    let overdue = (late > epsilon).then_some(late);
    TickDecision::Due { delay, overdue }
}
