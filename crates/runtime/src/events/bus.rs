//! Topic-based event bus implementation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::types::{PhaseEvent, ScheduleEvent, VoteEvent};

/// Topics for event routing
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Topic {
    /// Phase transitions, grace, and roster changes
    Phase,
    /// Placed votes and hammers
    Vote,
    /// Scheduler lifecycle
    Schedule,
}

/// Event wrapper that carries the topic and typed event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    Phase(PhaseEvent),
    Vote(VoteEvent),
    Schedule(ScheduleEvent),
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::Phase(_) => Topic::Phase,
            Event::Vote(_) => Topic::Vote,
            Event::Schedule(_) => Topic::Schedule,
        }
    }
}

impl From<PhaseEvent> for Event {
    fn from(event: PhaseEvent) -> Self {
        Event::Phase(event)
    }
}

impl From<VoteEvent> for Event {
    fn from(event: VoteEvent) -> Self {
        Event::Vote(event)
    }
}

impl From<ScheduleEvent> for Event {
    fn from(event: ScheduleEvent) -> Self {
        Event::Schedule(event)
    }
}

struct Channels {
    phase: broadcast::Sender<Event>,
    vote: broadcast::Sender<Event>,
    schedule: broadcast::Sender<Event>,
}

impl Channels {
    fn get(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Phase => &self.phase,
            Topic::Vote => &self.vote,
            Topic::Schedule => &self.schedule,
        }
    }
}

/// Topic-based event bus
///
/// Allows consumers to subscribe to specific topics and only receive
/// events they care about. Publishing never blocks and never fails; events
/// nobody listens to are dropped.
#[derive(Clone)]
pub struct EventBus {
    channels: Arc<Channels>,
}

impl EventBus {
    /// Creates a new event bus with default capacity for each topic
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    /// Creates a new event bus with specified capacity per topic
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            channels: Arc::new(Channels {
                phase: broadcast::channel(capacity).0,
                vote: broadcast::channel(capacity).0,
                schedule: broadcast::channel(capacity).0,
            }),
        }
    }

    /// Publish an event to its corresponding topic
    pub fn publish(&self, event: impl Into<Event>) {
        let event = event.into();
        let topic = event.topic();

        if self.channels.get(topic).send(event).is_err() {
            // No subscribers for this topic - this is normal, not an error
            tracing::trace!("No subscribers for topic {:?}", topic);
        }
    }

    /// Subscribe to a specific topic
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.channels.get(topic).subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
