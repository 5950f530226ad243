//! Topic-based event bus for runtime events.
//!
//! Events are published to specific topics after the change they describe has
//! been committed, and consumers subscribe only to the topics they need.

mod bus;
mod types;

pub use bus::{Event, EventBus, Topic};
pub use types::{PhaseEvent, ScheduleEvent, VoteEvent};
