//! Pure game rules for the Mafia phase runtime.
//!
//! This crate owns the authoritative data model and every rule that can be
//! evaluated without I/O:
//! - [`state`] holds [`GameState`], players, and the lock/unlock/start/end transitions
//! - [`vote`] holds the per-day ledger, the weighted tally, and hammer evaluation
//! - [`schedule`] holds the pending transition records and their tick decisions
//! - [`signup`] tracks the candidate players of a game before it starts
//!
//! The async runtime layers persistence, extensions, and scheduling on top of
//! these types; nothing here suspends or touches the outside world.
pub mod error;
pub mod schedule;
pub mod signup;
pub mod state;
pub mod vote;

pub use error::ValidationError;
pub use schedule::{PendingGrace, PendingTransition, TickDecision, TransitionKind};
pub use signup::SignupSheet;
pub use state::{
    Alignment, GameId, GameState, InstanceId, MessageId, Phase, Player, PlayerId, Transition,
};
pub use vote::{
    BoardView, DayLedger, HammerOutcome, Tally, TargetTally, Vote, VoteTarget, hammer_threshold,
    render_board,
};
