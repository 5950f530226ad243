//! Validation errors raised when a rule precondition is not met.
//!
//! Every variant leaves the state untouched: the caller may surface the message
//! directly to the player or moderator who issued the command.

use thiserror::Error;

use crate::state::{GameId, PlayerId};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("the game has not started")]
    NotStarted,

    #[error("a game is already running")]
    AlreadyStarted,

    #[error("the game is locked")]
    Locked,

    #[error("the game is already unlocked")]
    NotLocked,

    #[error("voting is disabled during the grace period")]
    GracePeriod,

    #[error("game {0} has no signed-up players")]
    NoSignups(GameId),

    #[error("player {0} is already signed up")]
    AlreadySignedUp(PlayerId),

    #[error("player {0} is not signed up")]
    NotSignedUp(PlayerId),

    #[error("player {0} is not playing in this game")]
    NotPlaying(PlayerId),
}
