//! Extensions shipped with the runtime.

mod hidden_board;
mod last_words;
mod weighted_votes;

pub use hidden_board::HiddenBoard;
pub use last_words::LastWords;
pub use weighted_votes::WeightedVotes;
