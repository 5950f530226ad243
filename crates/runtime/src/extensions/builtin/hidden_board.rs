use std::fmt::Write;

use async_trait::async_trait;

use game_core::BoardView;

use crate::extensions::{Extension, HookName};

/// Renders the board with vote counts only, hiding who voted for whom.
pub struct HiddenBoard;

impl HiddenBoard {
    pub const NAME: &'static str = "hidden-board";
}

#[async_trait]
impl Extension for HiddenBoard {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        "Hides voter names on the vote board"
    }

    fn exclusive_hooks(&self) -> &'static [HookName] {
        &[HookName::OnVotes]
    }

    fn on_votes(&self, view: &BoardView<'_>) -> Option<String> {
        let mut board = match view.votes_to_hammer() {
            Some(needed) => format!("Day {} votes ({} to hammer)\n", view.day, needed),
            None => format!("Day {} votes\n", view.day),
        };

        if view.tally.is_empty() {
            board.push_str("No votes yet.\n");
        }
        for entry in view.tally.targets() {
            let _ = writeln!(board, "#{}: {}", entry.target, entry.weight);
        }

        Some(board)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use game_core::{DayLedger, Player, PlayerId, Tally, Vote, VoteTarget};

    use super::*;

    #[test]
    fn board_omits_voters() {
        let players: Vec<Player> = (1..=5).map(|id| Player::new(PlayerId(id))).collect();
        let mut ledger = DayLedger::new(1);
        for voter in [1, 2] {
            ledger.append(Vote::new(
                PlayerId(voter),
                VoteTarget::Player(PlayerId(4)),
                1,
                Utc::now(),
            ));
        }
        let tally = Tally::count(&ledger);
        let view = BoardView {
            day: 1,
            tally: &tally,
            players: &players,
            hammer_enabled: true,
        };

        let board = HiddenBoard.on_votes(&view).unwrap();
        assert_eq!(board, "Day 1 votes (3 to hammer)\n#4: 2\n");
    }
}
