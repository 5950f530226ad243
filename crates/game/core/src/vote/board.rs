//! Default text rendering of the vote board.

use std::fmt::Write;

use super::{Tally, hammer_threshold};
use crate::state::Player;

/// Everything a board renderer may look at.
#[derive(Clone, Copy, Debug)]
pub struct BoardView<'a> {
    pub day: u32,
    pub tally: &'a Tally,
    pub players: &'a [Player],
    pub hammer_enabled: bool,
}

impl BoardView<'_> {
    /// Votes needed to hammer, or `None` when hammering is off.
    pub fn votes_to_hammer(&self) -> Option<u32> {
        self.hammer_enabled
            .then(|| hammer_threshold(self.players.len()) + 1)
    }
}

/// Renders one line per voted target plus the players not currently voting.
pub fn render_board(view: &BoardView<'_>) -> String {
    let mut board = format!("Day {} votes", view.day);
    if let Some(needed) = view.votes_to_hammer() {
        let _ = write!(board, " ({needed} to hammer)");
    }
    board.push('\n');

    if view.tally.is_empty() {
        board.push_str("No votes yet.\n");
    }
    for entry in view.tally.targets() {
        let voters = entry
            .voters
            .iter()
            .map(|voter| format!("#{voter}"))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(board, "#{}: {} ({voters})", entry.target, entry.weight);
    }

    let idle: Vec<String> = view
        .players
        .iter()
        .filter(|player| {
            !view
                .tally
                .targets()
                .iter()
                .any(|entry| entry.voters.contains(&player.id))
        })
        .map(|player| format!("#{}", player.id))
        .collect();
    if !idle.is_empty() {
        let _ = writeln!(board, "Not voting: {}", idle.join(", "));
    }

    board
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::state::PlayerId;
    use crate::vote::{DayLedger, Vote, VoteTarget};

    #[test]
    fn board_lists_targets_and_idle_players() {
        let players: Vec<Player> = (1..=4).map(|id| Player::new(PlayerId(id))).collect();
        let mut ledger = DayLedger::new(2);
        for voter in [1, 2] {
            ledger.append(Vote::new(
                PlayerId(voter),
                VoteTarget::Player(PlayerId(3)),
                2,
                Utc::now(),
            ));
        }
        let tally = Tally::count(&ledger);

        let board = render_board(&BoardView {
            day: 2,
            tally: &tally,
            players: &players,
            hammer_enabled: true,
        });

        assert_eq!(
            board,
            "Day 2 votes (3 to hammer)\n#3: 2 (#1, #2)\nNot voting: #3, #4\n"
        );
    }

    #[test]
    fn empty_board_without_hammer() {
        let tally = Tally::default();
        let board = render_board(&BoardView {
            day: 1,
            tally: &tally,
            players: &[],
            hammer_enabled: false,
        });
        assert_eq!(board, "Day 1 votes\nNo votes yet.\n");
    }
}
