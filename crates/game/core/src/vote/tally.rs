//! Weighted tally over the latest vote of each voter, and hammer evaluation.

use super::{DayLedger, Vote, VoteTarget};
use crate::state::{Player, PlayerId};

/// Weight a target must strictly exceed to be hammered: `floor(players / 2)`.
pub fn hammer_threshold(player_count: usize) -> u32 {
    (player_count / 2) as u32
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetTally {
    pub target: PlayerId,
    pub weight: u32,
    /// Voters currently counted toward this target, in the order they voted.
    pub voters: Vec<PlayerId>,
}

/// Per-target weighted counts for one day.
///
/// Targets are ordered by weight, heaviest first; ties keep the order in which
/// the targets were first reached.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tally {
    targets: Vec<TargetTally>,
}

impl Tally {
    /// Unweighted tally: every voter counts once.
    pub fn count(ledger: &DayLedger) -> Self {
        Self::weighted(ledger, |_| 1)
    }

    /// Tally where each voter's latest vote counts `weight(voter)`.
    ///
    /// An unvote only withdraws the voter's weight from the target they were
    /// counted on; other voters are untouched. Weights saturate at `u32::MAX`.
    pub fn weighted(ledger: &DayLedger, weight: impl Fn(PlayerId) -> u32) -> Self {
        Self::tally(ledger, |_| true, weight)
    }

    /// Weighted tally over votes cast by and for current `players`.
    ///
    /// A removed player's latest vote is dropped rather than replaced by an
    /// earlier one, and so is any latest vote on a removed player.
    pub fn among(
        ledger: &DayLedger,
        players: &[Player],
        weight: impl Fn(PlayerId) -> u32,
    ) -> Self {
        let playing = |id: PlayerId| players.iter().any(|player| player.id == id);
        Self::tally(
            ledger,
            |vote| playing(vote.voter) && vote.target.player().is_none_or(playing),
            weight,
        )
    }

    fn tally(
        ledger: &DayLedger,
        counted: impl Fn(&Vote) -> bool,
        weight: impl Fn(PlayerId) -> u32,
    ) -> Self {
        let mut targets: Vec<TargetTally> = Vec::new();

        for vote in ledger.latest_votes() {
            if !counted(vote) {
                continue;
            }
            let VoteTarget::Player(target) = vote.target else {
                continue;
            };
            let index = match targets.iter().position(|entry| entry.target == target) {
                Some(index) => index,
                None => {
                    targets.push(TargetTally {
                        target,
                        weight: 0,
                        voters: Vec::new(),
                    });
                    targets.len() - 1
                }
            };
            let entry = &mut targets[index];
            entry.weight = entry.weight.saturating_add(weight(vote.voter));
            entry.voters.push(vote.voter);
        }

        targets.sort_by(|a, b| b.weight.cmp(&a.weight));
        Self { targets }
    }

    pub fn targets(&self) -> &[TargetTally] {
        &self.targets
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn weight_of(&self, target: PlayerId) -> u32 {
        self.targets
            .iter()
            .find(|entry| entry.target == target)
            .map(|entry| entry.weight)
            .unwrap_or(0)
    }

    /// Decides whether the target of the vote just cast is hammered.
    ///
    /// Only the voted target can have crossed the threshold, so unvotes never
    /// hammer.
    pub fn evaluate_hammer(
        &self,
        voted: VoteTarget,
        player_count: usize,
        hammer_enabled: bool,
    ) -> HammerOutcome {
        if !hammer_enabled {
            return HammerOutcome::none();
        }
        let Some(target) = voted.player() else {
            return HammerOutcome::none();
        };

        let weight = self.weight_of(target);
        if weight > hammer_threshold(player_count) {
            HammerOutcome::hammered(target, weight)
        } else {
            HammerOutcome::none()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HammerOutcome {
    pub hammered: bool,
    pub target: Option<PlayerId>,
    pub message: String,
}

impl HammerOutcome {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn hammered(target: PlayerId, weight: u32) -> Self {
        Self {
            hammered: true,
            target: Some(target),
            message: format!("#{target} has been hammered with {weight} votes."),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    const TARGET: PlayerId = PlayerId(100);

    fn cast(ledger: &mut DayLedger, voter: u64, target: VoteTarget) -> VoteTarget {
        ledger.append(Vote::new(PlayerId(voter), target, ledger.day, Utc::now()));
        target
    }

    #[test]
    fn threshold_is_floor_of_half() {
        assert_eq!(hammer_threshold(10), 5);
        assert_eq!(hammer_threshold(9), 4);
        assert_eq!(hammer_threshold(1), 0);
    }

    #[test]
    fn eight_players_hammer_on_fifth_vote() {
        let mut ledger = DayLedger::new(2);
        let mut last = VoteTarget::Unvote;
        for voter in 1..=4 {
            last = cast(&mut ledger, voter, VoteTarget::Player(TARGET));
        }
        assert!(!Tally::count(&ledger).evaluate_hammer(last, 8, true).hammered);

        let last = cast(&mut ledger, 5, VoteTarget::Player(TARGET));
        let outcome = Tally::count(&ledger).evaluate_hammer(last, 8, true);
        assert!(outcome.hammered);
        assert_eq!(outcome.target, Some(TARGET));
    }

    #[test]
    fn ten_player_day_three_scenario() {
        let mut ledger = DayLedger::new(3);
        let mut outcomes = Vec::new();
        for voter in 1..=6 {
            let voted = cast(&mut ledger, voter, VoteTarget::Player(TARGET));
            outcomes.push(Tally::count(&ledger).evaluate_hammer(voted, 10, true).hammered);
        }
        assert_eq!(outcomes, vec![false, false, false, false, false, true]);
    }

    #[test]
    fn disabled_hammer_never_fires() {
        let mut ledger = DayLedger::new(1);
        let mut last = VoteTarget::Unvote;
        for voter in 1..=10 {
            last = cast(&mut ledger, voter, VoteTarget::Player(TARGET));
        }
        let outcome = Tally::count(&ledger).evaluate_hammer(last, 10, false);
        assert_eq!(outcome, HammerOutcome::none());
    }

    #[test]
    fn second_vote_supersedes_first() {
        let mut ledger = DayLedger::new(1);
        cast(&mut ledger, 1, VoteTarget::Player(PlayerId(10)));
        cast(&mut ledger, 1, VoteTarget::Player(PlayerId(11)));
        cast(&mut ledger, 1, VoteTarget::Player(PlayerId(11)));

        let tally = Tally::count(&ledger);
        assert_eq!(tally.weight_of(PlayerId(10)), 0);
        assert_eq!(tally.weight_of(PlayerId(11)), 1);
        let total: u32 = tally.targets().iter().map(|t| t.weight).sum();
        assert_eq!(total, 1);
    }

    #[test]
    fn unvote_removes_weight_from_prior_target_only() {
        let mut ledger = DayLedger::new(1);
        cast(&mut ledger, 1, VoteTarget::Player(PlayerId(10)));
        cast(&mut ledger, 2, VoteTarget::Player(PlayerId(10)));
        cast(&mut ledger, 3, VoteTarget::Player(PlayerId(11)));
        cast(&mut ledger, 1, VoteTarget::Player(PlayerId(11)));
        let unvote = cast(&mut ledger, 1, VoteTarget::Unvote);

        let tally = Tally::count(&ledger);
        assert_eq!(tally.weight_of(PlayerId(10)), 1);
        assert_eq!(tally.weight_of(PlayerId(11)), 1);
        assert_eq!(tally.targets()[0].voters, vec![PlayerId(2)]);
        assert!(!tally.evaluate_hammer(unvote, 2, true).hammered);
    }

    #[test]
    fn weights_apply_per_voter() {
        let mut ledger = DayLedger::new(3);
        cast(&mut ledger, 1, VoteTarget::Player(TARGET));
        cast(&mut ledger, 2, VoteTarget::Player(TARGET));
        let last = cast(&mut ledger, 7, VoteTarget::Player(TARGET));

        let weight = |voter: PlayerId| if voter == PlayerId(7) { 3 } else { 1 };
        let tally = Tally::weighted(&ledger, weight);
        assert_eq!(tally.weight_of(TARGET), 5);
        assert!(!tally.evaluate_hammer(last, 10, true).hammered);

        let last = cast(&mut ledger, 3, VoteTarget::Player(TARGET));
        let tally = Tally::weighted(&ledger, weight);
        assert!(tally.evaluate_hammer(last, 10, true).hammered);
    }

    #[test]
    fn targets_sorted_by_weight() {
        let mut ledger = DayLedger::new(1);
        cast(&mut ledger, 1, VoteTarget::Player(PlayerId(10)));
        cast(&mut ledger, 2, VoteTarget::Player(PlayerId(11)));
        cast(&mut ledger, 3, VoteTarget::Player(PlayerId(11)));
        cast(&mut ledger, 4, VoteTarget::Player(PlayerId(12)));

        let order: Vec<_> = Tally::count(&ledger)
            .targets()
            .iter()
            .map(|t| t.target.0)
            .collect();
        assert_eq!(order, vec![11, 10, 12]);
    }

    #[test]
    fn extreme_weights_saturate() {
        let mut ledger = DayLedger::new(1);
        cast(&mut ledger, 1, VoteTarget::Player(TARGET));
        let last = cast(&mut ledger, 2, VoteTarget::Player(TARGET));

        let tally = Tally::weighted(&ledger, |voter| {
            if voter == PlayerId(1) { u32::MAX } else { 1 }
        });
        assert_eq!(tally.weight_of(TARGET), u32::MAX);
        assert!(tally.evaluate_hammer(last, 10, true).hammered);
    }

    #[test]
    fn removed_players_no_longer_count() {
        let mut ledger = DayLedger::new(1);
        cast(&mut ledger, 1, VoteTarget::Player(PlayerId(10)));
        cast(&mut ledger, 1, VoteTarget::Player(TARGET));
        cast(&mut ledger, 2, VoteTarget::Player(TARGET));
        cast(&mut ledger, 3, VoteTarget::Player(PlayerId(4)));
        cast(&mut ledger, 5, VoteTarget::Player(TARGET));

        let players: Vec<Player> = [2, 3, 5, 10, 100]
            .into_iter()
            .map(|id| Player::new(PlayerId(id)))
            .collect();
        let tally = Tally::among(&ledger, &players, |_| 1);

        assert_eq!(tally.weight_of(TARGET), 2);
        assert_eq!(tally.weight_of(PlayerId(10)), 0);
        assert_eq!(tally.weight_of(PlayerId(4)), 0);
        assert_eq!(tally.targets()[0].voters, vec![PlayerId(2), PlayerId(5)]);
    }
}
