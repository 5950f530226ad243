//! Authoritative game state and its phase transitions.
//!
//! [`GameState`] is the single record per instance that says whether a game is
//! running, whether it is locked, which day it is, who plays, and which
//! extensions are enabled. The transition methods check their preconditions
//! first and only mutate when every check passes, so a returned
//! [`ValidationError`] always leaves the state as it was.

mod common;
mod player;

pub use common::{GameId, InstanceId, MessageId, PlayerId};
pub use player::{Alignment, Player};

use crate::error::ValidationError;

/// Coarse phase derived from the `started` and `locked` flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    Unstarted,
    Unlocked,
    Locked,
}

/// A phase transition that has been applied to a [`GameState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Transition {
    Start { game: GameId },
    Lock,
    Unlock { incremented: bool },
    End,
}

impl Transition {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Transition::Start { .. } => "start",
            Transition::Lock => "lock",
            Transition::Unlock { .. } => "unlock",
            Transition::End => "end",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GameState {
    pub started: bool,
    pub locked: bool,
    pub day: u32,
    pub active_game: Option<GameId>,
    /// Ordered set: insertion order, no duplicate ids.
    pub players: Vec<Player>,
    /// Voting is disabled while set, even when unlocked.
    pub grace: bool,
    pub hammer_enabled: bool,
    /// Enabled extension names in the order they were enabled.
    pub extensions: Vec<String>,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            started: false,
            locked: false,
            day: 0,
            active_game: None,
            players: Vec::new(),
            grace: false,
            hammer_enabled: true,
            extensions: Vec::new(),
        }
    }
}

impl GameState {
    pub fn phase(&self) -> Phase {
        match (self.started, self.locked) {
            (false, _) => Phase::Unstarted,
            (true, false) => Phase::Unlocked,
            (true, true) => Phase::Locked,
        }
    }

    /// `locked ⇒ started`
    pub fn is_consistent(&self) -> bool {
        !self.locked || self.started
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|player| player.id == id)
    }

    pub fn is_playing(&self, id: PlayerId) -> bool {
        self.player(id).is_some()
    }

    pub fn is_extension_enabled(&self, name: &str) -> bool {
        self.extensions.iter().any(|enabled| enabled == name)
    }

    /// Returns false when the extension was already enabled.
    pub fn enable_extension(&mut self, name: &str) -> bool {
        if self.is_extension_enabled(name) {
            return false;
        }
        self.extensions.push(name.to_owned());
        true
    }

    /// Returns false when the extension was not enabled.
    pub fn disable_extension(&mut self, name: &str) -> bool {
        let before = self.extensions.len();
        self.extensions.retain(|enabled| enabled != name);
        before != self.extensions.len()
    }

    /// Starts `game` locked on day 0 with the given signups.
    ///
    /// Duplicate signups collapse to their first occurrence.
    pub fn start(
        &mut self,
        game: GameId,
        signups: impl IntoIterator<Item = Player>,
    ) -> Result<Transition, ValidationError> {
        if self.started {
            return Err(ValidationError::AlreadyStarted);
        }

        let mut players: Vec<Player> = Vec::new();
        for player in signups {
            if !players.iter().any(|existing| existing.id == player.id) {
                players.push(player);
            }
        }
        if players.is_empty() {
            return Err(ValidationError::NoSignups(game));
        }

        self.started = true;
        self.locked = true;
        self.day = 0;
        self.grace = false;
        self.players = players;
        self.active_game = Some(game);
        Ok(Transition::Start { game })
    }

    pub fn lock(&mut self) -> Result<Transition, ValidationError> {
        if !self.started {
            return Err(ValidationError::NotStarted);
        }
        if self.locked {
            return Err(ValidationError::Locked);
        }
        self.locked = true;
        Ok(Transition::Lock)
    }

    pub fn unlock(&mut self, increment: bool) -> Result<Transition, ValidationError> {
        if !self.started {
            return Err(ValidationError::NotStarted);
        }
        if !self.locked {
            return Err(ValidationError::NotLocked);
        }
        self.locked = false;
        if increment {
            self.day += 1;
        }
        Ok(Transition::Unlock {
            incremented: increment,
        })
    }

    /// Clears the running game. Settings (hammer, extensions) survive.
    pub fn end(&mut self) -> Result<Transition, ValidationError> {
        if !self.started {
            return Err(ValidationError::NotStarted);
        }
        self.started = false;
        self.locked = false;
        self.grace = false;
        self.day = 0;
        self.players.clear();
        self.active_game = None;
        Ok(Transition::End)
    }

    /// Voting requires a started, unlocked game outside the grace period.
    pub fn ensure_voting_open(&self) -> Result<(), ValidationError> {
        if !self.started {
            return Err(ValidationError::NotStarted);
        }
        if self.locked {
            return Err(ValidationError::Locked);
        }
        if self.grace {
            return Err(ValidationError::GracePeriod);
        }
        Ok(())
    }

    pub fn set_alignment(
        &mut self,
        id: PlayerId,
        alignment: Alignment,
    ) -> Result<(), ValidationError> {
        let player = self
            .players
            .iter_mut()
            .find(|player| player.id == id)
            .ok_or(ValidationError::NotPlaying(id))?;
        player.alignment = alignment;
        Ok(())
    }

    pub fn remove_player(&mut self, id: PlayerId) -> Result<Player, ValidationError> {
        if !self.started {
            return Err(ValidationError::NotStarted);
        }
        let index = self
            .players
            .iter()
            .position(|player| player.id == id)
            .ok_or(ValidationError::NotPlaying(id))?;
        Ok(self.players.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn players(ids: &[u64]) -> Vec<Player> {
        ids.iter().map(|&id| Player::new(PlayerId(id))).collect()
    }

    fn started() -> GameState {
        let mut state = GameState::default();
        state.start(GameId(1), players(&[1, 2, 3])).unwrap();
        state
    }

    #[test]
    fn start_locks_on_day_zero() {
        let state = started();
        assert_eq!(state.phase(), Phase::Locked);
        assert_eq!(state.day, 0);
        assert_eq!(state.active_game, Some(GameId(1)));
        assert_eq!(state.player_count(), 3);
        assert!(state.is_consistent());
    }

    #[test]
    fn start_requires_signups_and_unstarted_game() {
        let mut state = GameState::default();
        assert_eq!(
            state.start(GameId(9), Vec::new()),
            Err(ValidationError::NoSignups(GameId(9)))
        );
        assert_eq!(state, GameState::default());

        let mut state = started();
        assert_eq!(
            state.start(GameId(2), players(&[4])),
            Err(ValidationError::AlreadyStarted)
        );
        assert_eq!(state.active_game, Some(GameId(1)));
    }

    #[test]
    fn start_collapses_duplicate_signups() {
        let mut state = GameState::default();
        state.start(GameId(1), players(&[5, 6, 5])).unwrap();
        let ids: Vec<_> = state.players.iter().map(|p| p.id.0).collect();
        assert_eq!(ids, vec![5, 6]);
    }

    #[test]
    fn unlock_increments_day_only_when_asked() {
        let mut state = started();
        state.unlock(false).unwrap();
        assert_eq!(state.day, 0);
        state.lock().unwrap();
        assert_eq!(
            state.unlock(true),
            Ok(Transition::Unlock { incremented: true })
        );
        assert_eq!(state.day, 1);
        assert_eq!(state.phase(), Phase::Unlocked);
    }

    #[test]
    fn lock_and_unlock_reject_repeats() {
        let mut state = started();
        assert_eq!(state.lock(), Err(ValidationError::Locked));
        state.unlock(true).unwrap();
        assert_eq!(state.unlock(true), Err(ValidationError::NotLocked));
        assert_eq!(state.day, 1);
    }

    #[test]
    fn transitions_require_a_started_game() {
        let mut state = GameState::default();
        assert_eq!(state.lock(), Err(ValidationError::NotStarted));
        assert_eq!(state.unlock(true), Err(ValidationError::NotStarted));
        assert_eq!(state.end(), Err(ValidationError::NotStarted));
    }

    #[test]
    fn end_clears_game_but_keeps_settings() {
        let mut state = started();
        state.hammer_enabled = false;
        state.enable_extension("last-words");
        state.unlock(true).unwrap();
        state.end().unwrap();

        assert_eq!(state.phase(), Phase::Unstarted);
        assert!(state.players.is_empty());
        assert_eq!(state.day, 0);
        assert_eq!(state.active_game, None);
        assert!(!state.hammer_enabled);
        assert!(state.is_extension_enabled("last-words"));
    }

    #[test]
    fn voting_gates() {
        let mut state = started();
        assert_eq!(state.ensure_voting_open(), Err(ValidationError::Locked));
        state.unlock(true).unwrap();
        assert_eq!(state.ensure_voting_open(), Ok(()));
        state.grace = true;
        assert_eq!(
            state.ensure_voting_open(),
            Err(ValidationError::GracePeriod)
        );
    }

    #[test]
    fn alignment_edits_and_removal() {
        let mut state = started();
        state
            .set_alignment(PlayerId(2), Alignment::Custom("cult".into()))
            .unwrap();
        assert_eq!(
            state.player(PlayerId(2)).map(|p| p.alignment.to_string()),
            Some("cult".to_string())
        );
        assert_eq!(
            state.set_alignment(PlayerId(7), Alignment::Mafia),
            Err(ValidationError::NotPlaying(PlayerId(7)))
        );

        let removed = state.remove_player(PlayerId(2)).unwrap();
        assert_eq!(removed.id, PlayerId(2));
        assert!(!state.is_playing(PlayerId(2)));
    }

    #[test]
    fn extension_set_is_deduplicated() {
        let mut state = GameState::default();
        assert!(state.enable_extension("hidden-board"));
        assert!(!state.enable_extension("hidden-board"));
        assert!(state.disable_extension("hidden-board"));
        assert!(!state.disable_extension("hidden-board"));
    }

    #[test]
    fn start_keeps_signup_alignments() {
        let mut state = GameState::default();
        let signups = vec![
            Player::new(PlayerId(1)).with_alignment(Alignment::Mafia),
            Player::new(PlayerId(2)),
        ];
        state.start(GameId(1), signups).unwrap();

        assert_eq!(state.players[0].alignment, Alignment::Mafia);
        assert_eq!(state.players[1].alignment, Alignment::Default);
    }
}
