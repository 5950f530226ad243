//! Candidate players of a game that has not started yet.

use crate::error::ValidationError;
use crate::state::{GameId, Player, PlayerId};

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SignupSheet {
    pub game: GameId,
    players: Vec<PlayerId>,
}

impl SignupSheet {
    pub fn new(game: GameId) -> Self {
        Self {
            game,
            players: Vec::new(),
        }
    }

    pub fn sign_up(&mut self, player: PlayerId) -> Result<(), ValidationError> {
        if self.players.contains(&player) {
            return Err(ValidationError::AlreadySignedUp(player));
        }
        self.players.push(player);
        Ok(())
    }

    pub fn withdraw(&mut self, player: PlayerId) -> Result<(), ValidationError> {
        let before = self.players.len();
        self.players.retain(|&signed| signed != player);
        if before == self.players.len() {
            return Err(ValidationError::NotSignedUp(player));
        }
        Ok(())
    }

    pub fn players(&self) -> &[PlayerId] {
        &self.players
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Players to seat when the game starts, in signup order.
    pub fn roster(&self) -> Vec<Player> {
        self.players.iter().copied().map(Player::new).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signups_are_unique_and_ordered() {
        let mut sheet = SignupSheet::new(GameId(1));
        sheet.sign_up(PlayerId(3)).unwrap();
        sheet.sign_up(PlayerId(1)).unwrap();
        assert_eq!(
            sheet.sign_up(PlayerId(3)),
            Err(ValidationError::AlreadySignedUp(PlayerId(3)))
        );
        assert_eq!(sheet.players(), &[PlayerId(3), PlayerId(1)]);

        sheet.withdraw(PlayerId(3)).unwrap();
        assert_eq!(
            sheet.withdraw(PlayerId(3)),
            Err(ValidationError::NotSignedUp(PlayerId(3)))
        );
        assert_eq!(sheet.roster(), vec![Player::new(PlayerId(1))]);
    }
}
