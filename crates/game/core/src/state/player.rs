use std::fmt;

use super::PlayerId;

/// Team a player belongs to for win-condition purposes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Alignment {
    #[default]
    Default,
    Neutral,
    Mafia,
    /// Moderator-defined team name.
    Custom(String),
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alignment::Default => f.write_str("default"),
            Alignment::Neutral => f.write_str("neutral"),
            Alignment::Mafia => f.write_str("mafia"),
            Alignment::Custom(name) => f.write_str(name),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Player {
    pub id: PlayerId,
    #[cfg_attr(feature = "serde", serde(default))]
    pub alignment: Alignment,
}

impl Player {
    pub fn new(id: PlayerId) -> Self {
        Self {
            id,
            alignment: Alignment::Default,
        }
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }
}
