use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use game_core::{DayLedger, GameId, GameState, PendingGrace, PendingTransition, SignupSheet};

/// Every persisted document of one instance.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceDocuments {
    pub state: GameState,
    /// Vote ledgers keyed by day.
    pub ledgers: BTreeMap<u32, DayLedger>,
    pub signups: BTreeMap<GameId, SignupSheet>,
    pub pending_transition: PendingTransition,
    pub pending_grace: PendingGrace,
    /// Opaque per-extension data keyed by extension name.
    pub extension_data: BTreeMap<String, serde_json::Value>,
}
