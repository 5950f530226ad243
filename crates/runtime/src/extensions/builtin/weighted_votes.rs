use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use game_core::{InstanceId, PlayerId};

use crate::extensions::{Extension, HookContext, HookError, HookName, HookResult, VoteOutcome};
use crate::repository::{GameStore, RepositoryError, Transaction};
use crate::voting::Ballot;

const NAME: &str = "weighted-votes";

#[derive(Debug, Default, Serialize, Deserialize)]
struct Weights {
    multipliers: BTreeMap<PlayerId, u32>,
}

impl Weights {
    fn of(&self, voter: PlayerId) -> u32 {
        self.multipliers.get(&voter).copied().unwrap_or(1)
    }
}

/// Takes over vote recording so designated voters count more than once.
///
/// Multipliers are per game and cleared when the game ends.
pub struct WeightedVotes;

impl WeightedVotes {
    pub const NAME: &'static str = NAME;

    /// Sets the multiplier of `voter`; a weight of 1 restores the default.
    pub async fn set_weight(
        store: &GameStore,
        instance: InstanceId,
        voter: PlayerId,
        weight: u32,
    ) -> Result<(), RepositoryError> {
        let mut tx = store.begin(instance).await?;
        let mut weights: Weights = tx.extension_data(NAME)?;
        if weight == 1 {
            weights.multipliers.remove(&voter);
        } else {
            weights.multipliers.insert(voter, weight);
        }
        tx.set_extension_data(NAME, &weights)?;
        tx.commit()?;
        Ok(())
    }

    pub fn weight_of(tx: &Transaction, voter: PlayerId) -> Result<u32, RepositoryError> {
        Ok(tx.extension_data::<Weights>(NAME)?.of(voter))
    }
}

#[async_trait]
impl Extension for WeightedVotes {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Counts designated voters with a multiplier"
    }

    fn exclusive_hooks(&self) -> &'static [HookName] {
        &[HookName::OnVote]
    }

    async fn on_vote(
        &self,
        ballot: &Ballot<'_>,
        tx: &mut Transaction,
    ) -> Result<Option<VoteOutcome>, HookError> {
        let weights: Weights = tx.extension_data(NAME)?;
        Ok(Some(ballot.cast(tx, |voter| weights.of(voter))))
    }

    async fn on_end(&self, ctx: &HookContext<'_>) -> HookResult {
        let mut tx = ctx.store.begin(ctx.instance).await?;
        tx.clear_extension_data(NAME);
        tx.commit()?;
        Ok(())
    }
}
