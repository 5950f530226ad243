use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use game_core::{InstanceId, PlayerId};

use crate::extensions::{Extension, HookContext, HookResult};
use crate::notify::Message;
use crate::repository::{GameStore, RepositoryError};

const NAME: &str = "last-words";

#[derive(Debug, Default, Serialize, Deserialize)]
struct Notes {
    words: BTreeMap<PlayerId, String>,
}

/// Lets players leave a message that is announced when they leave the game.
///
/// Words are revealed when a player is hammered or removed, and forgotten
/// when the game ends.
pub struct LastWords;

impl LastWords {
    pub const NAME: &'static str = NAME;

    /// Records (or replaces) the last words of `player`.
    pub async fn record(
        store: &GameStore,
        instance: InstanceId,
        player: PlayerId,
        words: impl Into<String>,
    ) -> Result<(), RepositoryError> {
        let mut tx = store.begin(instance).await?;
        let mut notes: Notes = tx.extension_data(NAME)?;
        notes.words.insert(player, words.into());
        tx.set_extension_data(NAME, &notes)?;
        tx.commit()?;
        Ok(())
    }

    async fn reveal(ctx: &HookContext<'_>, player: PlayerId) -> HookResult {
        let mut tx = ctx.store.begin(ctx.instance).await?;
        let mut notes: Notes = tx.extension_data(NAME)?;
        let Some(words) = notes.words.remove(&player) else {
            debug!(target: "runtime::extensions", instance = %ctx.instance, %player, "No last words recorded");
            return Ok(());
        };
        tx.set_extension_data(NAME, &notes)?;
        tx.commit()?;

        ctx.notifier
            .send(
                ctx.channels.announcements,
                Message::text(format!("Last words of #{player}: {words}")),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Extension for LastWords {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Announces a player's last words when they are hammered or removed"
    }

    async fn on_hammer(&self, ctx: &HookContext<'_>, target: PlayerId) -> HookResult {
        Self::reveal(ctx, target).await
    }

    async fn on_remove(&self, ctx: &HookContext<'_>, player: PlayerId) -> HookResult {
        Self::reveal(ctx, player).await
    }

    async fn on_end(&self, ctx: &HookContext<'_>) -> HookResult {
        let mut tx = ctx.store.begin(ctx.instance).await?;
        tx.clear_extension_data(NAME);
        tx.commit()?;
        Ok(())
    }
}
