//! Notification collaborator: posting text to chat channels.
//!
//! Rendering and delivery belong to the chat platform; the runtime only needs a
//! way to post a message to a channel and learn the posted message's id.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use game_core::MessageId;

/// Platform reference of a channel messages can be posted to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelRef(pub u64);

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    Text(String),
    /// Titled block, rendered by the platform as an embed or similar.
    Board { title: String, body: String },
}

impl Message {
    pub fn text(text: impl Into<String>) -> Self {
        Message::Text(text.into())
    }
}

#[derive(Debug, Error)]
#[error("failed to post to channel {channel}: {reason}")]
pub struct NotifyError {
    pub channel: ChannelRef,
    pub reason: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, channel: ChannelRef, message: Message) -> Result<MessageId, NotifyError>;
}

/// Notifier that writes every message to the log.
///
/// Used by the daemon when no chat platform is attached.
#[derive(Debug, Default)]
pub struct TracingNotifier {
    next_id: AtomicU64,
}

impl TracingNotifier {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Notifier for TracingNotifier {
    async fn send(&self, channel: ChannelRef, message: Message) -> Result<MessageId, NotifyError> {
        let id = MessageId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        match message {
            Message::Text(text) => {
                info!(target: "runtime::notify", %channel, message = id.0, "{}", text)
            }
            Message::Board { title, body } => {
                info!(target: "runtime::notify", %channel, message = id.0, %title, "{}", body)
            }
        }
        Ok(id)
    }
}
