//! Instance directory: resolves the chat channels each instance posts to.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use game_core::InstanceId;

use crate::cache::InstanceCache;
use crate::notify::ChannelRef;

/// Channels an instance announces to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceChannels {
    /// Phase announcements and extension reveals.
    pub announcements: ChannelRef,
    /// Vote boards.
    pub votes: ChannelRef,
    /// Operator alerts such as hook failures and scheduler errors.
    pub operator: ChannelRef,
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("instance {0} is not registered")]
    Unknown(InstanceId),

    #[error("directory lookup failed: {0}")]
    Lookup(String),
}

#[async_trait]
pub trait InstanceDirectory: Send + Sync {
    async fn channels(&self, instance: InstanceId) -> Result<InstanceChannels, DirectoryError>;
}

/// Directory backed by a fixed table, with an optional fallback entry.
#[derive(Clone, Debug, Default)]
pub struct StaticDirectory {
    instances: HashMap<InstanceId, InstanceChannels>,
    fallback: Option<InstanceChannels>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_instance(mut self, instance: InstanceId, channels: InstanceChannels) -> Self {
        self.instances.insert(instance, channels);
        self
    }

    pub fn with_fallback(mut self, channels: InstanceChannels) -> Self {
        self.fallback = Some(channels);
        self
    }
}

#[async_trait]
impl InstanceDirectory for StaticDirectory {
    async fn channels(&self, instance: InstanceId) -> Result<InstanceChannels, DirectoryError> {
        self.instances
            .get(&instance)
            .or(self.fallback.as_ref())
            .copied()
            .ok_or(DirectoryError::Unknown(instance))
    }
}

/// Directory decorator that caches lookups per instance.
pub struct CachedDirectory {
    inner: Arc<dyn InstanceDirectory>,
    cache: InstanceCache<InstanceChannels>,
}

impl CachedDirectory {
    pub fn new(inner: Arc<dyn InstanceDirectory>, capacity: usize, ttl: Duration) -> Self {
        Self {
            inner,
            cache: InstanceCache::new(capacity, ttl),
        }
    }

    /// Drops the cached entry and looks the instance up again.
    pub async fn refresh(&self, instance: InstanceId) -> Result<InstanceChannels, DirectoryError> {
        self.cache.invalidate(instance);
        self.channels(instance).await
    }
}

#[async_trait]
impl InstanceDirectory for CachedDirectory {
    async fn channels(&self, instance: InstanceId) -> Result<InstanceChannels, DirectoryError> {
        self.cache
            .get_or_refresh(instance, || async {
                debug!(target: "runtime::directory", %instance, "Refreshing instance channels");
                self.inner.channels(instance).await
            })
            .await
    }
}
