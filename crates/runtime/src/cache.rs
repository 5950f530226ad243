//! Bounded per-instance cache with explicit expiry.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use game_core::InstanceId;

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Cache of values keyed by instance.
///
/// Every entry carries its own expiry. Expired entries are never returned and
/// are swept whenever the cache is full; if it is still full the entry closest
/// to expiry is evicted. Refresh is always explicit through
/// [`InstanceCache::get_or_refresh`] or [`InstanceCache::insert`].
pub struct InstanceCache<V> {
    entries: Mutex<HashMap<InstanceId, CacheEntry<V>>>,
    capacity: usize,
    ttl: Duration,
}

impl<V: Clone> InstanceCache<V> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            ttl,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, instance: InstanceId) -> Option<V> {
        let entries = self.entries.lock().ok()?;
        entries
            .get(&instance)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone())
    }

    pub fn insert(&self, instance: InstanceId, value: V) {
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };
        let now = Instant::now();

        if entries.len() >= self.capacity && !entries.contains_key(&instance) {
            entries.retain(|_, entry| entry.expires_at > now);

            if entries.len() >= self.capacity
                && let Some(oldest) = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.expires_at)
                    .map(|(id, _)| *id)
            {
                entries.remove(&oldest);
            }
        }

        entries.insert(
            instance,
            CacheEntry {
                value,
                expires_at: now + self.ttl,
            },
        );
    }

    pub fn invalidate(&self, instance: InstanceId) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(&instance);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the cached value, or runs `refresh` and caches its result.
    ///
    /// Failed refreshes are not cached.
    pub async fn get_or_refresh<F, Fut, E>(&self, instance: InstanceId, refresh: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(instance) {
            return Ok(value);
        }

        let value = refresh().await?;
        self.insert(instance, value.clone());
        Ok(value)
    }
}
