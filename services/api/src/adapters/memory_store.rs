//! services/api/src/adapters/memory_store.rs
//!
//! A process-local implementation of the `SessionStore` port. Entries carry a
//! deadline and are reclaimed lazily when a read finds them expired; there is
//! no background sweep.

use async_trait::async_trait;
use dashmap::DashMap;
use debugmate_core::ports::{PortResult, SessionStore};
use std::time::Duration;
use tokio::time::Instant;

//=========================================================================================
// TTL Cache
//=========================================================================================

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// A concurrent map whose entries stop being visible once their TTL elapses.
pub(crate) struct LocalCache<V> {
    entries: DashMap<String, Entry<V>>,
}

impl<V: Clone> LocalCache<V> {
    pub(crate) fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub(crate) fn insert(&self, key: &str, value: V, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        self.entries
            .insert(key.to_string(), Entry { value, expires_at });
    }

    pub(crate) fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        match self.entries.get(key) {
            Some(entry) if entry.expires_at > now => return Some(entry.value.clone()),
            Some(_) => {}
            None => return None,
        }
        // The read guard is released above; reclaim the expired entry.
        self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        None
    }

    /// Removes the entry and returns it if it was still live.
    pub(crate) fn take(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        self.entries
            .remove(key)
            .and_then(|(_, entry)| (entry.expires_at > now).then_some(entry.value))
    }

    pub(crate) fn remove(&self, key: &str) {
        self.entries.remove(key);
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An in-process session store. Only suitable as the sole store when a single
/// instance serves every request.
pub struct InMemorySessionStore {
    cache: LocalCache<String>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            cache: LocalCache::new(),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> PortResult<()> {
        self.cache.insert(key, value.to_string(), ttl);
        Ok(())
    }

    async fn get(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.cache.get(key))
    }

    async fn delete(&self, key: &str) -> PortResult<()> {
        self.cache.remove(key);
        Ok(())
    }

    async fn take(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.cache.take(key))
    }
}
