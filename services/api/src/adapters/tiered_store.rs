//! services/api/src/adapters/tiered_store.rs
//!
//! The session store the API actually runs on: a process-local fast path in
//! front of an optional shared store that is the source of truth.
//!
//! The shared tier is best-effort. When it is unreachable, writes still land
//! in the local tier and reads fall back to it, so phase 2 keeps working on the
//! instance that ran phase 1. Completion on any other instance is NOT
//! guaranteed while the shared store is down.

use crate::adapters::memory_store::LocalCache;
use async_trait::async_trait;
use debugmate_core::ports::{PortError, PortResult, SessionStore};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

#[derive(Clone)]
struct LocalEntry {
    value: String,
    /// Whether the shared tier accepted the write. Decides who arbitrates `take`.
    mirrored: bool,
}

pub struct TieredSessionStore {
    local: LocalCache<LocalEntry>,
    shared: Option<Arc<dyn SessionStore>>,
    shared_timeout: Duration,
}

impl TieredSessionStore {
    /// `shared_timeout` bounds every call to the shared tier.
    pub fn new(shared: Option<Arc<dyn SessionStore>>, shared_timeout: Duration) -> Self {
        Self {
            local: LocalCache::new(),
            shared,
            shared_timeout,
        }
    }

    pub fn has_shared_tier(&self) -> bool {
        self.shared.is_some()
    }

    async fn within_deadline<T>(
        &self,
        op: &str,
        fut: impl Future<Output = PortResult<T>>,
    ) -> PortResult<T> {
        match tokio::time::timeout(self.shared_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(PortError::Unavailable(format!(
                "shared session store timed out during {}",
                op
            ))),
        }
    }
}

#[async_trait]
impl SessionStore for TieredSessionStore {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> PortResult<()> {
        let mirrored = match &self.shared {
            Some(shared) => match self.within_deadline("put", shared.put(key, value, ttl)).await {
                Ok(()) => true,
                Err(e) => {
                    warn!("Shared session store write failed for {}, keeping it local only: {}", key, e);
                    false
                }
            },
            None => false,
        };

        self.local.insert(
            key,
            LocalEntry {
                value: value.to_string(),
                mirrored,
            },
            ttl,
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> PortResult<Option<String>> {
        if let Some(entry) = self.local.get(key) {
            return Ok(Some(entry.value));
        }

        let Some(shared) = &self.shared else {
            return Ok(None);
        };
        match self.within_deadline("get", shared.get(key)).await {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!("Shared session store read failed for {}, treating as absent: {}", key, e);
                Ok(None)
            }
        }
    }

    async fn delete(&self, key: &str) -> PortResult<()> {
        self.local.remove(key);
        if let Some(shared) = &self.shared {
            if let Err(e) = self.within_deadline("delete", shared.delete(key)).await {
                warn!("Shared session store delete failed for {}: {}", key, e);
            }
        }
        Ok(())
    }

    async fn take(&self, key: &str) -> PortResult<Option<String>> {
        let local = self.local.take(key);

        // The shared tier never saw this value, so the local take is authoritative.
        if let Some(entry) = &local {
            if !entry.mirrored {
                return Ok(Some(entry.value.clone()));
            }
        }

        let Some(shared) = &self.shared else {
            return Ok(local.map(|entry| entry.value));
        };
        match self.within_deadline("take", shared.take(key)).await {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(
                    "Shared session store take failed for {}, falling back to the local tier: {}",
                    key, e
                );
                Ok(local.map(|entry| entry.value))
            }
        }
    }
}
