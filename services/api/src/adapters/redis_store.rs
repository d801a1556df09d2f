//! services/api/src/adapters/redis_store.rs
//!
//! The shared implementation of the `SessionStore` port, backed by Redis so
//! that every API instance sees the same drafts.
//!
//! The connection is established on first use and retried on every call until
//! it succeeds, so an instance that starts before Redis joins the shared tier
//! as soon as Redis is reachable. Once established, the connection manager
//! reconnects on its own.

use async_trait::async_trait;
use debugmate_core::ports::{PortError, PortResult, SessionStore};
use redis::{aio::ConnectionManager, Client, RedisError};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::info;

/// A `SessionStore` backed by a lazily connected Redis connection manager.
pub struct RedisSessionStore {
    client: Client,
    conn: OnceCell<ConnectionManager>,
}

impl RedisSessionStore {
    /// Parses the URL without touching the network.
    pub fn new(url: &str) -> Result<Self, RedisError> {
        Ok(Self {
            client: Client::open(url)?,
            conn: OnceCell::new(),
        })
    }

    pub fn is_connected(&self) -> bool {
        self.conn.initialized()
    }

    /// Connects (if not yet connected) and checks the server with a `PING`.
    pub async fn ping(&self) -> PortResult<()> {
        let mut conn = self.connection().await?;
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        info!("Redis session store connected: {}", pong);
        Ok(())
    }

    async fn connection(&self) -> PortResult<ConnectionManager> {
        let conn = self
            .conn
            .get_or_try_init(|| ConnectionManager::new(self.client.clone()))
            .await
            .map_err(unavailable)?;
        Ok(conn.clone())
    }
}

fn unavailable(e: RedisError) -> PortError {
    PortError::Unavailable(format!("Redis error: {}", e))
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> PortResult<()> {
        let mut conn = self.connection().await?;
        // EX rejects zero.
        let seconds = ttl.as_secs().max(1);
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(seconds)
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn get(&self, key: &str) -> PortResult<Option<String>> {
        let mut conn = self.connection().await?;
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> PortResult<()> {
        let mut conn = self.connection().await?;
        let _: i64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn take(&self, key: &str) -> PortResult<Option<String>> {
        let mut conn = self.connection().await?;
        // GETDEL is atomic on the server, which gives the single-winner guarantee.
        let value: Option<String> = redis::cmd("GETDEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Nothing listens on port 1, so every connection attempt is refused.
    const UNREACHABLE: &str = "redis://127.0.0.1:1/";

    #[test]
    fn construction_does_not_need_a_reachable_server() {
        let store = RedisSessionStore::new(UNREACHABLE).unwrap();
        assert!(!store.is_connected());
    }

    #[test]
    fn invalid_urls_are_rejected_up_front() {
        assert!(RedisSessionStore::new("not a url").is_err());
    }

    #[tokio::test]
    async fn unreachable_server_fails_each_call_and_stays_retryable() {
        let store = RedisSessionStore::new(UNREACHABLE).unwrap();
        assert!(matches!(store.get("session:1").await, Err(PortError::Unavailable(_))));
        // A failed attempt leaves nothing cached, so the next call tries again.
        assert!(!store.is_connected());
    }
}
