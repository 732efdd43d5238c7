//! Redis-backed response cache
//!
//! Values are stored as JSON under a configured key prefix with a TTL. When the
//! cache feature is disabled every operation is a no-op and lookups miss.
//! One `ConnectionManager` is opened on first use and shared by all clones.

use std::fmt;
use std::sync::Arc;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};
use crate::config::settings::Settings;
use tokio::sync::OnceCell;
use crate::utils::errors::Result;

#[derive(Clone)]
pub struct CacheService {
    client: Option<Client>,
    connection_manager: Arc<OnceCell<ConnectionManager>>,
    prefix: String,
    ttl_seconds: u64,
}

impl fmt::Debug for CacheService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheService")
            .field("enabled", &self.is_enabled())
            .field("connected", &self.is_connected())
            .field("prefix", &self.prefix)
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

impl CacheService {
    /// Create a cache from settings; the client is only opened when the feature is on
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = if settings.features.redis_cache {
            Some(Client::open(settings.redis.url.as_str())?)
        } else {
            None
        };

        Ok(Self {
            client,
            connection_manager: Arc::new(OnceCell::new()),
            prefix: settings.redis.prefix.clone(),
            ttl_seconds: settings.redis.ttl_seconds,
        })
    }

    /// A cache that never stores anything
    pub fn disabled() -> Self {
        Self {
            client: None,
            connection_manager: Arc::new(OnceCell::new()),
            prefix: String::new(),
            ttl_seconds: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    /// Whether the shared connection manager has been opened
    pub fn is_connected(&self) -> bool {
        self.connection_manager.initialized()
    }

    pub fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    pub fn event_key(event_id: i64) -> String {
        format!("event:{}", event_id)
    }

    /// Clone of the shared manager, opened on first use; a failed open is retried next time
    async fn connection(&self) -> Result<Option<ConnectionManager>> {
        let Some(ref client) = self.client else {
            return Ok(None);
        };
        let manager = self
            .connection_manager
            .get_or_try_init(|| ConnectionManager::new(client.clone()))
            .await?;
        Ok(Some(manager.clone()))
    }

    /// Set a value with the default TTL
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let Some(mut conn) = self.connection().await? else {
            return Ok(());
        };
        let full_key = self.full_key(key);
        let serialized = serde_json::to_string(value)?;

        let _: () = conn.set_ex(&full_key, serialized, self.ttl_seconds).await?;
        debug!(key = %full_key, ttl = self.ttl_seconds, "Value set in Redis");
        Ok(())
    }

    /// Get a value
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(mut conn) = self.connection().await? else {
            return Ok(None);
        };
        let full_key = self.full_key(key);

        let raw: Option<String> = conn.get(&full_key).await?;
        match raw {
            Some(data) => {
                debug!(key = %full_key, "Cache hit");
                Ok(Some(serde_json::from_str(&data)?))
            }
            None => {
                debug!(key = %full_key, "Cache miss");
                Ok(None)
            }
        }
    }

    /// Delete a key
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let Some(mut conn) = self.connection().await? else {
            return Ok(false);
        };
        let full_key = self.full_key(key);

        let deleted: i64 = conn.del(&full_key).await?;
        debug!(key = %full_key, deleted = deleted > 0, "Key deletion attempted");
        Ok(deleted > 0)
    }

    /// Lookup that treats cache failures as misses
    pub async fn fetch<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key = key, error = %e, "Cache read failed");
                None
            }
        }
    }

    /// Store that logs and ignores cache failures
    pub async fn store<T: Serialize>(&self, key: &str, value: &T) {
        if let Err(e) = self.set(key, value).await {
            warn!(key = key, error = %e, "Cache write failed");
        }
    }

    /// Invalidate that logs and ignores cache failures
    pub async fn invalidate(&self, key: &str) {
        if let Err(e) = self.delete(key).await {
            warn!(key = key, error = %e, "Cache invalidation failed");
        }
    }

    /// Ping Redis; a disabled cache is healthy
    pub async fn health_check(&self) -> Result<bool> {
        let Some(mut conn) = self.connection().await? else {
            return Ok(true);
        };
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong == "PONG")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_cache_is_a_no_op() {
        let cache = CacheService::new(&Settings::default()).unwrap();
        assert!(!cache.is_enabled());

        cache.store("event:1", &serde_json::json!({"title": "x"})).await;
        assert_eq!(cache.fetch::<serde_json::Value>("event:1").await, None);
        assert!(!cache.delete("event:1").await.unwrap());
        assert!(cache.health_check().await.unwrap());
        assert!(!cache.is_connected());
    }

    #[test]
    fn test_keys_are_prefixed() {
        let mut settings = Settings::default();
        settings.features.redis_cache = true;
        settings.redis.prefix = "test:".to_string();
        let cache = CacheService::new(&settings).unwrap();

        assert!(cache.is_enabled());
        assert!(!cache.is_connected());
        assert!(!cache.clone().is_connected());
        assert_eq!(cache.full_key(&CacheService::event_key(7)), "test:event:7");
        assert_eq!(CacheService::disabled().full_key("a"), "a");
    }
}
