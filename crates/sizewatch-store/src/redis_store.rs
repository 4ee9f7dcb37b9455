//! Redis-backed change store
//!
//! Keeps the whole fingerprint list as one JSON array under a single key,
//! mirroring the file store layout.

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use tracing::{debug, info, instrument};

use crate::error::{StoreError, StoreResult};
use crate::store::ChangeStore;

/// Default key holding the reported fingerprints
pub const DEFAULT_REDIS_KEY: &str = "sizewatch:reported_changes";

/// Redis store configuration
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Redis connection URL
    pub redis_url: String,

    /// Key holding the serialized fingerprint list
    pub key: String,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            key: DEFAULT_REDIS_KEY.to_string(),
        }
    }
}

impl RedisStoreConfig {
    /// Create new store configuration
    pub fn new(redis_url: impl Into<String>) -> Self {
        Self {
            redis_url: redis_url.into(),
            ..Default::default()
        }
    }

    /// Set the key
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }
}

/// Change store persisted under one Redis key
#[derive(Clone)]
pub struct RedisChangeStore {
    connection: ConnectionManager,
    config: RedisStoreConfig,
}

impl RedisChangeStore {
    /// Connect to Redis
    pub async fn connect(config: RedisStoreConfig) -> StoreResult<Self> {
        info!("Connecting to Redis at {}", mask_redis_url(&config.redis_url));

        let client = Client::open(config.redis_url.clone())
            .map_err(|e| StoreError::Configuration(format!("Invalid Redis URL: {}", e)))?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| StoreError::Redis(format!("Failed to connect to Redis: {}", e)))?;

        info!("Successfully connected to Redis");

        Ok(Self { connection, config })
    }
}

#[async_trait]
impl ChangeStore for RedisChangeStore {
    #[instrument(skip(self), fields(key = %self.config.key))]
    async fn load(&self) -> StoreResult<Option<Vec<String>>> {
        let mut conn = self.connection.clone();

        let raw: Option<String> = conn.get(&self.config.key).await?;
        let Some(raw) = raw else {
            debug!("Key does not exist yet");
            return Ok(None);
        };

        let entries: Vec<String> =
            serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt {
                location: self.location(),
                reason: e.to_string(),
            })?;

        debug!(entries = entries.len(), "Loaded fingerprints from Redis");
        Ok(Some(entries))
    }

    #[instrument(skip(self, fingerprints), fields(key = %self.config.key, entries = fingerprints.len()))]
    async fn save(&self, fingerprints: &[String]) -> StoreResult<()> {
        let raw = serde_json::to_string(fingerprints)?;
        let mut conn = self.connection.clone();

        conn.set::<_, _, ()>(&self.config.key, raw).await?;

        debug!("Rewrote fingerprint key");
        Ok(())
    }

    fn location(&self) -> String {
        format!(
            "{}/{}",
            mask_redis_url(&self.config.redis_url),
            self.config.key
        )
    }
}

/// Mask sensitive parts of Redis URL for logging
pub fn mask_redis_url(url: &str) -> String {
    if let Ok(parsed) = url::Url::parse(url) {
        let mut masked = parsed.clone();
        if parsed.password().is_some() {
            let _ = masked.set_password(Some("***"));
        }
        masked.to_string()
    } else {
        url.split('@')
            .last()
            .map(|s| format!("***@{}", s))
            .unwrap_or_else(|| "***".to_string())
    }
}
