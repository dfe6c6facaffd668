use crate::error::{FeedError, Result};
use crate::services::store::KeyValueStore;
use async_trait::async_trait;
use redis::{aio::ConnectionManager, RedisResult};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Redis key prefix
const KEY_PREFIX: &str = "pricewell:";

/// Redis-backed key-value store.
///
/// When Redis is unreachable at startup the store degrades to a no-op:
/// reads miss and writes are dropped.
#[derive(Clone)]
pub struct RedisStore {
    conn: Arc<RwLock<Option<ConnectionManager>>>,
}

impl RedisStore {
    /// Create a new RedisStore, connecting to Redis at the given URL.
    pub async fn new(redis_url: &str) -> Self {
        let conn = match Self::connect(redis_url).await {
            Ok(c) => {
                info!("Connected to Redis at {}", redis_url);
                Some(c)
            }
            Err(e) => {
                warn!(
                    "Failed to connect to Redis: {}. Running without persistence.",
                    e
                );
                None
            }
        };

        Self {
            conn: Arc::new(RwLock::new(conn)),
        }
    }

    async fn connect(redis_url: &str) -> RedisResult<ConnectionManager> {
        let client = redis::Client::open(redis_url)?;
        ConnectionManager::new(client).await
    }

    /// Check if Redis is connected.
    pub async fn is_connected(&self) -> bool {
        self.conn.read().await.is_some()
    }

    async fn connection(&self) -> Option<ConnectionManager> {
        self.conn.read().await.clone()
    }
}

fn storage_err(e: redis::RedisError) -> FeedError {
    FeedError::Storage(e.to_string())
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let Some(mut conn) = self.connection().await else {
            return Ok(None);
        };
        redis::cmd("GET")
            .arg(format!("{}{}", KEY_PREFIX, key))
            .query_async::<_, Option<String>>(&mut conn)
            .await
            .map_err(storage_err)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let Some(mut conn) = self.connection().await else {
            return Ok(());
        };
        redis::cmd("SET")
            .arg(format!("{}{}", KEY_PREFIX, key))
            .arg(value)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(storage_err)
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let Some(mut conn) = self.connection().await else {
            return Ok(());
        };
        redis::cmd("DEL")
            .arg(format!("{}{}", KEY_PREFIX, key))
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(storage_err)
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let Some(mut conn) = self.connection().await else {
            return Ok(Vec::new());
        };
        let keys: Vec<String> = redis::cmd("KEYS")
            .arg(format!("{}*", KEY_PREFIX))
            .query_async(&mut conn)
            .await
            .map_err(storage_err)?;

        Ok(keys
            .into_iter()
            .filter_map(|k| k.strip_prefix(KEY_PREFIX).map(str::to_string))
            .collect())
    }
}
