use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use tokio::sync::mpsc;

use crate::db::FeatureCache;
use crate::error::AppError;
use crate::error::AppResult;
use crate::models::FeatureRecord;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Features(String),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Features(game_id) => write!(f, "features:{}", game_id.trim()),
        }
    }
}

/// Creates a Redis client for the feature cache
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Message for asynchronous cache writes
struct CacheWriteMessage {
    key: String,
    value: String,
}

/// Feature cache stored in Redis, one key per game
///
/// Reads go straight to Redis. Writes are queued to a background task so a
/// request never waits on them; the task drains the queue on shutdown.
#[derive(Clone)]
pub struct RedisFeatureCache {
    redis_client: Client,
    write_tx: mpsc::UnboundedSender<CacheWriteMessage>,
}

/// Handle for gracefully shutting down the cache writer
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

impl CacheWriterHandle {
    /// Signals the writer task and waits until queued writes are flushed
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Cache writer shutdown signal sent");
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Cache writer task failed");
        }
    }
}

impl RedisFeatureCache {
    /// Creates the cache and spawns its background writer
    pub fn new(redis_client: Client) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let client = redis_client.clone();
        let task = tokio::spawn(async move {
            Self::cache_writer_task(client, write_rx, shutdown_rx).await;
        });

        let cache = Self {
            redis_client,
            write_tx,
        };

        (cache, CacheWriterHandle { shutdown_tx, task })
    }

    async fn cache_writer_task(
        client: Client,
        mut write_rx: mpsc::UnboundedReceiver<CacheWriteMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!("Cache writer task started");
        let mut failed_writes = 0usize;

        loop {
            tokio::select! {
                Some(msg) = write_rx.recv() => {
                    if let Err(e) = Self::write_to_redis(&client, msg).await {
                        failed_writes += 1;
                        tracing::error!(error = %e, "Failed to write feature record to Redis");
                    }
                }
                _ = shutdown_rx.recv() => {
                    write_rx.close();
                    tracing::info!(failed = failed_writes, "Cache writer shutting down, flushing remaining writes");

                    while let Some(msg) = write_rx.recv().await {
                        if let Err(e) = Self::write_to_redis(&client, msg).await {
                            tracing::error!(error = %e, "Failed to flush cache write during shutdown");
                        }
                    }

                    tracing::info!("Cache writer task stopped");
                    break;
                }
            }
        }
    }

    /// Feature records never expire, so plain SET without TTL
    async fn write_to_redis(client: &Client, msg: CacheWriteMessage) -> AppResult<()> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: () = conn.set(msg.key, msg.value).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl FeatureCache for RedisFeatureCache {
    async fn get(&self, game_id: &str) -> AppResult<Option<FeatureRecord>> {
        let key = CacheKey::Features(game_id.to_string());
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(key.to_string()).await?;

        match cached {
            Some(json) => {
                let record = serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Cache deserialization error: {}", e))
                })?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, record: &FeatureRecord) -> AppResult<()> {
        let value = serde_json::to_string(record)
            .map_err(|e| AppError::Internal(format!("Cache serialization error: {}", e)))?;

        let msg = CacheWriteMessage {
            key: CacheKey::Features(record.game_id.clone()).to_string(),
            value,
        };

        self.write_tx
            .send(msg)
            .map_err(|_| AppError::Internal("Cache writer is not running".to_string()))
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NUMERIC_FEATURE_COUNT;

    fn redis_url() -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
    }

    #[test]
    fn test_cache_key_display_features() {
        let key = CacheKey::Features("401585306".to_string());
        assert_eq!(format!("{}", key), "features:401585306");
    }

    #[test]
    fn test_cache_key_display_trims_id() {
        let key = CacheKey::Features(" 401585306 ".to_string());
        assert_eq!(key.to_string(), "features:401585306");
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn test_cache_miss() {
        let client = create_redis_client(&redis_url()).unwrap();
        let (cache, _handle) = RedisFeatureCache::new(client);

        let retrieved = cache.get("nonexistent_game_12345").await.unwrap();
        assert_eq!(retrieved, None);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn test_put_is_visible_after_shutdown_flush() {
        let client = create_redis_client(&redis_url()).unwrap();
        let (cache, handle) = RedisFeatureCache::new(client.clone());

        let record = FeatureRecord::from_numeric("test_shutdown_game", [0.125; NUMERIC_FEATURE_COUNT]);
        cache.put(&record).await.unwrap();

        handle.shutdown().await;

        let retrieved = cache.get("test_shutdown_game").await.unwrap();
        assert_eq!(retrieved, Some(record));

        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let _: () = conn.del("features:test_shutdown_game").await.unwrap();
    }
}
