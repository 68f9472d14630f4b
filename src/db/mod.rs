pub mod cache;
pub mod file;
pub mod redis;

pub use cache::{FeatureCache, MemoryFeatureCache};
pub use file::FileFeatureCache;
pub use self::redis::{create_redis_client, CacheWriterHandle, RedisFeatureCache};

use std::sync::Arc;

use crate::config::{CacheBackend, Config};

/// Opens the configured feature cache backend.
///
/// The Redis backend also returns the handle that flushes its queued writes
/// on shutdown.
pub async fn open_feature_cache(
    config: &Config,
) -> anyhow::Result<(Arc<dyn FeatureCache>, Option<CacheWriterHandle>)> {
    let (cache, handle): (Arc<dyn FeatureCache>, Option<CacheWriterHandle>) =
        match config.cache_backend {
            CacheBackend::File => {
                let cache = FileFeatureCache::open(&config.feature_cache_path).await?;
                (Arc::new(cache) as Arc<dyn FeatureCache>, None)
            }
            CacheBackend::Redis => {
                let client = create_redis_client(&config.redis_url)?;
                let (cache, handle) = RedisFeatureCache::new(client);
                (Arc::new(cache) as Arc<dyn FeatureCache>, Some(handle))
            }
            CacheBackend::Memory => (Arc::new(MemoryFeatureCache::new()) as Arc<dyn FeatureCache>, None),
        };

    tracing::info!(backend = cache.name(), "Feature cache ready");
    Ok((cache, handle))
}
