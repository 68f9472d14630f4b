use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::{error::AppResult, models::FeatureRecord};

/// Key-value store of computed feature records, keyed by game id
///
/// Records never change once computed, so there is no expiry. Writers for the
/// same key are expected not to race; a lost update only costs a recompute.
#[async_trait::async_trait]
pub trait FeatureCache: Send + Sync {
    /// Looks up the record for a game
    async fn get(&self, game_id: &str) -> AppResult<Option<FeatureRecord>>;

    /// Stores a record under its `game_id`
    async fn put(&self, record: &FeatureRecord) -> AppResult<()>;

    /// Persists pending writes. Backends that write through do nothing.
    async fn flush(&self) -> AppResult<()> {
        Ok(())
    }

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Process-local cache, contents are lost on restart
#[derive(Default)]
pub struct MemoryFeatureCache {
    records: RwLock<HashMap<String, FeatureRecord>>,
}

impl MemoryFeatureCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl FeatureCache for MemoryFeatureCache {
    async fn get(&self, game_id: &str) -> AppResult<Option<FeatureRecord>> {
        Ok(self.records.read().await.get(game_id).cloned())
    }

    async fn put(&self, record: &FeatureRecord) -> AppResult<()> {
        self.records
            .write()
            .await
            .insert(record.game_id.clone(), record.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
