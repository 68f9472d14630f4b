use std::collections::BTreeMap;
use std::path::PathBuf;

use tokio::sync::RwLock;

use crate::{
    db::FeatureCache,
    error::{AppError, AppResult},
    models::FeatureRecord,
};

struct FileState {
    records: BTreeMap<String, FeatureRecord>,
    dirty: bool,
}

/// Feature cache persisted as a single JSON file
///
/// The whole map is loaded on open. Writes stay in memory until [`flush`],
/// which replaces the file atomically.
///
/// [`flush`]: FeatureCache::flush
pub struct FileFeatureCache {
    path: PathBuf,
    state: RwLock<FileState>,
}

impl FileFeatureCache {
    /// Opens the cache file, starting empty when it does not exist yet
    pub async fn open(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        let records = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                AppError::Internal(format!(
                    "Feature cache {} is corrupt: {}",
                    path.display(),
                    e
                ))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            path = %path.display(),
            records = records.len(),
            "Loaded feature cache"
        );

        Ok(Self {
            path,
            state: RwLock::new(FileState {
                records,
                dirty: false,
            }),
        })
    }

}

#[async_trait::async_trait]
impl FeatureCache for FileFeatureCache {
    async fn get(&self, game_id: &str) -> AppResult<Option<FeatureRecord>> {
        Ok(self.state.read().await.records.get(game_id).cloned())
    }

    async fn put(&self, record: &FeatureRecord) -> AppResult<()> {
        let mut state = self.state.write().await;
        state
            .records
            .insert(record.game_id.clone(), record.clone());
        state.dirty = true;
        Ok(())
    }

    async fn flush(&self) -> AppResult<()> {
        // held for the whole write so concurrent flushes serialize
        let mut state = self.state.write().await;
        if !state.dirty {
            return Ok(());
        }

        let json = serde_json::to_vec(&state.records)
            .map_err(|e| AppError::Internal(format!("Cache serialization error: {}", e)))?;

        let tmp_path = self.path.with_extension("json.tmp");
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&tmp_path, json).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        state.dirty = false;

        tracing::info!(
            path = %self.path.display(),
            records = state.records.len(),
            "Feature cache flushed"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
