use std::path::PathBuf;

use crate::{
    error::{AppError, AppResult},
    models::EventLog,
    services::features::{read_event_log, write_event_log},
    services::providers::EventLogSource,
};

/// Play-by-play CSV exports stored as `<dir>/espn_play_by_play_<game_id>.csv`
#[derive(Debug, Clone)]
pub struct LocalPlayByPlay {
    dir: PathBuf,
}

impl LocalPlayByPlay {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, game_id: &str) -> PathBuf {
        self.dir
            .join(format!("espn_play_by_play_{}.csv", game_id.trim()))
    }

    /// Writes a game's event log, replacing any existing export
    pub async fn store(&self, game_id: &str, log: &EventLog) -> AppResult<PathBuf> {
        let mut buffer = Vec::new();
        write_event_log(&mut buffer, log)?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(game_id);
        tokio::fs::write(&path, buffer).await?;

        tracing::debug!(game_id = %game_id, path = %path.display(), events = log.len(), "Stored play-by-play");
        Ok(path)
    }
}

#[async_trait::async_trait]
impl EventLogSource for LocalPlayByPlay {
    async fn fetch(&self, game_id: &str) -> AppResult<Option<EventLog>> {
        let path = self.path_for(game_id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(game_id = %game_id, path = %path.display(), "No play-by-play file");
                return Ok(None);
            }
            Err(e) => return Err(AppError::Io(e)),
        };

        let log = read_event_log(bytes.as_slice())?;
        Ok(Some(log))
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
