use std::collections::HashSet;
use std::path::PathBuf;

use chrono::NaiveDate;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::{
    error::{AppError, AppResult},
    models::GameInfo,
};

/// Accepted formats of the `date` column, ISO first then day-first
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];

/// Parses a game date written in any of the accepted formats
pub fn parse_game_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    // tolerate a trailing time component such as "2025-03-01 00:00:00"
    let day = raw.split_whitespace().next().unwrap_or(raw);
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(day, format).ok())
}

/// Display metadata for every known game, stored as `game_database.csv`
///
/// The file is re-read on each query so rows appended by the updater are
/// visible without a restart.
pub struct GameIndex {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl GameIndex {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Loads all rows. A missing file is an empty index.
    pub async fn load(&self) -> AppResult<Vec<GameInfo>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %self.path.display(), "Game index does not exist yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(bytes.as_slice());

        let mut games = Vec::new();
        for (line, row) in reader.deserialize::<GameInfo>().enumerate() {
            match row {
                Ok(game) => games.push(game),
                Err(e) => tracing::warn!(row = line + 1, error = %e, "Skipping unreadable game index row"),
            }
        }
        Ok(games)
    }

    /// All rows paired with their parsed date, in file order
    async fn load_dated(&self) -> AppResult<Vec<(Option<NaiveDate>, GameInfo)>> {
        Ok(self
            .load()
            .await?
            .into_iter()
            .map(|game| (parse_game_date(&game.date), game))
            .collect())
    }

    fn keep_dated<F>(dated: Vec<(Option<NaiveDate>, GameInfo)>, keep: F) -> Vec<GameInfo>
    where
        F: Fn(NaiveDate) -> bool,
    {
        dated
            .into_iter()
            .filter_map(|(date, game)| date.filter(|d| keep(*d)).map(|_| game))
            .collect()
    }

    /// Games played on `date`.
    ///
    /// A non-empty index in which no date parses is an error rather than an
    /// empty day.
    pub async fn games_on(&self, date: NaiveDate) -> AppResult<Vec<GameInfo>> {
        let dated = self.load_dated().await?;
        if !dated.is_empty() && dated.iter().all(|(parsed, _)| parsed.is_none()) {
            return Err(AppError::Internal(format!(
                "No parseable dates in game index {}",
                self.path.display()
            )));
        }
        Ok(Self::keep_dated(dated, |d| d == date))
    }

    /// Games played between `start` and `end`, both inclusive. Rows with an
    /// unparseable date never match.
    pub async fn games_in_range(&self, start: NaiveDate, end: NaiveDate) -> AppResult<Vec<GameInfo>> {
        let dated = self.load_dated().await?;
        Ok(Self::keep_dated(dated, |d| d >= start && d <= end))
    }

    /// Looks up one game by id
    pub async fn find(&self, game_id: &str) -> AppResult<Option<GameInfo>> {
        let game_id = game_id.trim();
        Ok(self
            .load()
            .await?
            .into_iter()
            .find(|game| game.game_id.trim() == game_id))
    }

    pub async fn existing_ids(&self) -> AppResult<HashSet<String>> {
        Ok(self
            .load()
            .await?
            .into_iter()
            .map(|game| game.game_id.trim().to_string())
            .collect())
    }

    /// Appends rows, writing the header first when the file is new or empty
    pub async fn append(&self, games: &[GameInfo]) -> AppResult<()> {
        if games.is_empty() {
            return Ok(());
        }

        let _guard = self.write_lock.lock().await;

        let is_new = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => return Err(e.into()),
        };

        let mut writer = csv::WriterBuilder::new()
            .has_headers(is_new)
            .from_writer(Vec::new());
        for game in games {
            writer.serialize(game)?;
        }
        let buffer = writer
            .into_inner()
            .map_err(|e| AppError::Internal(format!("Failed to encode game index rows: {}", e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&buffer).await?;
        file.flush().await?;

        tracing::info!(path = %self.path.display(), rows = games.len(), "Appended games to index");
        Ok(())
    }
}
