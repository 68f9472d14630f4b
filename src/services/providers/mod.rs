//! Play-by-play data sources
//!
//! The recommender only needs a game's event log; where it comes from is
//! pluggable. Local CSV exports are the normal path, the ESPN API is used by
//! the updater and as a fallback when a file is missing.

use chrono::NaiveDate;

use crate::{
    error::AppResult,
    models::{EventLog, GameInfo},
};

pub mod espn;
pub mod local;

pub use espn::EspnClient;
pub use local::LocalPlayByPlay;

/// Source of play-by-play event logs
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait EventLogSource: Send + Sync {
    /// Fetches the event log of one game.
    ///
    /// `Ok(None)` means the game has no play-by-play (not played yet,
    /// canceled, or never downloaded); callers skip such games. I/O failures
    /// are errors.
    async fn fetch(&self, game_id: &str) -> AppResult<Option<EventLog>>;

    /// Source name for logging
    fn name(&self) -> &'static str;
}

/// Schedule and display metadata of upcoming and past games
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait GameSchedule: Send + Sync {
    /// Ids of the games played from `start` to `end`, both inclusive
    async fn game_ids(&self, start: NaiveDate, end: NaiveDate) -> AppResult<Vec<String>>;

    /// Teams, venue and start time of one game
    async fn game_info(&self, game_id: &str) -> AppResult<GameInfo>;
}

/// Tries each source in order until one has the game
pub struct FallbackSource {
    sources: Vec<Box<dyn EventLogSource>>,
}

impl FallbackSource {
    pub fn new(sources: Vec<Box<dyn EventLogSource>>) -> Self {
        Self { sources }
    }
}

#[async_trait::async_trait]
impl EventLogSource for FallbackSource {
    async fn fetch(&self, game_id: &str) -> AppResult<Option<EventLog>> {
        for source in &self.sources {
            if let Some(log) = source.fetch(game_id).await? {
                tracing::debug!(game_id = %game_id, source = source.name(), "Play-by-play found");
                return Ok(Some(log));
            }
        }
        Ok(None)
    }

    fn name(&self) -> &'static str {
        "fallback"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PlayEvent;

    #[tokio::test]
    async fn test_fallback_uses_first_source_with_data() {
        let mut empty = MockEventLogSource::new();
        empty.expect_fetch().returning(|_| Ok(None));
        empty.expect_name().return_const("empty");

        let mut full = MockEventLogSource::new();
        full.expect_fetch()
            .returning(|_| Ok(Some(EventLog::new(vec![PlayEvent::default()]))));
        full.expect_name().return_const("full");

        let source = FallbackSource::new(vec![
            Box::new(empty) as Box<dyn EventLogSource>,
            Box::new(full),
        ]);
        let log = source.fetch("1").await.unwrap().unwrap();
        assert_eq!(log.len(), 1);
    }

    #[tokio::test]
    async fn test_fallback_propagates_errors() {
        let mut failing = MockEventLogSource::new();
        failing
            .expect_fetch()
            .returning(|_| Err(crate::error::AppError::ExternalApi("down".to_string())));
        failing.expect_name().return_const("failing");

        let source = FallbackSource::new(vec![Box::new(failing) as Box<dyn EventLogSource>]);
        assert!(source.fetch("1").await.is_err());
    }

    #[tokio::test]
    async fn test_fallback_none_when_no_source_has_game() {
        let mut empty = MockEventLogSource::new();
        empty.expect_fetch().times(1).returning(|_| Ok(None));
        empty.expect_name().return_const("empty");

        let source = FallbackSource::new(vec![Box::new(empty) as Box<dyn EventLogSource>]);
        assert!(source.fetch("1").await.unwrap().is_none());
    }
}
