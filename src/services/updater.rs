use std::sync::Arc;

use chrono::NaiveDate;

use crate::{
    db::FeatureCache,
    error::AppResult,
    models::GameInfo,
    services::{
        features::{ExtractError, FeatureExtractor},
        game_index::GameIndex,
        providers::{EventLogSource, GameSchedule, LocalPlayByPlay},
    },
};

/// Totals of one update run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub added: usize,
    pub skipped_existing: usize,
    pub unavailable: usize,
    pub failed: usize,
    pub features_cached: usize,
}

/// Ingests newly played games into the local data set.
///
/// For each game in the date range that the index does not know yet, the
/// play-by-play is stored next to the other exports, the final score is
/// looked up, the index row is appended and the features are cached.
pub struct Updater {
    schedule: Arc<dyn GameSchedule>,
    source: Arc<dyn EventLogSource>,
    store: LocalPlayByPlay,
    index: Arc<GameIndex>,
    cache: Arc<dyn FeatureCache>,
    extractor: FeatureExtractor,
}

impl Updater {
    pub fn new(
        schedule: Arc<dyn GameSchedule>,
        source: Arc<dyn EventLogSource>,
        store: LocalPlayByPlay,
        index: Arc<GameIndex>,
        cache: Arc<dyn FeatureCache>,
    ) -> Self {
        Self {
            schedule,
            source,
            store,
            index,
            cache,
            extractor: FeatureExtractor::default(),
        }
    }

    pub async fn run(&self, start: NaiveDate, end: NaiveDate) -> AppResult<UpdateReport> {
        let mut report = UpdateReport::default();
        let existing = self.index.existing_ids().await?;
        let game_ids = self.schedule.game_ids(start, end).await?;

        tracing::info!(
            start = %start,
            end = %end,
            scheduled = game_ids.len(),
            known = existing.len(),
            "Starting game update"
        );

        let mut rows = Vec::new();
        for game_id in &game_ids {
            if existing.contains(game_id.trim()) {
                report.skipped_existing += 1;
                continue;
            }

            match self.ingest(game_id, &mut report).await {
                Ok(Some(row)) => {
                    rows.push(row);
                    report.added += 1;
                }
                Ok(None) => report.unavailable += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(game_id = %game_id, error = %e, "Failed to ingest game");
                }
            }
        }

        self.index.append(&rows).await?;
        if report.features_cached > 0 {
            self.cache.flush().await?;
        }

        tracing::info!(
            added = report.added,
            skipped_existing = report.skipped_existing,
            unavailable = report.unavailable,
            failed = report.failed,
            features_cached = report.features_cached,
            "Game update finished"
        );
        Ok(report)
    }

    /// Ingests one game, returning its index row or `None` when it has no play-by-play
    async fn ingest(&self, game_id: &str, report: &mut UpdateReport) -> AppResult<Option<GameInfo>> {
        let mut info = self.schedule.game_info(game_id).await?;

        let Some(log) = self.source.fetch(game_id).await? else {
            tracing::warn!(game_id = %game_id, "No play-by-play, game may have been canceled");
            return Ok(None);
        };
        self.store.store(game_id, &log).await?;

        match self.extractor.final_score(&log) {
            Ok((away, home)) => {
                info.away_score = Some(away);
                info.home_score = Some(home);
            }
            Err(ExtractError::ScoresNotFound) => {
                tracing::warn!(game_id = %game_id, "No end-of-game event, final score unknown");
            }
            Err(e) => return Err(e.into()),
        }
        info.game_string = info.display_string();

        match self.extractor.extract(game_id, &log) {
            Ok(record) => {
                self.cache.put(&record).await?;
                report.features_cached += 1;
            }
            Err(e) => {
                tracing::warn!(game_id = %game_id, error = %e, "Could not compute features");
            }
        }

        tracing::info!(game_id = %game_id, game = %info.game_string, "Ingested game");
        Ok(Some(info))
    }
}
