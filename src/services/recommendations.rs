use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::{
    db::FeatureCache,
    error::{AppError, AppResult},
    models::{FeatureRecord, GameInfo, RecommendedGame},
    services::{
        features::FeatureExtractor,
        providers::EventLogSource,
        similarity::{Aggregation, ScoringEngine},
    },
};

/// Outcome of resolving one game id to features
enum Resolved {
    Cached(FeatureRecord),
    Computed(FeatureRecord),
    Unavailable,
}

/// Recommends games from a date window based on the games a user liked
///
/// Feature records come from the cache; misses are computed from the event
/// log source and written back.
pub struct Recommender {
    cache: Arc<dyn FeatureCache>,
    source: Arc<dyn EventLogSource>,
    extractor: FeatureExtractor,
    engine: ScoringEngine,
}

impl Recommender {
    pub fn new(cache: Arc<dyn FeatureCache>, source: Arc<dyn EventLogSource>) -> Self {
        Self {
            cache,
            source,
            extractor: FeatureExtractor::default(),
            engine: ScoringEngine::default(),
        }
    }

    async fn lookup(&self, game_id: &str) -> AppResult<Resolved> {
        if let Some(record) = self.cache.get(game_id).await? {
            return Ok(Resolved::Cached(record));
        }

        let log = match self.source.fetch(game_id).await {
            Ok(Some(log)) => log,
            Ok(None) => {
                tracing::warn!(game_id = %game_id, source = self.source.name(), "No play-by-play available, skipping game");
                return Ok(Resolved::Unavailable);
            }
            Err(AppError::Extraction(e)) => {
                tracing::warn!(game_id = %game_id, error = %e, "Malformed play-by-play, skipping game");
                return Ok(Resolved::Unavailable);
            }
            Err(e) => return Err(e),
        };

        match self.extractor.extract(game_id, &log) {
            Ok(record) => {
                self.cache.put(&record).await?;
                tracing::info!(game_id = %game_id, cache = self.cache.name(), "Computed and cached features");
                Ok(Resolved::Computed(record))
            }
            Err(e) => {
                tracing::warn!(game_id = %game_id, error = %e, "Feature extraction failed, skipping game");
                Ok(Resolved::Unavailable)
            }
        }
    }

    /// Feature records for `game_ids`, in order, skipping unavailable games.
    ///
    /// Flushes the cache once if any record had to be computed.
    pub async fn resolve_features(&self, game_ids: &[String]) -> AppResult<Vec<FeatureRecord>> {
        let mut records = Vec::with_capacity(game_ids.len());
        let mut computed = 0usize;

        for game_id in game_ids {
            match self.lookup(game_id).await? {
                Resolved::Cached(record) => records.push(record),
                Resolved::Computed(record) => {
                    computed += 1;
                    records.push(record);
                }
                Resolved::Unavailable => {}
            }
        }

        if computed > 0 {
            self.cache.flush().await?;
        }

        tracing::debug!(
            requested = game_ids.len(),
            resolved = records.len(),
            computed,
            "Resolved feature records"
        );
        Ok(records)
    }

    /// Features of a single game, computed on a cache miss
    pub async fn features_for(&self, game_id: &str) -> AppResult<Option<FeatureRecord>> {
        let game_id = game_id.trim();
        Ok(self
            .resolve_features(&[game_id.to_string()])
            .await?
            .into_iter()
            .next())
    }

    /// Ranks the games of `window` against the liked games.
    ///
    /// Liked games are never recommended back. With no resolvable liked game
    /// the window is ranked by excitement alone.
    pub async fn recommend(
        &self,
        window: &[GameInfo],
        liked_ids: &[String],
        count: usize,
        aggregation: Aggregation,
    ) -> AppResult<Vec<RecommendedGame>> {
        let liked_set: HashSet<&str> = liked_ids.iter().map(|id| id.trim()).collect();
        let candidate_ids: Vec<String> = window
            .iter()
            .map(|game| game.game_id.trim().to_string())
            .filter(|id| !liked_set.contains(id.as_str()))
            .collect();

        let candidates = self.resolve_features(&candidate_ids).await?;
        let liked = self.resolve_features(liked_ids).await?;

        tracing::info!(
            window = window.len(),
            candidates = candidates.len(),
            liked = liked.len(),
            count,
            aggregation = ?aggregation,
            "Ranking games"
        );

        let mut rows: HashMap<&str, &GameInfo> = HashMap::with_capacity(window.len());
        for game in window {
            rows.entry(game.game_id.trim()).or_insert(game);
        }

        let engine = self.engine.clone().with_aggregation(aggregation);
        let recommended = engine
            .rank_scored(&candidates, &liked, count)
            .into_iter()
            .filter_map(|scored| {
                rows.get(scored.record.game_id.as_str())
                    .map(|game| RecommendedGame {
                        game: (*game).clone(),
                        score: scored.score,
                    })
            })
            .collect();

        Ok(recommended)
    }
}
