use serde::{Deserialize, Serialize};

mod features;
mod game;
mod play;

pub use features::{FeatureRecord, NUMERIC_FEATURE_COUNT};
pub use game::{GameId, GameInfo};
pub use play::{EventLog, Leader, PlayEvent};

use crate::services::similarity::Aggregation;

// ============================================================================
// API Types
// ============================================================================

/// Body of `POST /api/recommender`
#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    #[serde(default)]
    pub liked_game_ids: Vec<GameId>,
    /// Look-back window in days, ending at `end_date`
    pub days: u32,
    /// Number of recommendations to return
    pub games: usize,
    #[serde(default)]
    pub aggregation: Aggregation,
    /// Defaults to today (UTC)
    #[serde(default)]
    pub end_date: Option<chrono::NaiveDate>,
}

/// A recommended game with the score it was ranked by
#[derive(Debug, Clone, Serialize)]
pub struct RecommendedGame {
    #[serde(flatten)]
    pub game: GameInfo,
    pub score: f64,
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub recommended_games: Vec<RecommendedGame>,
}

#[derive(Debug, Serialize)]
pub struct GamesResponse {
    pub games: Vec<GameInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommendation_request_defaults() {
        let request: RecommendationRequest =
            serde_json::from_str(r#"{"days": 7, "games": 3}"#).unwrap();
        assert!(request.liked_game_ids.is_empty());
        assert_eq!(request.aggregation, Aggregation::Mean);
        assert_eq!(request.end_date, None);
    }

    #[test]
    fn test_recommendation_request_full() {
        let request: RecommendationRequest = serde_json::from_str(
            r#"{"liked_game_ids": [401585306, "401585307"], "days": 14, "games": 5,
                "aggregation": {"top_k": 2}, "end_date": "2025-04-20"}"#,
        )
        .unwrap();
        assert_eq!(request.liked_game_ids.len(), 2);
        assert_eq!(request.aggregation, Aggregation::TopK(2));
        assert_eq!(
            request.end_date,
            chrono::NaiveDate::from_ymd_opt(2025, 4, 20)
        );
    }
}
