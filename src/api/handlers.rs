use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{Days, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    models::{
        FeatureRecord, GamesResponse, RecommendationRequest, RecommendationResponse,
    },
};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    date: Option<String>,
}

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Games played on one day, `?date=YYYY-MM-DD`
pub async fn games_by_date(
    State(state): State<AppState>,
    Query(params): Query<DateQuery>,
) -> AppResult<Json<GamesResponse>> {
    let raw = params
        .date
        .ok_or_else(|| AppError::InvalidInput("Missing `date` query parameter".to_string()))?;
    let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        AppError::InvalidInput(format!("Invalid date `{}`, expected YYYY-MM-DD", raw))
    })?;

    let games = state.games.games_on(date).await?;
    tracing::debug!(date = %date, games = games.len(), "Games by date");
    Ok(Json(GamesResponse { games }))
}

/// Recommends games from the last `days` days
pub async fn recommend(
    State(state): State<AppState>,
    Json(request): Json<RecommendationRequest>,
) -> AppResult<Json<RecommendationResponse>> {
    let end = request.end_date.unwrap_or_else(|| Utc::now().date_naive());
    let start = end
        .checked_sub_days(Days::new(u64::from(request.days)))
        .ok_or_else(|| AppError::InvalidInput(format!("`days` too large: {}", request.days)))?;

    let window = state.games.games_in_range(start, end).await?;
    let liked_ids: Vec<String> = request
        .liked_game_ids
        .iter()
        .map(|id| id.normalized())
        .collect();

    tracing::info!(
        start = %start,
        end = %end,
        liked = liked_ids.len(),
        games = request.games,
        "Recommendation requested"
    );

    let recommended_games = state
        .recommender
        .recommend(&window, &liked_ids, request.games, request.aggregation)
        .await?;

    Ok(Json(RecommendationResponse { recommended_games }))
}

/// Feature record of one indexed game, computed on first request
pub async fn game_features(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
) -> AppResult<Json<FeatureRecord>> {
    if state.games.find(&game_id).await?.is_none() {
        return Err(AppError::NotFound(format!("Unknown game {}", game_id)));
    }

    state
        .recommender
        .features_for(&game_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No features for game {}", game_id)))
}
