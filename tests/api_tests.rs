use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};

use gameselect::{
    api::{create_router, AppState},
    db::MemoryFeatureCache,
    models::{EventLog, PlayEvent},
    services::{providers::LocalPlayByPlay, GameIndex, Recommender},
};

const ORIGIN: &str = "https://gameselect.onrender.com";

const GAME_DATABASE: &str = "\
game_id,game_date,home_team,away_team,location,date,hour,game_string,away_score,home_score
401,2025-03-01,Boston Celtics,Miami Heat,TD Garden,2025-03-01,00:30 UTC,Miami Heat vs Boston Celtics @ TD Garden,101.0,99.0
402,2025-03-01,Denver Nuggets,LA Lakers,Ball Arena,01/03/2025,02:00 UTC,LA Lakers vs Denver Nuggets @ Ball Arena,110.0,120.0
403,2025-03-02,Utah Jazz,Phoenix Suns,Delta Center,2025-03-02,02:00 UTC,Phoenix Suns vs Utah Jazz @ Delta Center,,
404,2025-03-02,Orlando Magic,Chicago Bulls,Kia Center,2025-03-02,23:00 UTC,Chicago Bulls vs Orlando Magic @ Kia Center,,
";

fn shot(home: u32, away: u32, team: &str, player: &str, value: u32, clock: f64) -> PlayEvent {
    PlayEvent {
        home_score: home,
        away_score: away,
        period: 1,
        clock_seconds: Some(clock),
        scoring_play: true,
        score_value: value,
        shooting_play: true,
        text: format!("{} makes shot", player),
        team_id: Some(team.to_string()),
        participants: vec![Some(player.to_string())],
        ..Default::default()
    }
}

/// Back-and-forth game with threes
fn close_game() -> EventLog {
    EventLog::new(vec![
        shot(2, 0, "1", "tatum", 2, 700.0),
        shot(2, 3, "2", "herro", 3, 680.0),
        shot(4, 3, "1", "brown", 2, 650.0),
        shot(4, 6, "2", "herro", 3, 630.0),
        shot(7, 6, "1", "tatum", 3, 600.0),
    ])
}

/// One team scores everything
fn blowout() -> EventLog {
    EventLog::new(vec![
        shot(2, 0, "7", "jokic", 2, 700.0),
        shot(4, 0, "7", "jokic", 2, 600.0),
        shot(6, 0, "7", "murray", 2, 500.0),
        PlayEvent {
            home_score: 6,
            shooting_play: true,
            text: "James misses jumper".to_string(),
            team_id: Some("13".to_string()),
            participants: vec![Some("james".to_string())],
            clock_seconds: Some(450.0),
            ..Default::default()
        },
    ])
}

struct TestApp {
    _dir: tempfile::TempDir,
    server: TestServer,
}

async fn create_test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let index_path = dir.path().join("game_database.csv");
    std::fs::write(&index_path, GAME_DATABASE).unwrap();

    let local = LocalPlayByPlay::new(dir.path().join("data"));
    local.store("401", &close_game()).await.unwrap();
    local.store("402", &blowout()).await.unwrap();
    local.store("403", &close_game()).await.unwrap();
    // 404 has no play-by-play

    let recommender = Recommender::new(Arc::new(MemoryFeatureCache::new()), Arc::new(local));
    let state = AppState::new(Arc::new(recommender), Arc::new(GameIndex::new(index_path)));
    let app = create_router(state, HeaderValue::from_static(ORIGIN));

    TestApp {
        _dir: dir,
        server: TestServer::new(app).unwrap(),
    }
}

fn game_ids(body: &Value, key: &str) -> Vec<String> {
    body[key]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["game_id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app().await;
    let response = app.server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_request_id_is_returned() {
    let app = create_test_app().await;

    let response = app.server.get("/health").await;
    assert!(!response.header("x-request-id").is_empty());

    let response = app
        .server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("trace-me-1"),
        )
        .await;
    assert_eq!(response.header("x-request-id"), "trace-me-1");
}

#[tokio::test]
async fn test_games_by_date() {
    let app = create_test_app().await;

    let response = app
        .server
        .get("/api/games_by_date")
        .add_query_param("date", "2025-03-01")
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(game_ids(&body, "games"), vec!["401", "402"]);
    assert_eq!(body["games"][0]["home_team"], "Boston Celtics");
    assert_eq!(body["games"][0]["away_score"], 101);
}

#[tokio::test]
async fn test_games_by_date_requires_valid_date() {
    let app = create_test_app().await;

    let response = app.server.get("/api/games_by_date").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("date"));

    let response = app
        .server
        .get("/api/games_by_date")
        .add_query_param("date", "March 1st")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cold_start_recommendations() {
    let app = create_test_app().await;

    let response = app
        .server
        .post("/api/recommender")
        .json(&json!({
            "liked_game_ids": [],
            "days": 1,
            "games": 2,
            "end_date": "2025-03-02"
        }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    let ids = game_ids(&body, "recommended_games");
    assert_eq!(ids.len(), 2);
    assert!(!ids.contains(&"404".to_string()));
    // the back-and-forth games outrank the blowout
    assert!(!ids.contains(&"402".to_string()));

    let first = &body["recommended_games"][0];
    assert!(first["score"].as_f64().unwrap() > 0.0);
    assert!(first["game_string"].as_str().unwrap().contains(" vs "));
}

#[tokio::test]
async fn test_liked_games_are_not_recommended() {
    let app = create_test_app().await;

    let response = app
        .server
        .post("/api/recommender")
        .json(&json!({
            "liked_game_ids": [401],
            "days": 1,
            "games": 5,
            "aggregation": "max",
            "end_date": "2025-03-02"
        }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    let ids = game_ids(&body, "recommended_games");
    assert_eq!(ids, vec!["403", "402"]);
}

#[tokio::test]
async fn test_recommendations_outside_window_are_empty() {
    let app = create_test_app().await;

    let response = app
        .server
        .post("/api/recommender")
        .json(&json!({"days": 3, "games": 5, "end_date": "2024-01-01"}))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert!(body["recommended_games"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_game_features() {
    let app = create_test_app().await;

    let response = app.server.get("/api/games/402/features").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["game_id"], "402");
    assert_eq!(body["teams"], json!(["7", "13"]));

    let response = app.server.get("/api/games/404/features").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_features_of_unindexed_game_are_not_found() {
    let app = create_test_app().await;

    let response = app.server.get("/api/games/999999/features").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("999999"));
}

#[tokio::test]
async fn test_cors_allows_configured_origin() {
    let app = create_test_app().await;

    let response = app
        .server
        .get("/api/games_by_date")
        .add_query_param("date", "2025-03-02")
        .add_header(
            HeaderName::from_static("origin"),
            HeaderValue::from_static(ORIGIN),
        )
        .await;
    response.assert_status_ok();
    assert_eq!(response.header("access-control-allow-origin"), ORIGIN);
}
