use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::request_id::{make_span_with_request_id, request_id_middleware};

use super::handlers;
use super::AppState;

/// Creates the application router with all routes
pub fn create_router(state: AppState, cors_origin: HeaderValue) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api", api_routes(cors_origin))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id)),
        )
}

/// API routes under /api, callable from the configured browser origin
fn api_routes(cors_origin: HeaderValue) -> Router<AppState> {
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/games_by_date", get(handlers::games_by_date))
        .route("/recommender", post(handlers::recommend))
        .route("/games/:game_id/features", get(handlers::game_features))
        .layer(cors)
}
