use std::sync::Arc;

use anyhow::Context;
use axum::http::HeaderValue;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gameselect::{
    api::{create_router, AppState},
    config::Config,
    db::open_feature_cache,
    services::{
        providers::{EspnClient, EventLogSource, FallbackSource, LocalPlayByPlay},
        GameIndex, Recommender,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::from_env()?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.host,
        port = config.port,
        data_dir = %config.data_dir.display(),
        cache_backend = ?config.cache_backend,
        "Starting gameselect"
    );

    let (cache, cache_writer) = open_feature_cache(&config).await?;

    // local exports first, ESPN for games that were never downloaded
    let sources: Vec<Box<dyn EventLogSource>> = vec![
        Box::new(LocalPlayByPlay::new(&config.data_dir)),
        Box::new(EspnClient::new(config.espn_api_url.as_str())?),
    ];
    let source: Arc<dyn EventLogSource> = Arc::new(FallbackSource::new(sources));

    let recommender = Arc::new(Recommender::new(cache, source));
    let games = Arc::new(GameIndex::new(&config.game_database_path));
    let state = AppState::new(recommender, games);

    let cors_origin = HeaderValue::from_str(&config.cors_origin)
        .with_context(|| format!("Invalid CORS origin `{}`", config.cors_origin))?;
    let app = create_router(state, cors_origin);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(writer) = cache_writer {
        writer.shutdown().await;
    }
    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gameselect=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
