//! Ingests newly played games: play-by-play exports, index rows and cached
//! features.

use std::sync::Arc;

use anyhow::Context;
use chrono::{Days, NaiveDate, Utc};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gameselect::{
    config::Config,
    db::open_feature_cache,
    services::{
        providers::{EspnClient, LocalPlayByPlay},
        GameIndex, Updater,
    },
};

#[derive(Parser, Debug)]
#[command(name = "update-games", about = "Fetch finished NBA games from ESPN")]
struct Args {
    /// First day to fetch, YYYYMMDD (default: yesterday)
    #[arg(long, value_parser = parse_day)]
    start: Option<NaiveDate>,

    /// Last day to fetch, YYYYMMDD (default: the start day)
    #[arg(long, value_parser = parse_day)]
    end: Option<NaiveDate>,
}

fn parse_day(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y%m%d").map_err(|e| format!("expected YYYYMMDD: {}", e))
}

/// Resolves the date range, defaulting to yesterday
fn date_range(args: &Args, today: NaiveDate) -> anyhow::Result<(NaiveDate, NaiveDate)> {
    let yesterday = today
        .checked_sub_days(Days::new(1))
        .context("No day before today")?;
    let start = args.start.unwrap_or(yesterday);
    let end = args.end.unwrap_or(start);
    anyhow::ensure!(start <= end, "--start {} is after --end {}", start, end);
    Ok((start, end))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gameselect=info,update_games=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let (start, end) = date_range(&args, Utc::now().date_naive())?;
    let config = Config::from_env()?;

    let (cache, cache_writer) = open_feature_cache(&config).await?;
    let espn = Arc::new(EspnClient::new(config.espn_api_url.as_str())?);

    let updater = Updater::new(
        espn.clone(),
        espn,
        LocalPlayByPlay::new(&config.data_dir),
        Arc::new(GameIndex::new(&config.game_database_path)),
        cache,
    );
    let report = updater.run(start, end).await?;

    if let Some(writer) = cache_writer {
        writer.shutdown().await;
    }

    tracing::info!(
        start = %start,
        end = %end,
        added = report.added,
        failed = report.failed,
        "Update complete"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_defaults_to_yesterday() {
        let args = Args::parse_from(["update-games"]);
        let range = date_range(&args, day(2025, 3, 1)).unwrap();
        assert_eq!(range, (day(2025, 2, 28), day(2025, 2, 28)));
    }

    #[test]
    fn test_explicit_range() {
        let args = Args::parse_from(["update-games", "--start", "20250410", "--end", "20250413"]);
        let range = date_range(&args, day(2025, 5, 1)).unwrap();
        assert_eq!(range, (day(2025, 4, 10), day(2025, 4, 13)));
    }

    #[test]
    fn test_rejects_inverted_range() {
        let args = Args::parse_from(["update-games", "--start", "20250413", "--end", "20250410"]);
        assert!(date_range(&args, day(2025, 5, 1)).is_err());
    }

    #[test]
    fn test_rejects_bad_day() {
        assert!(Args::try_parse_from(["update-games", "--start", "2025-04-10"]).is_err());
    }
}
