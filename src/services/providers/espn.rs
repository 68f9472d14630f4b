//! ESPN site API client
//!
//! Provides game ids per date (scoreboard), display metadata and play-by-play
//! (summary) for NBA games.
//!
//! API Flow:
//! 1. Game ids: /scoreboard?dates=YYYYMMDD → events[].id
//! 2. Game details: /summary?event={game_id} → header (teams, venue, date) and plays

use crate::{
    error::{AppError, AppResult},
    models::{EventLog, GameInfo, PlayEvent},
    services::{
        features::play_by_play::clock_to_seconds,
        providers::{EventLogSource, GameSchedule},
    },
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Deserialize)]
struct Scoreboard {
    #[serde(default)]
    events: Vec<ScoreboardEvent>,
}

#[derive(Debug, Deserialize)]
struct ScoreboardEvent {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Summary {
    #[serde(default)]
    plays: Vec<EspnPlay>,
    header: Option<Header>,
    game_info: Option<SummaryGameInfo>,
}

#[derive(Debug, Deserialize)]
struct Header {
    #[serde(default)]
    competitions: Vec<Competition>,
}

#[derive(Debug, Deserialize)]
struct Competition {
    #[serde(default)]
    date: String,
    #[serde(default)]
    competitors: Vec<Competitor>,
    venue: Option<Venue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Competitor {
    home_away: String,
    team: CompetitorTeam,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompetitorTeam {
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct SummaryGameInfo {
    venue: Option<Venue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Venue {
    full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EspnPlay {
    #[serde(rename = "type")]
    play_type: Option<EspnRef>,
    #[serde(default)]
    text: String,
    #[serde(default)]
    away_score: u32,
    #[serde(default)]
    home_score: u32,
    period: Option<EspnPeriod>,
    clock: Option<EspnClock>,
    #[serde(default)]
    scoring_play: bool,
    #[serde(default)]
    score_value: u32,
    #[serde(default)]
    shooting_play: bool,
    team: Option<EspnRef>,
    #[serde(default)]
    participants: Vec<EspnParticipant>,
}

#[derive(Debug, Deserialize)]
struct EspnRef {
    id: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EspnPeriod {
    number: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EspnClock {
    display_value: String,
}

#[derive(Debug, Deserialize)]
struct EspnParticipant {
    athlete: Option<EspnRef>,
}

impl From<EspnPlay> for PlayEvent {
    fn from(play: EspnPlay) -> Self {
        let (type_id, type_text) = match play.play_type {
            Some(t) => (Some(t.id), t.text),
            None => (None, None),
        };

        PlayEvent {
            home_score: play.home_score,
            away_score: play.away_score,
            period: play.period.map(|p| p.number).unwrap_or(1),
            clock_seconds: play
                .clock
                .and_then(|c| clock_to_seconds(&c.display_value)),
            scoring_play: play.scoring_play,
            score_value: play.score_value,
            shooting_play: play.shooting_play,
            text: play.text,
            team_id: play.team.map(|t| t.id),
            participants: play
                .participants
                .into_iter()
                .map(|p| p.athlete.map(|a| a.id))
                .collect(),
            type_id,
            type_text,
        }
    }
}

/// Parses ESPN timestamps such as `2025-03-01T00:30Z`
fn parse_espn_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%MZ")
        .ok()
        .map(|naive| naive.and_utc())
}

fn game_info_from_summary(game_id: &str, summary: &Summary) -> AppResult<GameInfo> {
    let competition = summary
        .header
        .as_ref()
        .and_then(|h| h.competitions.first())
        .ok_or_else(|| AppError::ExternalApi(format!("No competition data for game {}", game_id)))?;

    let team_named = |side: &str| {
        competition
            .competitors
            .iter()
            .find(|c| c.home_away == side)
            .map(|c| c.team.display_name.clone())
            .ok_or_else(|| AppError::ExternalApi(format!("No {} team for game {}", side, game_id)))
    };
    let home_team = team_named("home")?;
    let away_team = team_named("away")?;

    let location = summary
        .game_info
        .as_ref()
        .and_then(|g| g.venue.as_ref())
        .or(competition.venue.as_ref())
        .and_then(|v| v.full_name.clone())
        .unwrap_or_else(|| "Unknown Venue".to_string());

    let start = parse_espn_date(&competition.date).ok_or_else(|| {
        AppError::ExternalApi(format!(
            "Unreadable start time `{}` for game {}",
            competition.date, game_id
        ))
    })?;
    let date = start.format("%Y-%m-%d").to_string();
    let hour = start.format("%H:%M UTC").to_string();

    let mut info = GameInfo {
        game_id: game_id.to_string(),
        game_date: date.clone(),
        home_team,
        away_team,
        location,
        date,
        hour,
        game_string: String::new(),
        away_score: None,
        home_score: None,
    };
    info.game_string = info.display_string();
    Ok(info)
}

/// Client for ESPN's public NBA site API
#[derive(Clone)]
pub struct EspnClient {
    http_client: HttpClient,
    api_url: String,
}

impl EspnClient {
    pub fn new(api_url: impl Into<String>) -> AppResult<Self> {
        let http_client = HttpClient::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent("Mozilla/5.0")
            .build()?;

        Ok(Self {
            http_client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// GET returning `None` when ESPN does not know the resource.
    ///
    /// ESPN answers 404 for unknown event ids and 400 for malformed ones.
    async fn try_get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> AppResult<Option<T>> {
        let url = format!("{}/{}", self.api_url, path);
        let response = self.http_client.get(&url).query(query).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND || status == StatusCode::BAD_REQUEST {
            tracing::debug!(url = %url, status = %status, "ESPN resource not found");
            return Ok(None);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "ESPN API returned status {}: {}",
                status, body
            )));
        }

        Ok(Some(response.json().await?))
    }

    async fn fetch_summary(&self, game_id: &str) -> AppResult<Option<Summary>> {
        self.try_get_json("summary", &[("event", game_id)]).await
    }

    /// Game ids scheduled on one date
    pub async fn game_ids_for_date(&self, date: NaiveDate) -> AppResult<Vec<String>> {
        let dates = date.format("%Y%m%d").to_string();
        let ids: Vec<String> = self
            .try_get_json::<Scoreboard>("scoreboard", &[("dates", &dates)])
            .await?
            .map(|scoreboard| scoreboard.events.into_iter().map(|e| e.id).collect())
            .unwrap_or_default();

        tracing::info!(date = %date, games = ids.len(), "Fetched scoreboard");
        Ok(ids)
    }

    /// Game ids for every date from `start` to `end` inclusive.
    ///
    /// A date whose scoreboard cannot be fetched is logged and skipped.
    pub async fn game_ids_for_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<String> {
        let mut ids = Vec::new();
        for date in start.iter_days().take_while(|d| *d <= end) {
            match self.game_ids_for_date(date).await {
                Ok(day_ids) => ids.extend(day_ids),
                Err(e) => tracing::warn!(date = %date, error = %e, "Failed to fetch scoreboard"),
            }
        }
        ids
    }

    /// Teams, venue and start time of a game
    pub async fn game_info(&self, game_id: &str) -> AppResult<GameInfo> {
        let summary = self
            .fetch_summary(game_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("ESPN has no game {}", game_id)))?;
        game_info_from_summary(game_id, &summary)
    }
}

#[async_trait::async_trait]
impl EventLogSource for EspnClient {
    async fn fetch(&self, game_id: &str) -> AppResult<Option<EventLog>> {
        let Some(summary) = self.fetch_summary(game_id).await? else {
            tracing::info!(game_id = %game_id, "ESPN does not know this game");
            return Ok(None);
        };

        if summary.plays.is_empty() {
            tracing::info!(game_id = %game_id, "No play-by-play data, game may have been canceled");
            return Ok(None);
        }

        let events: Vec<PlayEvent> = summary.plays.into_iter().map(PlayEvent::from).collect();
        tracing::info!(game_id = %game_id, events = events.len(), "Fetched play-by-play from ESPN");
        Ok(Some(EventLog::new(events)))
    }

    fn name(&self) -> &'static str {
        "espn"
    }
}

#[async_trait::async_trait]
impl GameSchedule for EspnClient {
    async fn game_ids(&self, start: NaiveDate, end: NaiveDate) -> AppResult<Vec<String>> {
        Ok(self.game_ids_for_range(start, end).await)
    }

    async fn game_info(&self, game_id: &str) -> AppResult<GameInfo> {
        EspnClient::game_info(self, game_id).await
    }
}
