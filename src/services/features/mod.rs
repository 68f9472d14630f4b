//! Game excitement feature extraction
//!
//! Turns one game's play-by-play into a [`FeatureRecord`]: raw counts and
//! rates from [`metrics`], scaled by the fixed maxima in [`Calibration`].

use crate::models::{EventLog, FeatureRecord};

pub mod literal;
pub mod metrics;
pub mod play_by_play;

pub use play_by_play::{read_event_log, write_event_log};

/// Players kept per top-player list
pub const TOP_PLAYER_COUNT: usize = 5;

/// Errors raised while turning play-by-play into features
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExtractError {
    #[error("missing required column `{0}`")]
    MissingColumn(&'static str),

    #[error("unreadable play-by-play data: {0}")]
    Unreadable(String),

    #[error("expected 2 teams in play-by-play, found {found}")]
    MissingTeams { found: usize },

    #[error("no end-of-game event in play-by-play")]
    ScoresNotFound,
}

/// Normalization maxima for the raw metrics.
///
/// These are fixed calibration values, not derived from data. Changing them
/// invalidates every cached feature record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub lead_changes_max: f64,
    pub three_pt_max: f64,
    pub dunks_max: f64,
    pub blocks_max: f64,
    pub misses_max: f64,
    /// Mean end-of-period differential treated as the least close game
    pub closeness_max: f64,
    pub star_score_max: f64,
    /// Points per second, already on a 0..1 scale
    pub density_max: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            lead_changes_max: 35.0,
            three_pt_max: 50.0,
            dunks_max: 30.0,
            blocks_max: 30.0,
            misses_max: 170.0,
            closeness_max: 40.0,
            star_score_max: 150.0,
            density_max: 1.0,
        }
    }
}

/// Scales `value` from `[min, max]` onto `[0, 1]` without clamping
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if max > min {
        (value - min) / (max - min)
    } else {
        0.0
    }
}

/// Builds feature records from event logs
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    calibration: Calibration,
}

impl FeatureExtractor {
    pub fn new(calibration: Calibration) -> Self {
        Self { calibration }
    }

    /// Extracts the normalized excitement profile of one game.
    ///
    /// Fails only when the log does not name two teams. A game with no
    /// end-of-period events gets the worst closeness score (`1.0`).
    pub fn extract(&self, game_id: &str, log: &EventLog) -> Result<FeatureRecord, ExtractError> {
        let events = log.events.as_slice();
        let cal = &self.calibration;

        let teams = metrics::team_ids(events);
        if teams.len() < 2 {
            return Err(ExtractError::MissingTeams { found: teams.len() });
        }

        let top_players = metrics::top_players(events, TOP_PLAYER_COUNT);
        let star_score = metrics::star_score(&top_players);
        let top_players1 = metrics::top_players_for_team(events, &teams[0], TOP_PLAYER_COUNT);
        let top_players2 = metrics::top_players_for_team(events, &teams[1], TOP_PLAYER_COUNT);

        let close_score = match metrics::closeness(events) {
            Some(differential) => normalize(differential, 0.0, cal.closeness_max),
            None => 1.0,
        };

        let record = FeatureRecord {
            game_id: game_id.to_string(),
            lead_changes: normalize(
                metrics::count_lead_changes(events) as f64,
                0.0,
                cal.lead_changes_max,
            ),
            three_pt_count: normalize(
                metrics::count_three_point_makes(events) as f64,
                0.0,
                cal.three_pt_max,
            ),
            dunk_count: normalize(metrics::count_dunks(events) as f64, 0.0, cal.dunks_max),
            block_count: normalize(metrics::count_blocks(events) as f64, 0.0, cal.blocks_max),
            misses_count: normalize(metrics::count_misses(events) as f64, 0.0, cal.misses_max),
            density_score: normalize(metrics::scoring_density(events), 0.0, cal.density_max),
            close_score,
            star_score: normalize(star_score as f64, 0.0, cal.star_score_max),
            top_players: ids(top_players),
            teams,
            top_players1: ids(top_players1),
            top_players2: ids(top_players2),
        };

        tracing::debug!(
            game_id = %game_id,
            events = events.len(),
            skipped_rows = log.skipped_rows,
            "Extracted game features"
        );

        Ok(record)
    }

    /// Final `(away, home)` score of a finished game
    pub fn final_score(&self, log: &EventLog) -> Result<(u32, u32), ExtractError> {
        metrics::final_score(&log.events).ok_or(ExtractError::ScoresNotFound)
    }
}

fn ids(counted: Vec<(String, u32)>) -> Vec<String> {
    counted.into_iter().map(|(id, _)| id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PlayEvent;

    fn event(home: u32, away: u32, team: &str, participants: &[&str]) -> PlayEvent {
        PlayEvent {
            home_score: home,
            away_score: away,
            team_id: Some(team.to_string()),
            participants: participants.iter().map(|p| Some(p.to_string())).collect(),
            ..Default::default()
        }
    }

    fn sample_log() -> EventLog {
        let mut three = event(0, 3, "2", &["20", "21"]);
        three.scoring_play = true;
        three.shooting_play = true;
        three.score_value = 3;
        three.clock_seconds = Some(700.0);

        let mut dunk = event(2, 3, "1", &["10"]);
        dunk.scoring_play = true;
        dunk.shooting_play = true;
        dunk.score_value = 2;
        dunk.clock_seconds = Some(680.0);
        dunk.type_id = Some("118".to_string());

        let mut miss = event(2, 3, "1", &["11", "20"]);
        miss.shooting_play = true;
        miss.text = "20 blocks 11's layup".to_string();

        let mut end = event(2, 3, "1", &[]);
        end.team_id = None;
        end.type_id = Some(metrics::END_PERIOD_TYPE_ID.to_string());

        EventLog::new(vec![event(0, 0, "1", &["10"]), three, dunk, miss, end])
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(7.0, 0.0, 35.0), 0.2);
        assert_eq!(normalize(70.0, 0.0, 35.0), 2.0);
        assert_eq!(normalize(5.0, 1.0, 1.0), 0.0);
    }

    #[test]
    fn test_extract_sample_game() {
        let record = FeatureExtractor::default()
            .extract("401585306", &sample_log())
            .unwrap();

        assert_eq!(record.game_id, "401585306");
        // home (tie), away, away, away, away
        assert_eq!(record.lead_changes, 2.0 / 35.0);
        assert_eq!(record.three_pt_count, 1.0 / 50.0);
        assert_eq!(record.dunk_count, 1.0 / 30.0);
        assert_eq!(record.block_count, 1.0 / 30.0);
        assert_eq!(record.misses_count, 1.0 / 170.0);
        assert_eq!(record.density_score, 5.0 / 20.0);
        assert_eq!(record.close_score, 1.0 / 40.0);
        assert_eq!(record.teams, vec!["1".to_string(), "2".to_string()]);
        assert_eq!(record.top_players, vec!["10", "20", "21", "11"]);
        assert_eq!(record.star_score, 6.0 / 150.0);
        assert_eq!(record.top_players1, vec!["10", "11"]);
        assert_eq!(record.top_players2, vec!["20"]);
    }

    #[test]
    fn test_extract_is_deterministic() {
        let extractor = FeatureExtractor::default();
        let log = sample_log();
        let first = extractor.extract("1", &log).unwrap();
        let second = extractor.extract("1", &log).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first.numeric_vector().map(f64::to_bits),
            second.numeric_vector().map(f64::to_bits)
        );
    }

    #[test]
    fn test_no_end_of_period_is_worst_closeness() {
        let log = EventLog::new(vec![event(0, 0, "1", &[]), event(2, 0, "2", &[])]);
        let record = FeatureExtractor::default().extract("1", &log).unwrap();
        assert_eq!(record.close_score, 1.0);
        assert!(record.close_score.is_finite());
    }

    #[test]
    fn test_single_team_is_rejected() {
        let log = EventLog::new(vec![event(0, 0, "1", &["10"])]);
        let err = FeatureExtractor::default().extract("1", &log).unwrap_err();
        assert_eq!(err, ExtractError::MissingTeams { found: 1 });
    }

    #[test]
    fn test_custom_calibration() {
        let calibration = Calibration {
            lead_changes_max: 2.0,
            ..Calibration::default()
        };
        let record = FeatureExtractor::new(calibration)
            .extract("1", &sample_log())
            .unwrap();
        assert_eq!(record.lead_changes, 1.0);
    }

    #[test]
    fn test_final_score_missing_is_typed() {
        let extractor = FeatureExtractor::default();
        assert_eq!(
            extractor.final_score(&sample_log()),
            Err(ExtractError::ScoresNotFound)
        );
    }
}
