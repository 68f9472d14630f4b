use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Display;

/// Game id as sent by clients, either `"401585306"` or `401585306`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(untagged)]
pub enum GameId {
    Text(String),
    Number(u64),
}

impl GameId {
    /// String form used as the cache key
    pub fn normalized(&self) -> String {
        match self {
            GameId::Text(id) => id.trim().to_string(),
            GameId::Number(id) => id.to_string(),
        }
    }
}

impl Display for GameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.normalized())
    }
}

/// One row of the game index, used for display
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameInfo {
    pub game_id: String,
    #[serde(default)]
    pub game_date: String,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub location: String,
    pub date: String,
    #[serde(default)]
    pub hour: String,
    #[serde(default)]
    pub game_string: String,
    #[serde(default, deserialize_with = "deserialize_score")]
    pub away_score: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_score")]
    pub home_score: Option<u32>,
}

impl GameInfo {
    /// "Away vs Home @ Venue, date hour"
    pub fn display_string(&self) -> String {
        format!(
            "{} vs {} @ {}, {} {}",
            self.away_team, self.home_team, self.location, self.date, self.hour
        )
    }
}

/// Scores are written as `112`, `112.0` or left empty when unknown
fn deserialize_score<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawScore {
        Number(f64),
        Text(String),
    }

    let raw: Option<RawScore> = Option::deserialize(deserializer)?;
    let score = match raw {
        Some(RawScore::Number(value)) => Some(value),
        Some(RawScore::Text(text)) => text.trim().parse::<f64>().ok(),
        None => None,
    };
    Ok(score
        .filter(|value| value.is_finite() && *value >= 0.0)
        .map(|value| value as u32))
}
