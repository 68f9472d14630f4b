use serde::{Deserialize, Serialize};

/// Which side is ahead after an event. A tied score counts as home.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leader {
    Home,
    Away,
}

/// A single play-by-play event for one game
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayEvent {
    pub home_score: u32,
    pub away_score: u32,
    /// Quarter number, overtimes continue counting from 5
    pub period: u32,
    /// Seconds remaining on the game clock, counting down within the period
    pub clock_seconds: Option<f64>,
    pub scoring_play: bool,
    /// Points on the play (1 for a free throw, 2 or 3 for field goals)
    pub score_value: u32,
    pub shooting_play: bool,
    pub text: String,
    pub team_id: Option<String>,
    /// One slot per listed participant in ESPN order, the primary actor
    /// first. `None` when the entry names no athlete.
    pub participants: Vec<Option<String>>,
    pub type_id: Option<String>,
    pub type_text: Option<String>,
}

impl PlayEvent {
    pub fn leader(&self) -> Leader {
        if self.away_score > self.home_score {
            Leader::Away
        } else {
            Leader::Home
        }
    }

    pub fn score_differential(&self) -> u32 {
        self.home_score.abs_diff(self.away_score)
    }

    pub fn is_type(&self, code: &str) -> bool {
        self.type_id.as_deref() == Some(code)
    }

    /// Athlete ids of all participants that name one
    pub fn athletes(&self) -> impl Iterator<Item = &str> {
        self.participants.iter().filter_map(|p| p.as_deref())
    }

    /// Athlete credited with the play, if the first participant names one
    pub fn primary_athlete(&self) -> Option<&str> {
        self.participants.first().and_then(|p| p.as_deref())
    }
}

impl Default for PlayEvent {
    fn default() -> Self {
        Self {
            home_score: 0,
            away_score: 0,
            period: 1,
            clock_seconds: None,
            scoring_play: false,
            score_value: 0,
            shooting_play: false,
            text: String::new(),
            team_id: None,
            participants: Vec::new(),
            type_id: None,
            type_text: None,
        }
    }
}

/// Ordered play-by-play events for one game
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventLog {
    pub events: Vec<PlayEvent>,
    /// Rows dropped while parsing because a field could not be read
    pub skipped_rows: usize,
}

impl EventLog {
    pub fn new(events: Vec<PlayEvent>) -> Self {
        Self {
            events,
            skipped_rows: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tie_counts_as_home_lead() {
        let event = PlayEvent {
            home_score: 50,
            away_score: 50,
            ..Default::default()
        };
        assert_eq!(event.leader(), Leader::Home);
    }

    #[test]
    fn test_away_lead_requires_strictly_more_points() {
        let event = PlayEvent {
            home_score: 50,
            away_score: 51,
            ..Default::default()
        };
        assert_eq!(event.leader(), Leader::Away);
        assert_eq!(event.score_differential(), 1);
    }

    #[test]
    fn test_primary_athlete_is_first_slot_only() {
        let event = PlayEvent {
            participants: vec![None, Some("4065648".to_string())],
            ..Default::default()
        };
        assert_eq!(event.primary_athlete(), None);
        assert_eq!(event.athletes().collect::<Vec<_>>(), vec!["4065648"]);
    }
}
