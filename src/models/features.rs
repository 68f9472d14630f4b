use serde::{Deserialize, Serialize};

/// Number of numeric features compared with cosine similarity
pub const NUMERIC_FEATURE_COUNT: usize = 8;

/// Normalized excitement profile of one game
///
/// Numeric fields are scaled by fixed calibration maxima and are usually in
/// `[0, 1]`, but are not clamped. `close_score` is lower for closer games.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureRecord {
    pub game_id: String,
    pub lead_changes: f64,
    pub three_pt_count: f64,
    pub dunk_count: f64,
    pub block_count: f64,
    pub misses_count: f64,
    pub density_score: f64,
    pub close_score: f64,
    pub star_score: f64,
    /// Most involved athletes across the whole game, most frequent first
    pub top_players: Vec<String>,
    /// The two team ids in the order they first appear
    pub teams: Vec<String>,
    pub top_players1: Vec<String>,
    pub top_players2: Vec<String>,
}

impl FeatureRecord {
    /// Numeric features in a fixed order, identifiers and lists excluded
    pub fn numeric_vector(&self) -> [f64; NUMERIC_FEATURE_COUNT] {
        [
            self.lead_changes,
            self.three_pt_count,
            self.dunk_count,
            self.block_count,
            self.misses_count,
            self.density_score,
            self.close_score,
            self.star_score,
        ]
    }

    /// Builds a record with the given numeric vector and no list data
    pub fn from_numeric(
        game_id: impl Into<String>,
        values: [f64; NUMERIC_FEATURE_COUNT],
    ) -> Self {
        let [
            lead_changes,
            three_pt_count,
            dunk_count,
            block_count,
            misses_count,
            density_score,
            close_score,
            star_score,
        ] = values;
        Self {
            game_id: game_id.into(),
            lead_changes,
            three_pt_count,
            dunk_count,
            block_count,
            misses_count,
            density_score,
            close_score,
            star_score,
            top_players: Vec::new(),
            teams: Vec::new(),
            top_players1: Vec::new(),
            top_players2: Vec::new(),
        }
    }
}
