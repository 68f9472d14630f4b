//! Game similarity and ranking
//!
//! Candidates are ranked either by how much they resemble the games a user
//! liked (hybrid of numeric cosine similarity and categorical overlap), or,
//! when nothing is liked yet, by an intrinsic excitement heuristic.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Deserialize;

use crate::models::FeatureRecord;

/// Total number of features, each categorical feature gets `1 / TOTAL_FEATURE_COUNT`
pub const TOTAL_FEATURE_COUNT: usize = 12;

/// Categorical overlap terms in the hybrid similarity
pub const NON_NUMERIC_FEATURE_COUNT: usize = 4;

/// How a candidate's per-liked-game similarities collapse into one score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Mean over all liked games
    #[default]
    Mean,
    /// Best match among the liked games
    Max,
    /// Mean of the `k` best matches
    TopK(usize),
}

impl Aggregation {
    fn aggregate(self, mut similarities: Vec<f64>) -> f64 {
        if similarities.is_empty() {
            return 0.0;
        }
        match self {
            Aggregation::Mean => similarities.iter().sum::<f64>() / similarities.len() as f64,
            Aggregation::Max => similarities
                .into_iter()
                .fold(f64::NEG_INFINITY, f64::max),
            Aggregation::TopK(k) => {
                similarities.sort_by(|a, b| b.total_cmp(a));
                let k = k.clamp(1, similarities.len());
                similarities[..k].iter().sum::<f64>() / k as f64
            }
        }
    }
}

/// Weights of the hybrid similarity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    /// Weight of each categorical overlap term
    pub per_feature: f64,
    /// Weight of the numeric cosine term
    pub numeric: f64,
}

impl Default for Weights {
    fn default() -> Self {
        let per_feature = 1.0 / TOTAL_FEATURE_COUNT as f64;
        Self {
            per_feature,
            numeric: 1.0 - NON_NUMERIC_FEATURE_COUNT as f64 * per_feature,
        }
    }
}

/// Cosine of the angle between two vectors, 0 when either has no length
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a > 0.0 && norm_b > 0.0 {
        dot / (norm_a * norm_b)
    } else {
        0.0
    }
}

/// Occurrence counts of ids across the liked set, with the total slot count
#[derive(Debug, Default)]
struct IdPool {
    counts: HashMap<String, u32>,
    total: u32,
}

impl IdPool {
    fn from_lists<'a>(lists: impl Iterator<Item = &'a Vec<String>>) -> Self {
        let mut pool = Self::default();
        for id in lists.flatten() {
            *pool.counts.entry(id.clone()).or_default() += 1;
            pool.total += 1;
        }
        pool
    }

    /// Share of the pool's slots taken by the candidate's ids, 0 for an empty pool
    fn weighted_overlap(&self, candidate: &[String]) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let score: u32 = candidate
            .iter()
            .map(|id| self.counts.get(id).copied().unwrap_or(0))
            .sum();
        score as f64 / self.total as f64
    }
}

/// Aggregate categorical profile of a liked set
#[derive(Debug)]
pub struct LikedProfile {
    players: IdPool,
    teams: IdPool,
    team_players: IdPool,
}

impl LikedProfile {
    pub fn new(liked: &[FeatureRecord]) -> Self {
        Self {
            players: IdPool::from_lists(liked.iter().map(|g| &g.top_players)),
            teams: IdPool::from_lists(liked.iter().map(|g| &g.teams)),
            team_players: IdPool::from_lists(
                liked
                    .iter()
                    .flat_map(|g| [&g.top_players1, &g.top_players2]),
            ),
        }
    }

    /// Overlap of one candidate with the whole liked set
    pub fn overlap(&self, candidate: &FeatureRecord) -> CategoricalOverlap {
        CategoricalOverlap {
            players: self.players.weighted_overlap(&candidate.top_players),
            teams: self.teams.weighted_overlap(&candidate.teams),
            team1: self.team_players.weighted_overlap(&candidate.top_players1),
            team2: self.team_players.weighted_overlap(&candidate.top_players2),
        }
    }
}

/// Frequency-weighted overlap of a candidate's list fields with a liked set
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CategoricalOverlap {
    pub players: f64,
    pub teams: f64,
    pub team1: f64,
    pub team2: f64,
}

impl CategoricalOverlap {
    fn sum(&self) -> f64 {
        self.players + self.teams + self.team1 + self.team2
    }
}

/// A ranked candidate and the score it was ranked by
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scored<'a> {
    pub record: &'a FeatureRecord,
    pub score: f64,
}

/// Heuristic used to rank games when the user has not liked anything.
///
/// Lower `close_score` means a closer game, so it enters inverted.
pub fn excitement_score(game: &FeatureRecord) -> f64 {
    game.lead_changes
        + game.three_pt_count
        + game.dunk_count
        + game.block_count
        + game.star_score
        + (1.0 - game.close_score)
        + game.density_score
}

/// Ranks candidate games against a liked set
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    weights: Weights,
    aggregation: Aggregation,
}

impl ScoringEngine {
    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    /// Hybrid similarity of a candidate and one liked game.
    ///
    /// `overlap` is the candidate's overlap with the whole liked set and is the
    /// same for every liked game.
    pub fn pairwise_similarity(
        &self,
        candidate: &FeatureRecord,
        liked: &FeatureRecord,
        overlap: &CategoricalOverlap,
    ) -> f64 {
        let cosine = cosine_similarity(&candidate.numeric_vector(), &liked.numeric_vector());
        self.weights.numeric * cosine + self.weights.per_feature * overlap.sum()
    }

    /// Scores every candidate, highest first; ties keep input order
    pub fn score<'a>(
        &self,
        candidates: &'a [FeatureRecord],
        liked: &[FeatureRecord],
    ) -> Vec<Scored<'a>> {
        let mut scored: Vec<Scored<'a>> = if liked.is_empty() {
            candidates
                .iter()
                .map(|record| Scored {
                    record,
                    score: excitement_score(record),
                })
                .collect()
        } else {
            let profile = LikedProfile::new(liked);
            candidates
                .iter()
                .map(|record| {
                    let overlap = profile.overlap(record);
                    let similarities = liked
                        .iter()
                        .map(|l| self.pairwise_similarity(record, l, &overlap))
                        .collect();
                    Scored {
                        record,
                        score: self.aggregation.aggregate(similarities),
                    }
                })
                .collect()
        };

        // stable: equal scores keep candidate order
        scored.sort_by(|a, b| descending(a.score, b.score));
        scored
    }

    /// The `count` best candidates with their scores
    pub fn rank_scored<'a>(
        &self,
        candidates: &'a [FeatureRecord],
        liked: &[FeatureRecord],
        count: usize,
    ) -> Vec<Scored<'a>> {
        let mut scored = self.score(candidates, liked);
        scored.truncate(count);
        scored
    }

    /// The `count` best candidates, best first
    pub fn rank(
        &self,
        candidates: &[FeatureRecord],
        liked: &[FeatureRecord],
        count: usize,
    ) -> Vec<FeatureRecord> {
        self.rank_scored(candidates, liked, count)
            .into_iter()
            .map(|s| s.record.clone())
            .collect()
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}
