//! Raw excitement metrics computed from a game's play-by-play.
//!
//! Every function here is a pure function of the event slice and returns an
//! unnormalized value; scaling happens in [`super::FeatureExtractor`].

use std::collections::{BTreeMap, HashMap};

use crate::models::{Leader, PlayEvent};

/// ESPN play type codes for dunks
pub const DUNK_TYPE_IDS: [&str; 8] = ["96", "115", "116", "118", "138", "150", "151", "152"];

/// ESPN play type code for "End Period"
pub const END_PERIOD_TYPE_ID: &str = "412";

/// ESPN play type code for "End Game"
pub const END_GAME_TYPE_ID: &str = "402";

/// Number of leader transitions over the game.
///
/// The leader before the first event is undefined, so the first event always
/// counts as a change.
pub fn count_lead_changes(events: &[PlayEvent]) -> u32 {
    let mut previous: Option<Leader> = None;
    let mut changes = 0;
    for event in events {
        let current = event.leader();
        if previous != Some(current) {
            changes += 1;
        }
        previous = Some(current);
    }
    changes
}

pub fn count_three_point_makes(events: &[PlayEvent]) -> u32 {
    events
        .iter()
        .filter(|e| e.scoring_play && e.score_value == 3)
        .count() as u32
}

pub fn count_dunks(events: &[PlayEvent]) -> u32 {
    events
        .iter()
        .filter(|e| {
            e.type_id
                .as_deref()
                .is_some_and(|id| DUNK_TYPE_IDS.contains(&id))
        })
        .count() as u32
}

pub fn count_blocks(events: &[PlayEvent]) -> u32 {
    events
        .iter()
        .filter(|e| e.text.to_lowercase().contains("blocks"))
        .count() as u32
}

pub fn count_misses(events: &[PlayEvent]) -> u32 {
    events
        .iter()
        .filter(|e| e.shooting_play && !e.scoring_play)
        .count() as u32
}

/// Points per second of clock between made shots, averaged over periods.
///
/// Periods whose made shots span no clock time are left out of the average.
/// A scoring play without a clock reading still adds its points but no time.
pub fn scoring_density(events: &[PlayEvent]) -> f64 {
    let mut by_period: BTreeMap<u32, (Vec<f64>, u32)> = BTreeMap::new();
    for event in events.iter().filter(|e| e.scoring_play) {
        let (clocks, points) = by_period.entry(event.period).or_default();
        *points += event.score_value;
        if let Some(clock) = event.clock_seconds {
            clocks.push(clock);
        }
    }

    let mut densities = Vec::new();
    for (clocks, points) in by_period.values_mut() {
        // clock counts down, so descending clock is chronological
        clocks.sort_by(|a, b| b.total_cmp(a));
        let elapsed: f64 = clocks.windows(2).map(|pair| (pair[0] - pair[1]).abs()).sum();
        if elapsed > 0.0 {
            densities.push(*points as f64 / elapsed);
        }
    }

    if densities.is_empty() {
        0.0
    } else {
        densities.iter().sum::<f64>() / densities.len() as f64
    }
}

/// Mean score differential at the end of each period, `None` when the log has
/// no end-of-period events.
pub fn closeness(events: &[PlayEvent]) -> Option<f64> {
    let differentials: Vec<u32> = events
        .iter()
        .filter(|e| e.is_type(END_PERIOD_TYPE_ID))
        .map(PlayEvent::score_differential)
        .collect();

    if differentials.is_empty() {
        return None;
    }
    let total: u32 = differentials.iter().sum();
    Some(total as f64 / differentials.len() as f64)
}

/// Occurrence counter that remembers first-seen order for tie-breaking
#[derive(Debug, Default)]
pub struct FrequencyCounter {
    index: HashMap<String, usize>,
    counts: Vec<(String, u32)>,
}

impl FrequencyCounter {
    pub fn add(&mut self, key: &str) {
        match self.index.get(key) {
            Some(&slot) => self.counts[slot].1 += 1,
            None => {
                self.index.insert(key.to_string(), self.counts.len());
                self.counts.push((key.to_string(), 1));
            }
        }
    }

    /// The `n` most frequent keys; equal counts keep first-seen order
    pub fn most_common(mut self, n: usize) -> Vec<(String, u32)> {
        self.counts.sort_by(|a, b| b.1.cmp(&a.1));
        self.counts.truncate(n);
        self.counts
    }
}

/// Athletes appearing most often in participant lists across all events
pub fn top_players(events: &[PlayEvent], n: usize) -> Vec<(String, u32)> {
    let mut counter = FrequencyCounter::default();
    for athlete in events.iter().flat_map(|e| e.athletes()) {
        counter.add(athlete);
    }
    counter.most_common(n)
}

/// Athletes of one team that most often are the primary actor of a play
pub fn top_players_for_team(events: &[PlayEvent], team_id: &str, n: usize) -> Vec<(String, u32)> {
    let mut counter = FrequencyCounter::default();
    for event in events
        .iter()
        .filter(|e| e.team_id.as_deref() == Some(team_id))
    {
        if let Some(first) = event.primary_athlete() {
            counter.add(first);
        }
    }
    counter.most_common(n)
}

/// Sum of the mention counts of the given top players
pub fn star_score(top_players: &[(String, u32)]) -> u32 {
    top_players.iter().map(|(_, count)| count).sum()
}

/// The first two distinct team ids in event order
pub fn team_ids(events: &[PlayEvent]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(2);
    for team in events.iter().filter_map(|e| e.team_id.as_deref()) {
        if !seen.iter().any(|t| t == team) {
            seen.push(team.to_string());
            if seen.len() == 2 {
                break;
            }
        }
    }
    seen
}

/// Final `(away, home)` score from the last end-of-game event
pub fn final_score(events: &[PlayEvent]) -> Option<(u32, u32)> {
    events
        .iter()
        .rev()
        .find(|e| e.is_type(END_GAME_TYPE_ID))
        .map(|e| (e.away_score, e.home_score))
}
