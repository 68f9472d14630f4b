use std::sync::Arc;

use crate::services::{GameIndex, Recommender};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<Recommender>,
    pub games: Arc<GameIndex>,
}

impl AppState {
    pub fn new(recommender: Arc<Recommender>, games: Arc<GameIndex>) -> Self {
        Self { recommender, games }
    }
}
