pub mod features;
pub mod game_index;
pub mod providers;
pub mod recommendations;
pub mod similarity;
pub mod updater;

pub use game_index::GameIndex;
pub use recommendations::Recommender;
pub use updater::{UpdateReport, Updater};
