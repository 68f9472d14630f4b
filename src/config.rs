use serde::Deserialize;
use std::path::PathBuf;

/// Where computed feature records are persisted
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// JSON file on disk
    File,
    /// One Redis key per game
    Redis,
    /// Process-local, lost on restart
    Memory,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding `espn_play_by_play_<game_id>.csv` files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Game index CSV with display metadata
    #[serde(default = "default_game_database_path")]
    pub game_database_path: PathBuf,

    #[serde(default = "default_cache_backend")]
    pub cache_backend: CacheBackend,

    /// Used by the `file` cache backend
    #[serde(default = "default_feature_cache_path")]
    pub feature_cache_path: PathBuf,

    /// Used by the `redis` cache backend
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// ESPN NBA site API base URL
    #[serde(default = "default_espn_api_url")]
    pub espn_api_url: String,

    /// Origin allowed to call `/api/*` from a browser
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_game_database_path() -> PathBuf {
    PathBuf::from("game_database.csv")
}

fn default_cache_backend() -> CacheBackend {
    CacheBackend::File
}

fn default_feature_cache_path() -> PathBuf {
    PathBuf::from("cached_game_features.json")
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_espn_api_url() -> String {
    "https://site.api.espn.com/apis/site/v2/sports/basketball/nba".to_string()
}

fn default_cors_origin() -> String {
    "https://gameselect.onrender.com".to_string()
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Load configuration from explicit key/value pairs
    pub fn from_vars<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter::<_, Config>(vars).map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}
