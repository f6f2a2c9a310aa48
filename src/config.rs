use crate::progress::JsonProgressStore;
use std::path::PathBuf;
use std::time::Duration;

/// Player tunables.
/// In debug builds a `.env` file is loaded first; after that, `MATINEE_*`
/// environment variables override the defaults in both build modes.
#[derive(Clone, Debug)]
pub struct PlayerConfig {
    /// How often the catalog endpoint is re-fetched.
    pub refresh_interval: Duration,
    /// Minimum position delta (seconds) between persisted progress writes.
    pub save_threshold_secs: f64,
    /// How long an adaptive stream may sit buffering before it counts as dead.
    pub stall_timeout: Duration,
    /// Network-fault restarts allowed per video before giving up.
    pub retry_budget: u32,
    /// Pause before each network-fault restart.
    pub retry_delay: Duration,
    /// Pause before skipping a video whose adapter could not be built,
    /// so a catalog full of broken entries cycles slowly instead of spinning.
    pub construction_fault_delay: Duration,
    /// Where watch progress is persisted.
    pub progress_path: PathBuf,
    /// Preferred caption language passed to embedded players.
    pub caption_lang: Option<String>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(300),
            save_threshold_secs: 5.0,
            stall_timeout: Duration::from_secs(10),
            retry_budget: 3,
            retry_delay: Duration::from_secs(1),
            construction_fault_delay: Duration::from_secs(1),
            progress_path: JsonProgressStore::default_path(),
            caption_lang: None,
        }
    }
}

impl PlayerConfig {
    /// Load configuration based on build mode
    pub fn load() -> Self {
        #[cfg(debug_assertions)]
        {
            // Try to load .env file
            if dotenvy::dotenv().is_ok() {
                println!("Config: Dev mode activated - loaded .env file");
            } else {
                println!("Config: No .env file found, using defaults");
            }
        }

        Self::from_env()
    }

    /// Apply `MATINEE_*` environment overrides on top of the defaults.
    fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(secs) = env_u64("MATINEE_REFRESH_SECS") {
            config.refresh_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = env_f64("MATINEE_SAVE_THRESHOLD_SECS") {
            config.save_threshold_secs = secs;
        }
        if let Some(secs) = env_u64("MATINEE_STALL_TIMEOUT_SECS") {
            config.stall_timeout = Duration::from_secs(secs);
        }
        if let Some(budget) = env_u32("MATINEE_RETRY_BUDGET") {
            config.retry_budget = budget;
        }
        if let Some(ms) = env_u64("MATINEE_RETRY_DELAY_MS") {
            config.retry_delay = Duration::from_millis(ms);
        }
        if let Ok(path) = std::env::var("MATINEE_PROGRESS_PATH") {
            config.progress_path = PathBuf::from(path);
        }
        if let Ok(lang) = std::env::var("MATINEE_CAPTION_LANG") {
            if !lang.is_empty() {
                config.caption_lang = Some(lang);
            }
        }

        config
    }
}

fn env_u32(name: &str) -> Option<u32> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

fn env_f64(name: &str) -> Option<f64> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
