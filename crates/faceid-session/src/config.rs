use faceid_core::detector::{ENROLL_SCORE_THRESHOLD, LOOP_SCORE_THRESHOLD};
use faceid_core::matcher::DEFAULT_MATCH_THRESHOLD;
use faceid_core::store::DEFAULT_STORAGE_KEY;
use std::path::PathBuf;
use std::time::Duration;

/// Session configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database holding enrolled identities.
    pub db_path: PathBuf,
    /// Key under which the identity array is stored.
    pub storage_key: String,
    /// Maximum Euclidean distance for a positive match (exclusive).
    pub match_threshold: f32,
    /// Period between detection ticks.
    pub detection_interval: Duration,
    /// Detector score threshold while polling.
    pub loop_score_threshold: f32,
    /// Detector score threshold for enrollment captures.
    pub enroll_score_threshold: f32,
    /// How long a notice stays visible.
    pub notice_ttl: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_data_dir().join("faces.db"),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            detection_interval: Duration::from_millis(450),
            loop_score_threshold: LOOP_SCORE_THRESHOLD,
            enroll_score_threshold: ENROLL_SCORE_THRESHOLD,
            notice_ttl: Duration::from_millis(2600),
        }
    }
}

impl Config {
    /// Load configuration from `FACEID_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let db_path = std::env::var("FACEID_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        Self {
            db_path,
            storage_key: std::env::var("FACEID_STORAGE_KEY").unwrap_or(defaults.storage_key),
            match_threshold: env_f32("FACEID_MATCH_THRESHOLD", defaults.match_threshold),
            detection_interval: Duration::from_millis(env_u64(
                "FACEID_DETECTION_INTERVAL_MS",
                defaults.detection_interval.as_millis() as u64,
            )),
            loop_score_threshold: env_f32(
                "FACEID_LOOP_SCORE_THRESHOLD",
                defaults.loop_score_threshold,
            ),
            enroll_score_threshold: env_f32(
                "FACEID_ENROLL_SCORE_THRESHOLD",
                defaults.enroll_score_threshold,
            ),
            notice_ttl: Duration::from_millis(env_u64(
                "FACEID_NOTICE_TTL_MS",
                defaults.notice_ttl.as_millis() as u64,
            )),
        }
    }
}

/// `$XDG_DATA_HOME/faceid`, falling back to `~/.local/share/faceid`.
pub fn default_data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("faceid")
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
