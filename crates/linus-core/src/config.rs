//! Configuration read from the environment at startup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_STATE_PATH: &str = "data/linus_state.json";
pub const DEFAULT_SAVE_DEBOUNCE_SECS: f64 = 0.5;
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-exp";
pub const DEFAULT_CLASSIFIER_TIMEOUT_SECS: u64 = 20;

/// Decision thresholds used by the integrator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Primary assignments below this confidence go straight to review.
    pub review_confidence: f64,
    /// Similarity at or above this (and below `merge`) is held for review.
    pub gray_zone: f64,
    /// Similarity at or above this is treated as a duplicate.
    pub merge: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            review_confidence: 0.6,
            gray_zone: 0.7,
            merge: 0.85,
        }
    }
}

/// Credentials and model selection for the remote classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteClassifierConfig {
    pub api_key: String,
    pub model: String,
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
}

/// Top-level Linus configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinusConfig {
    /// HTTP server port.
    pub port: u16,
    /// JSON state file.
    pub state_path: PathBuf,
    /// Coalescing window for scheduled saves. Zero writes synchronously.
    #[serde(with = "duration_secs")]
    pub save_debounce: Duration,
    /// `None` when no API key is configured.
    pub remote_classifier: Option<RemoteClassifierConfig>,
    pub thresholds: Thresholds,
}

impl Default for LinusConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
            save_debounce: Duration::from_secs_f64(DEFAULT_SAVE_DEBOUNCE_SECS),
            remote_classifier: None,
            thresholds: Thresholds::default(),
        }
    }
}

impl LinusConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = parse_or("PORT", lookup("PORT"), DEFAULT_PORT);

        let state_path = lookup("LINUS_STATE_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_PATH));

        let debounce_secs = parse_or(
            "LINUS_SAVE_DEBOUNCE",
            lookup("LINUS_SAVE_DEBOUNCE"),
            DEFAULT_SAVE_DEBOUNCE_SECS,
        );
        let save_debounce = debounce_from_secs(debounce_secs);

        let remote_classifier = lookup("GEMINI_API_KEY")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .map(|api_key| RemoteClassifierConfig {
                api_key,
                model: lookup("GEMINI_MODEL")
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
                timeout: Duration::from_secs(parse_or(
                    "LINUS_CLASSIFIER_TIMEOUT",
                    lookup("LINUS_CLASSIFIER_TIMEOUT"),
                    DEFAULT_CLASSIFIER_TIMEOUT_SECS,
                )),
            });

        Self {
            port,
            state_path,
            save_debounce,
            remote_classifier,
            thresholds: Thresholds::default(),
        }
    }

    /// Same configuration pointed at a different state file.
    pub fn with_state_path(mut self, path: impl AsRef<Path>) -> Self {
        self.state_path = path.as_ref().to_path_buf();
        self
    }
}

fn parse_or<T: std::str::FromStr + Copy + std::fmt::Display>(
    key: &str,
    raw: Option<String>,
    default: T,
) -> T {
    match raw {
        None => default,
        Some(value) => match value.trim().parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!("Ignoring invalid {}={:?}, using {}", key, value, default);
                default
            }
        },
    }
}

/// Anything that is not a positive, representable duration means no delay.
fn debounce_from_secs(secs: f64) -> Duration {
    if secs > 0.0 {
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
    } else {
        Duration::ZERO
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(super::debounce_from_secs(f64::deserialize(deserializer)?))
    }
}
