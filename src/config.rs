//! Runtime configuration.
//!
//! Credentials and identifiers come from the environment (a `.env` file is
//! honored at startup). Tuning knobs come from an optional YAML file with a
//! fallback chain: explicit path, `.refscreen.yml` in the current directory,
//! `~/.config/refscreen/refscreen.yml`, then defaults.

use crate::error::{Result, ScreenError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Environment variables required at startup.
pub const ENV_CLASSIFIER_API_KEY: &str = "CLASSIFIER_API_KEY";
pub const ENV_PLATFORM_EMAIL: &str = "PLATFORM_EMAIL";
pub const ENV_PLATFORM_PASSWORD: &str = "PLATFORM_PASSWORD";
pub const ENV_REVIEW_ID: &str = "REVIEW_ID";

/// Resolved configuration for a screening run.
#[derive(Debug, Clone)]
pub struct Config {
    /// API key for the AI judgment service.
    pub classifier_api_key: String,

    /// Platform login, used by the external session-capture step.
    pub platform_email: String,
    pub platform_password: String,

    /// Target review identifier.
    pub review_id: String,

    /// Tuning knobs (retry, pacing, timeouts).
    pub tuning: Tuning,
}

impl Config {
    /// Load configuration: tuning file chain plus required environment.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let tuning = Tuning::load(config_path)?;
        let config = Self::from_lookup(|key| std::env::var(key).ok(), tuning)?;
        config.validate()?;
        Ok(config)
    }

    /// Build from an arbitrary key lookup. Kept separate from `load` so
    /// tests never have to mutate the process environment.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>, tuning: Tuning) -> Result<Self> {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ScreenError::Config(format!("{} not set", key)))
        };

        Ok(Self {
            classifier_api_key: required(ENV_CLASSIFIER_API_KEY)?,
            platform_email: required(ENV_PLATFORM_EMAIL)?,
            platform_password: required(ENV_PLATFORM_PASSWORD)?,
            review_id: required(ENV_REVIEW_ID)?,
            tuning,
        })
    }

    /// Validate tuning values that would break the run loop.
    pub fn validate(&self) -> Result<()> {
        if self.tuning.max_attempts == 0 {
            return Err(ScreenError::Config("max-attempts must be > 0".to_string()));
        }
        if self.tuning.batch_size == 0 {
            return Err(ScreenError::Config("batch-size must be > 0".to_string()));
        }
        if self.tuning.backoff_multiplier < 1.0 {
            return Err(ScreenError::Config(
                "backoff-multiplier must be >= 1.0".to_string(),
            ));
        }
        Ok(())
    }

    /// Retry policy shared by the platform and classifier call sites.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.tuning.max_attempts,
            base_delay: Duration::from_millis(self.tuning.base_delay_ms),
            multiplier: self.tuning.backoff_multiplier,
        }
    }

    /// Minimum delay between articles.
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.tuning.pacing_ms)
    }

    /// Per-call HTTP timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.tuning.request_timeout_ms)
    }
}

/// Tuning knobs loaded from YAML.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Tuning {
    /// Classifier model name.
    pub model: String,

    /// Model name for pairwise duplicate comparison. A lighter model than
    /// the screening one is enough for yes/no abstract matching.
    #[serde(rename = "dedup-model")]
    pub dedup_model: String,

    /// Maximum attempts per network call (first try included).
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Base retry delay in milliseconds.
    #[serde(rename = "base-delay-ms")]
    pub base_delay_ms: u64,

    /// Exponential backoff multiplier.
    #[serde(rename = "backoff-multiplier")]
    pub backoff_multiplier: f64,

    /// Minimum delay between articles in milliseconds.
    #[serde(rename = "pacing-ms")]
    pub pacing_ms: u64,

    /// Per-call HTTP timeout in milliseconds.
    #[serde(rename = "request-timeout-ms")]
    pub request_timeout_ms: u64,

    /// Page size when fetching the undecided queue.
    #[serde(rename = "batch-size")]
    pub batch_size: usize,

    /// Optional path to a protocol criteria file.
    #[serde(rename = "protocol-path")]
    pub protocol_path: Option<PathBuf>,

    /// Optional path to the captured session headers file.
    #[serde(rename = "headers-path")]
    pub headers_path: Option<PathBuf>,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            dedup_model: "gemini-2.0-flash-lite".to_string(),
            max_attempts: 3,
            base_delay_ms: 1_000,
            backoff_multiplier: 2.0,
            // 10 requests/minute keeps both services comfortable
            pacing_ms: 6_000,
            request_timeout_ms: 30_000,
            batch_size: 50,
            protocol_path: None,
            headers_path: None,
        }
    }
}

impl Tuning {
    /// Load tuning with fallback chain.
    ///
    /// Search order:
    /// 1. Explicit path if provided
    /// 2. .refscreen.yml in current directory
    /// 3. ~/.config/refscreen/refscreen.yml
    /// 4. Defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let project_config = PathBuf::from(".refscreen.yml");
        if project_config.exists() {
            match Self::load_from_file(&project_config) {
                Ok(tuning) => {
                    log::info!("Loaded tuning from .refscreen.yml");
                    return Ok(tuning);
                }
                Err(e) => {
                    log::warn!("Failed to load .refscreen.yml: {}", e);
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("refscreen").join("refscreen.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(tuning) => {
                        log::info!("Loaded tuning from {}", user_config.display());
                        return Ok(tuning);
                    }
                    Err(e) => {
                        log::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        log::info!("No tuning file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        serde_yaml::from_str(&content)
            .map_err(|e| ScreenError::Config(format!("invalid tuning file: {}", e)))
    }
}
