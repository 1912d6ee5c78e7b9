//! Ad serving settings
//!
//! Replaces the globals the page bootstrap injects before the frame script runs
//! (network and site ids, priority and zone tables, skip experiment knobs).
//!
//! Settings are layered with the `config` crate:
//! 1. `config/default.toml` next to the working directory (optional)
//! 2. an explicit settings file, or the per-user file under `dirs::config_dir()`
//! 3. `ADZERK_DISPLAY__*` environment variables

#![allow(clippy::uninlined_format_args)]

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::PayloadShape;
use crate::domain::constants::{frame, polling};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load settings: {source}")]
    Load {
        #[from]
        source: config::ConfigError,
    },

    #[error("Settings validation failed: {message}")]
    Validation { message: String },

    #[error("Could not determine the user config directory")]
    NoConfigDir,
}

impl ConfigError {
    fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Default values
pub mod defaults {
    pub const ENV_PREFIX: &str = "ADZERK_DISPLAY";
    pub const BASE_SETTINGS_FILE: &str = "config/default";
    pub const USER_SETTINGS_DIR: &str = "adzerk-display";
    pub const USER_SETTINGS_FILE: &str = "settings.toml";

    pub const ENGINE_DOMAIN: &str = "engine.adzerk.net";
    pub const SKIP_PROBABILITY: f64 = 0.0;

    pub const LOG_LEVEL: &str = "info";
    pub const LOG_JSON_FORMAT: bool = false;
    pub const LOG_CONSOLE_OUTPUT: bool = true;
    pub const LOG_FILE_OUTPUT: bool = false;
    pub const LOG_FILE_PREFIX: &str = "adzerk-display.log";
}

/// Everything the frame needs from its host page
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdServingSettings {
    /// Ad network id used for every placement registration
    pub network_id: u64,

    /// Site id used for every placement registration
    pub site_id: u64,

    /// Priority name -> id (`house`, `self_serve`, ...)
    pub priorities: HashMap<String, u64>,

    /// Delivery zone name -> id (`above_the_fold`, `below_the_fold`)
    pub zones: HashMap<String, u64>,

    /// Engine domain serving impression pixels
    pub engine_domain: String,

    /// Probability of sampling the skip experiment, 0 disables it
    pub skip_probability: f64,

    /// Keywords eligible for the static-image fallback
    pub skip_keywords: Vec<String>,

    /// Fallback image URLs, one is picked at random
    pub skip_images: Vec<String>,

    pub fallback_image_width: u32,
    pub fallback_image_height: u32,

    /// Payload layout sent to the parent page
    pub payload_shape: PayloadShape,

    /// Interval between result checks
    pub poll_interval_ms: u64,

    /// Optional bound on the result wait. Unset keeps polling for the life of
    /// the frame.
    pub poll_timeout_ms: Option<u64>,

    /// Document loaded in a hidden iframe when postMessage is unavailable
    pub bootstrap_frame_src: String,

    pub logging: LoggingConfig,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs
    pub json_format: bool,

    /// Enable console output
    pub console_output: bool,

    /// Enable daily rolling file output
    pub file_output: bool,

    /// Directory for log files, defaults to `logs/` next to the executable
    pub log_dir: Option<PathBuf>,

    /// Module-specific log level filters (e.g., "tokio": "info")
    pub module_filters: HashMap<String, String>,
}

impl Default for AdServingSettings {
    fn default() -> Self {
        Self {
            network_id: 0,
            site_id: 0,
            priorities: HashMap::new(),
            zones: HashMap::new(),
            engine_domain: defaults::ENGINE_DOMAIN.to_string(),
            skip_probability: defaults::SKIP_PROBABILITY,
            skip_keywords: Vec::new(),
            skip_images: Vec::new(),
            fallback_image_width: frame::FALLBACK_IMAGE_WIDTH,
            fallback_image_height: frame::FALLBACK_IMAGE_HEIGHT,
            payload_shape: PayloadShape::default(),
            poll_interval_ms: polling::DEFAULT_POLL_INTERVAL_MS,
            poll_timeout_ms: None,
            bootstrap_frame_src: frame::DEFAULT_BOOTSTRAP_SRC.to_string(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            log_dir: None,
            module_filters: {
                let mut filters = HashMap::new();
                filters.insert("tokio".to_string(), "info".to_string());
                filters.insert("config".to_string(), "warn".to_string());
                filters
            },
        }
    }
}

impl AdServingSettings {
    /// Loads layered settings. `path` replaces the per-user settings file.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name(defaults::BASE_SETTINGS_FILE).required(false));

        match path {
            Some(path) => {
                debug!("Loading ad serving settings from {}", path.display());
                builder = builder.add_source(config::File::from(path));
            }
            None => {
                if let Ok(user_path) = Self::user_settings_path() {
                    builder = builder.add_source(config::File::from(user_path).required(false));
                }
            }
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(defaults::ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("skip_keywords")
                    .with_list_parse_key("skip_images"),
            )
            .build()?;

        let settings: Self = settings.try_deserialize()?;
        settings.validate()?;
        info!(
            network = settings.network_id,
            site = settings.site_id,
            shape = ?settings.payload_shape,
            "Ad serving settings loaded"
        );
        Ok(settings)
    }

    /// `<config dir>/adzerk-display/settings.toml`
    pub fn user_settings_path() -> Result<PathBuf, ConfigError> {
        let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(dir
            .join(defaults::USER_SETTINGS_DIR)
            .join(defaults::USER_SETTINGS_FILE))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.skip_probability.is_finite() || !(0.0..=1.0).contains(&self.skip_probability) {
            return Err(ConfigError::validation(format!(
                "skip_probability must be within [0, 1], got {}",
                self.skip_probability
            )));
        }

        if self.skip_probability > 0.0 && self.skip_images.is_empty() {
            return Err(ConfigError::validation(
                "skip_images must not be empty when skip_probability is set",
            ));
        }

        if self.poll_interval_ms == 0 {
            return Err(ConfigError::validation(
                "poll_interval_ms must be greater than 0",
            ));
        }

        if self.poll_timeout_ms == Some(0) {
            return Err(ConfigError::validation(
                "poll_timeout_ms must be greater than 0 when set",
            ));
        }

        if self.fallback_image_width == 0 || self.fallback_image_height == 0 {
            return Err(ConfigError::validation(
                "fallback image dimensions must be greater than 0",
            ));
        }

        Ok(())
    }

    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_timeout(&self) -> Option<Duration> {
        self.poll_timeout_ms.map(Duration::from_millis)
    }

    pub fn zone_id(&self, name: &str) -> Option<u64> {
        self.zones.get(name).copied()
    }

    /// Reverse lookup in the priority table.
    pub fn priority_name(&self, priority_id: u64) -> Option<&str> {
        self.priorities
            .iter()
            .find(|(_, id)| **id == priority_id)
            .map(|(name, _)| name.as_str())
    }

    pub fn is_skip_keyword(&self, keyword: &str) -> bool {
        self.skip_keywords.iter().any(|k| k == keyword)
    }
}
