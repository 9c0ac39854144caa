//! Runtime settings, stored as JSON next to the binary (conf.json by default).
//!
//! Every field has a serde default so a partial file, or `{}`, is a valid config.

use anyhow::{anyhow, Context, Result};
use log::{warn, LevelFilter};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;
use url::Url;

use crate::language_utils;

/// Settings shared by the `shift` and `translate` commands
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Language of the subtitle text (ISO 639-1 or 639-2)
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Language to translate into (ISO 639-1 or 639-2)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    #[serde(default)]
    pub translation: TranslationConfig,

    #[serde(default)]
    pub shift: ShiftConfig,

    /// Verbosity when `--log-level` is not given
    #[serde(default)]
    pub log_level: LogLevel,
}

// @struct: LibreTranslate-compatible service settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    // @field: Base URL, `/translate` is appended
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    // @field: Sent as `api_key` when not empty
    #[serde(default)]
    pub api_key: String,

    // @field: Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Extra attempts after a transient failure
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    // @field: First retry delay, doubled per attempt
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        TranslationConfig {
            endpoint: default_endpoint(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

// @struct: Timestamp shift settings
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ShiftConfig {
    // @field: Seconds used when `shift` runs without `--offset`
    #[serde(default)]
    pub default_offset_secs: f64,
}

/// Log verbosity, spelled lowercase in the config file
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    // @returns: Matching `log` filter
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn default_source_language() -> String {
    "en".to_string()
}

fn default_target_language() -> String {
    "ru".to_string()
}

fn default_endpoint() -> String {
    "http://localhost:5000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

impl Config {
    /// Read the config at `path`; if there is none, write the defaults there and use them
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            warn!("No config at '{}', writing defaults", path.display());
            let config = Config::default();
            let json = serde_json::to_string_pretty(&config)
                .context("Failed to serialize default config")?;
            fs::write(path, json)
                .with_context(|| format!("Failed to write default config: {}", path.display()))?;
            return Ok(config);
        }

        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Reject settings that would only fail later, mid-run
    pub fn validate(&self) -> Result<()> {
        self.validate_shift()?;
        self.validate_translation()
    }

    /// Checks the `shift` command depends on
    pub fn validate_shift(&self) -> Result<()> {
        if !self.shift.default_offset_secs.is_finite() {
            return Err(anyhow!("shift.default_offset_secs must be a finite number"));
        }

        Ok(())
    }

    /// Checks the `translate` command depends on
    pub fn validate_translation(&self) -> Result<()> {
        for code in [&self.source_language, &self.target_language] {
            language_utils::get_language_name(code)?;
        }

        let endpoint = &self.translation.endpoint;
        Url::parse(endpoint)
            .with_context(|| format!("Invalid translation endpoint: {}", endpoint))?;

        if self.translation.timeout_secs == 0 {
            return Err(anyhow!("translation.timeout_secs must be at least 1"));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_language: default_target_language(),
            translation: TranslationConfig::default(),
            shift: ShiftConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
