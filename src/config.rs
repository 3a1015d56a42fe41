//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Remote feed endpoint and credentials
    #[serde(default)]
    pub feed: FeedConfig,

    /// Rate limiting and retry behavior
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Scan bounds and checkpoint cadence
    #[serde(default)]
    pub build: BuildSettings,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.feed.base_url.trim().is_empty() {
            return Err(AppError::validation("feed.base_url is empty"));
        }
        if self.feed.user_agent.trim().is_empty() {
            return Err(AppError::validation("feed.user_agent is empty"));
        }
        if self.feed.page_size == 0 {
            return Err(AppError::validation("feed.page_size must be > 0"));
        }
        if self.feed.timeout_secs == 0 {
            return Err(AppError::validation("feed.timeout_secs must be > 0"));
        }
        if self.fetch.max_delay_ms < self.fetch.base_delay_ms {
            return Err(AppError::validation(
                "fetch.max_delay_ms must be >= fetch.base_delay_ms",
            ));
        }
        if self.build.checkpoint_interval == 0 {
            return Err(AppError::validation(
                "build.checkpoint_interval must be > 0",
            ));
        }
        if !(1900..=9999).contains(&self.build.earliest_year) {
            return Err(AppError::validation("build.earliest_year out of range"));
        }
        Ok(())
    }
}

/// Remote feed endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Base URL of the feed API
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// HTTP basic auth username
    #[serde(default)]
    pub username: String,

    /// HTTP basic auth password
    #[serde(default)]
    pub password: String,

    /// Articles per page; must match the remote API's fixed page size
    #[serde(default = "defaults::page_size")]
    pub page_size: u32,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            username: String::new(),
            password: String::new(),
            page_size: defaults::page_size(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Rate limiting and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Base delay before every request, in milliseconds
    #[serde(default = "defaults::base_delay")]
    pub base_delay_ms: u64,

    /// Backoff delay ceiling, in milliseconds
    #[serde(default = "defaults::max_delay")]
    pub max_delay_ms: u64,

    /// Random jitter added to every delay, in milliseconds
    #[serde(default = "defaults::jitter")]
    pub jitter_ms: u64,

    /// Retries per page after a throttled response
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: defaults::base_delay(),
            max_delay_ms: defaults::max_delay(),
            jitter_ms: defaults::jitter(),
            max_retries: defaults::max_retries(),
        }
    }
}

/// Scan bounds and checkpoint cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSettings {
    /// Stop scanning once an article from this year (or earlier) is seen
    #[serde(default = "defaults::earliest_year")]
    pub earliest_year: i32,

    /// Persist a checkpoint every N pages
    #[serde(default = "defaults::checkpoint_interval")]
    pub checkpoint_interval: u32,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            earliest_year: defaults::earliest_year(),
            checkpoint_interval: defaults::checkpoint_interval(),
        }
    }
}

mod defaults {
    // Feed defaults
    pub fn base_url() -> String {
        "https://api.feedbin.com".into()
    }
    pub fn page_size() -> u32 {
        100
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; starindex/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }

    // Fetch defaults
    pub fn base_delay() -> u64 {
        500
    }
    pub fn max_delay() -> u64 {
        30_000
    }
    pub fn jitter() -> u64 {
        250
    }
    pub fn max_retries() -> u32 {
        5
    }

    // Build defaults
    pub fn earliest_year() -> i32 {
        2010
    }
    pub fn checkpoint_interval() -> u32 {
        10
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_page_size() {
        let mut config = Config::default();
        config.feed.page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_delays() {
        let mut config = Config::default();
        config.fetch.base_delay_ms = 5_000;
        config.fetch.max_delay_ms = 1_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_checkpoint_interval() {
        let mut config = Config::default();
        config.build.checkpoint_interval = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn parse_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [feed]
            username = "user@example.com"
            password = "secret"

            [build]
            earliest_year = 2015
            "#,
        )
        .unwrap();

        assert_eq!(config.feed.username, "user@example.com");
        assert_eq!(config.feed.page_size, 100);
        assert_eq!(config.build.earliest_year, 2015);
        assert_eq!(config.fetch.max_retries, 5);
    }
}
