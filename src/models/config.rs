//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Environment variable that overrides `feed.url`.
pub const FEED_URL_ENV: &str = "RSS_URL";

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Feed location and item filtering
    #[serde(default)]
    pub feed: FeedConfig,

    /// HTTP and politeness settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Cache file and backfill settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Calendar output settings
    #[serde(default)]
    pub calendar: CalendarConfig,
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

    /// Apply environment overrides on top of file values.
    pub fn apply_env(&mut self) {
        self.apply_feed_url(std::env::var(FEED_URL_ENV).ok());
    }

    fn apply_feed_url(&mut self, value: Option<String>) {
        if let Some(url) = value.filter(|v| !v.trim().is_empty()) {
            self.feed.url = Some(url.trim().to_string());
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.min_delay_ms > self.crawler.max_delay_ms {
            return Err(AppError::validation(
                "crawler.min_delay_ms must not exceed crawler.max_delay_ms",
            ));
        }
        if self.feed.wanted_markers.iter().all(|m| m.trim().is_empty()) {
            return Err(AppError::validation("No wanted markers defined"));
        }
        if self.calendar.event_hour > 23 {
            return Err(AppError::validation("calendar.event_hour must be < 24"));
        }
        if self.calendar.offset().is_none() {
            return Err(AppError::validation(
                "calendar.utc_offset_hours must be within ±14",
            ));
        }
        if let Some(url) = &self.feed.url {
            url::Url::parse(url)?;
        }
        Ok(())
    }
}

/// Feed location and filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// RSS feed URL (overridden by `RSS_URL`)
    #[serde(default)]
    pub url: Option<String>,

    /// Title substrings marking an item as wanted
    #[serde(default = "defaults::wanted_markers")]
    pub wanted_markers: Vec<String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: None,
            wanted_markers: defaults::wanted_markers(),
        }
    }
}

/// HTTP client and politeness settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Lower bound of the randomized delay before each detail fetch
    #[serde(default = "defaults::min_delay")]
    pub min_delay_ms: u64,

    /// Upper bound of the randomized delay before each detail fetch
    #[serde(default = "defaults::max_delay")]
    pub max_delay_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            min_delay_ms: defaults::min_delay(),
            max_delay_ms: defaults::max_delay(),
        }
    }
}

/// Cache file and backfill settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache file name, relative to the storage directory
    #[serde(default = "defaults::cache_file")]
    pub file: String,

    /// Maximum undated records retried per run
    #[serde(default = "defaults::max_backfill_attempts")]
    pub max_backfill_attempts: usize,

    /// Fixed seed for backfill sampling
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            file: defaults::cache_file(),
            max_backfill_attempts: defaults::max_backfill_attempts(),
            seed: None,
        }
    }
}

impl CacheConfig {
    /// Resolve the cache file against the storage directory.
    pub fn path(&self, storage_dir: &Path) -> PathBuf {
        storage_dir.join(&self.file)
    }
}

/// Calendar output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Calendar file name, relative to the storage directory
    #[serde(default = "defaults::calendar_file")]
    pub file: String,

    /// Offset of the reference timezone from UTC
    #[serde(default = "defaults::utc_offset_hours")]
    pub utc_offset_hours: i32,

    /// Days before today still included
    #[serde(default = "defaults::days_before")]
    pub days_before: i64,

    /// Days after today included
    #[serde(default = "defaults::days_after")]
    pub days_after: i64,

    /// Local hour at which each event starts
    #[serde(default = "defaults::event_hour")]
    pub event_hour: u32,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            file: defaults::calendar_file(),
            utc_offset_hours: defaults::utc_offset_hours(),
            days_before: defaults::days_before(),
            days_after: defaults::days_after(),
            event_hour: defaults::event_hour(),
        }
    }
}

impl CalendarConfig {
    /// Resolve the calendar file against the storage directory.
    pub fn path(&self, storage_dir: &Path) -> PathBuf {
        storage_dir.join(&self.file)
    }

    /// The reference timezone as a fixed offset.
    pub fn offset(&self) -> Option<FixedOffset> {
        if self.utc_offset_hours.abs() > 14 {
            return None;
        }
        FixedOffset::east_opt(self.utc_offset_hours * 3600)
    }
}

mod defaults {
    // Feed defaults
    pub fn wanted_markers() -> Vec<String> {
        vec!["想看".into(), "想玩".into()]
    }

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn min_delay() -> u64 {
        1000
    }
    pub fn max_delay() -> u64 {
        3000
    }

    // Cache defaults
    pub fn cache_file() -> String {
        "media_data.json".into()
    }
    pub fn max_backfill_attempts() -> usize {
        10
    }

    // Calendar defaults
    pub fn calendar_file() -> String {
        "media.ics".into()
    }
    pub fn utc_offset_hours() -> i32 {
        8
    }
    pub fn days_before() -> i64 {
        90
    }
    pub fn days_after() -> i64 {
        180
    }
    pub fn event_hour() -> u32 {
        23
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
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.crawler.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_delay_bounds() {
        let mut config = Config::default();
        config.crawler.min_delay_ms = 5000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_offset_and_hour() {
        let mut config = Config::default();
        config.calendar.utc_offset_hours = 20;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.calendar.event_hour = 24;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_unparseable_feed_url() {
        let mut config = Config::default();
        config.feed.url = Some("not a url".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [feed]
            url = "https://www.douban.com/feed/people/someone/interests"

            [calendar]
            days_after = 365
            "#,
        )
        .unwrap();

        assert_eq!(config.calendar.days_after, 365);
        assert_eq!(config.calendar.days_before, 90);
        assert_eq!(config.cache.max_backfill_attempts, 10);
        assert_eq!(config.feed.wanted_markers, vec!["想看", "想玩"]);
    }

    #[test]
    fn env_value_overrides_feed_url() {
        let mut config = Config::default();
        config.feed.url = Some("https://a.example/feed".to_string());

        config.apply_feed_url(Some("  ".to_string()));
        assert_eq!(config.feed.url.as_deref(), Some("https://a.example/feed"));

        config.apply_feed_url(Some("https://b.example/feed".to_string()));
        assert_eq!(config.feed.url.as_deref(), Some("https://b.example/feed"));
    }

    #[test]
    fn paths_are_relative_to_storage_dir() {
        let config = Config::default();
        let dir = Path::new("storage");
        assert_eq!(config.cache.path(dir), dir.join("media_data.json"));
        assert_eq!(config.calendar.path(dir), dir.join("media.ics"));
    }
}
