// src/services/details.rs

//! Detail page resolver.
//!
//! Fetches a media detail page and extracts its display name and release
//! date. Resolution never fails outward: every error degrades to
//! [`MediaDetails::unknown`] with a logged diagnostic.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::{CrawlerConfig, MediaDetails, MediaKind};
use crate::services::selectors::MediaExtractor;
use crate::utils::http::fetch_text;

/// Source of media details for a detail page URL.
#[async_trait]
pub trait DetailSource: Send + Sync {
    /// Resolve the name and release date behind `url`.
    async fn resolve(&self, url: &str) -> MediaDetails;
}

/// Resolves details by fetching pages over HTTP.
pub struct DetailResolver {
    client: Client,
    extractor: MediaExtractor,
    min_delay_ms: u64,
    max_delay_ms: u64,
}

impl DetailResolver {
    /// Create a resolver sharing the run's HTTP client.
    pub fn new(client: Client, config: &CrawlerConfig) -> Result<Self> {
        Ok(Self {
            client,
            extractor: MediaExtractor::new()?,
            min_delay_ms: config.min_delay_ms.min(config.max_delay_ms),
            max_delay_ms: config.max_delay_ms.max(config.min_delay_ms),
        })
    }

    /// Sleep for a random interval before hitting the source site.
    async fn politeness_delay(&self) {
        let millis = rand::thread_rng().gen_range(self.min_delay_ms..=self.max_delay_ms);
        if millis > 0 {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
    }

    async fn try_resolve(&self, kind: MediaKind, url: &str) -> Result<MediaDetails> {
        self.politeness_delay().await;
        let html = fetch_text(&self.client, url)
            .await
            .map_err(|e| AppError::detail(url, e))?;
        self.extractor.extract(kind, &html)
    }
}

#[async_trait]
impl DetailSource for DetailResolver {
    async fn resolve(&self, url: &str) -> MediaDetails {
        let Some(kind) = MediaKind::classify(url) else {
            log::warn!("Unrecognized detail page, skipping fetch: {}", url);
            return MediaDetails::unknown();
        };

        match self.try_resolve(kind, url).await {
            Ok(details) => {
                log::debug!(
                    "Resolved {} -> '{}' ({})",
                    url,
                    details.name,
                    details.release_date.as_deref().unwrap_or("no date")
                );
                details
            }
            Err(e) => {
                log::error!("{}", e);
                MediaDetails::unknown()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> DetailResolver {
        let config = CrawlerConfig {
            timeout_secs: 2,
            min_delay_ms: 0,
            max_delay_ms: 0,
            ..CrawlerConfig::default()
        };
        let client = crate::utils::http::create_client(&config).unwrap();
        DetailResolver::new(client, &config).unwrap()
    }

    #[tokio::test]
    async fn test_unrecognized_url_is_unknown() {
        let details = resolver().resolve("https://example.com/about").await;
        assert_eq!(details, MediaDetails::unknown());
    }

    #[tokio::test]
    async fn test_unreachable_page_is_unknown() {
        let details = resolver()
            .resolve("http://127.0.0.1:9/subject/1292052/")
            .await;
        assert_eq!(details, MediaDetails::unknown());
    }

    #[test]
    fn test_inverted_delay_bounds_are_normalized() {
        let config = CrawlerConfig {
            min_delay_ms: 300,
            max_delay_ms: 100,
            ..CrawlerConfig::default()
        };
        let client = crate::utils::http::create_client(&config).unwrap();
        let resolver = DetailResolver::new(client, &config).unwrap();
        assert_eq!(resolver.min_delay_ms, 100);
        assert_eq!(resolver.max_delay_ms, 300);
    }
}
