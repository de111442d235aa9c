// src/services/feed.rs

//! Feed reader service.
//!
//! Reads the tracking feed and keeps only the entries whose title carries a
//! wanted marker, in feed order.

use async_trait::async_trait;
use feed_rs::model::Entry;
use feed_rs::parser;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::FeedItem;
use crate::utils::http::fetch_bytes;

/// Source of wanted feed items.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Read the wanted items from `feed_url`.
    ///
    /// Fetch and parse failures surface as [`AppError::Feed`].
    async fn read(&self, feed_url: &str) -> Result<Vec<FeedItem>>;
}

/// Reads feeds over HTTP.
pub struct FeedReader {
    client: Client,
    markers: Vec<String>,
}

impl FeedReader {
    /// Create a reader sharing the run's HTTP client.
    pub fn new(client: Client, markers: Vec<String>) -> Self {
        let markers = markers
            .into_iter()
            .filter(|m| !m.trim().is_empty())
            .collect();
        Self { client, markers }
    }
}

#[async_trait]
impl FeedSource for FeedReader {
    async fn read(&self, feed_url: &str) -> Result<Vec<FeedItem>> {
        let bytes = fetch_bytes(&self.client, feed_url)
            .await
            .map_err(AppError::feed)?;
        let items = parse_wanted(&bytes, &self.markers)?;
        log::info!("Feed returned {} wanted items", items.len());
        Ok(items)
    }
}

/// Parse a feed document and keep wanted entries.
pub fn parse_wanted(bytes: &[u8], markers: &[String]) -> Result<Vec<FeedItem>> {
    let feed = parser::parse(bytes).map_err(AppError::feed)?;
    Ok(feed
        .entries
        .iter()
        .filter_map(|entry| wanted_item(entry, markers))
        .collect())
}

fn wanted_item(entry: &Entry, markers: &[String]) -> Option<FeedItem> {
    let title = entry.title.as_ref()?.content.trim().to_string();
    let marker = markers.iter().find(|m| title.contains(m.as_str()))?;

    let Some(link) = entry.links.first().map(|l| l.href.clone()) else {
        log::warn!("Wanted entry without link: {}", title);
        return None;
    };

    let display_name = title.replacen(marker.as_str(), "", 1).trim().to_string();
    Some(FeedItem {
        title,
        link,
        display_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>someone 的收藏</title>
    <link>https://www.douban.com/people/someone/</link>
    <description>recent interests</description>
    <item>
      <title>想看沙丘2</title>
      <link>https://movie.douban.com/subject/35575567/</link>
    </item>
    <item>
      <title>看过奥本海默</title>
      <link>https://movie.douban.com/subject/35593344/</link>
    </item>
    <item>
      <title>想玩空洞骑士：丝之歌</title>
      <link>https://www.douban.com/game/26826363/</link>
    </item>
    <item>
      <title>想看沙丘2</title>
      <link>https://movie.douban.com/subject/35575567/</link>
    </item>
  </channel>
</rss>"#;

    fn markers() -> Vec<String> {
        vec!["想看".to_string(), "想玩".to_string()]
    }

    #[test]
    fn test_filters_and_strips_markers() {
        let items = parse_wanted(FEED.as_bytes(), &markers()).unwrap();

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].display_name, "沙丘2");
        assert_eq!(items[0].title, "想看沙丘2");
        assert_eq!(items[0].link, "https://movie.douban.com/subject/35575567/");
        assert_eq!(items[1].display_name, "空洞骑士：丝之歌");
        assert_eq!(items[1].link, "https://www.douban.com/game/26826363/");
    }

    #[test]
    fn test_keeps_duplicates_in_feed_order() {
        let items = parse_wanted(FEED.as_bytes(), &markers()).unwrap();
        assert_eq!(items[0].link, items[2].link);
    }

    #[test]
    fn test_invalid_feed_is_feed_error() {
        let result = parse_wanted(b"<html>not a feed", &markers());
        assert!(matches!(result, Err(AppError::Feed(_))));
    }

    #[test]
    fn test_blank_markers_are_dropped() {
        let client = Client::new();
        let reader = FeedReader::new(client, vec![" ".to_string(), "想看".to_string()]);
        assert_eq!(reader.markers, vec!["想看".to_string()]);
    }

    #[tokio::test]
    async fn test_unreachable_feed_is_feed_error() {
        let reader = FeedReader::new(Client::new(), markers());
        let result = reader.read("http://127.0.0.1:9/feed").await;
        assert!(matches!(result, Err(AppError::Feed(_))));
    }
}
