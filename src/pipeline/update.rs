// src/pipeline/update.rs

//! Cache update pipeline.
//!
//! One run moves through `Loaded → Ingested → Backfilled → Saved`:
//! new feed items are resolved and cached, a bounded random sample of
//! undated records is retried, and the cache is saved once at the end.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::Client;

use crate::error::Result;
use crate::models::{Config, FeedItem};
use crate::services::{DetailResolver, DetailSource, FeedReader, FeedSource};
use crate::storage::{CacheRepository, JsonCacheFile, MediaCache, UpsertOutcome};

/// Pipeline run states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Loaded,
    Ingested,
    Backfilled,
    Saved,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Loaded => "LOADED",
            RunState::Ingested => "INGESTED",
            RunState::Backfilled => "BACKFILLED",
            RunState::Saved => "SAVED",
        };
        f.write_str(name)
    }
}

/// Summary of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Last state reached
    pub state: RunState,
    /// Whether the feed was read successfully
    pub feed_available: bool,
    /// Wanted items returned by the feed
    pub feed_items: usize,
    /// Items resolved and inserted
    pub ingested: usize,
    /// Items skipped because their link was already cached
    pub skipped: usize,
    /// Undated records eligible for backfill
    pub backfill_candidates: usize,
    /// Links retried during backfill
    pub backfill_attempted: Vec<String>,
    /// Retried records that gained a date
    pub backfill_filled: usize,
    /// Records in the saved cache
    pub records: usize,
}

impl RunReport {
    fn new() -> Self {
        Self {
            state: RunState::Loaded,
            feed_available: false,
            feed_items: 0,
            ingested: 0,
            skipped: 0,
            backfill_candidates: 0,
            backfill_attempted: Vec::new(),
            backfill_filled: 0,
            records: 0,
        }
    }
}

/// Orchestrates feed ingestion, date backfill, and cache persistence.
pub struct UpdatePipeline<'a> {
    feed: &'a dyn FeedSource,
    details: &'a dyn DetailSource,
    repository: &'a dyn CacheRepository,
    max_backfill_attempts: usize,
}

impl<'a> UpdatePipeline<'a> {
    pub fn new(
        feed: &'a dyn FeedSource,
        details: &'a dyn DetailSource,
        repository: &'a dyn CacheRepository,
        max_backfill_attempts: usize,
    ) -> Self {
        Self {
            feed,
            details,
            repository,
            max_backfill_attempts,
        }
    }

    /// Run one update. Only a failed save is returned as an error.
    pub async fn run<R: Rng + ?Sized>(
        &self,
        feed_url: Option<&str>,
        rng: &mut R,
    ) -> Result<(MediaCache, RunReport)> {
        let mut report = RunReport::new();

        let mut cache = self.repository.load().await;
        log::info!("[{}] {} records", report.state, cache.len());

        let items = self.read_feed(feed_url, &mut report).await;
        let touched = self.ingest(&mut cache, &items, &mut report).await;
        report.state = RunState::Ingested;
        log::info!(
            "[{}] {} new, {} already cached",
            report.state,
            report.ingested,
            report.skipped
        );

        self.backfill(&mut cache, &touched, rng, &mut report).await;
        report.state = RunState::Backfilled;
        log::info!(
            "[{}] {} of {} retried records gained a date",
            report.state,
            report.backfill_filled,
            report.backfill_attempted.len()
        );

        self.repository.save(&cache).await?;
        report.state = RunState::Saved;
        report.records = cache.len();
        log::info!(
            "[{}] {} records in {}",
            report.state,
            report.records,
            self.repository.location()
        );

        Ok((cache, report))
    }

    async fn read_feed(&self, feed_url: Option<&str>, report: &mut RunReport) -> Vec<FeedItem> {
        let Some(url) = feed_url else {
            log::error!("Feed URL is not configured; no items to ingest");
            return Vec::new();
        };

        match self.feed.read(url).await {
            Ok(items) => {
                report.feed_available = true;
                report.feed_items = items.len();
                items
            }
            Err(e) => {
                log::error!("{}", e);
                Vec::new()
            }
        }
    }

    /// Resolve and insert items whose link is not cached yet.
    ///
    /// Returns the links resolved during this phase.
    async fn ingest(
        &self,
        cache: &mut MediaCache,
        items: &[FeedItem],
        report: &mut RunReport,
    ) -> HashSet<String> {
        let mut touched = HashSet::new();

        for item in items {
            if cache.contains(&item.link) {
                report.skipped += 1;
                continue;
            }

            let mut details = self.details.resolve(&item.link).await;
            if details.is_unknown() && !item.display_name.is_empty() {
                details.name = item.display_name.clone();
            }

            log::info!(
                "New: {} ({})",
                details.name,
                details.release_date.as_deref().unwrap_or("undated")
            );
            cache.upsert(&item.link, details);
            touched.insert(item.link.clone());
            report.ingested += 1;
        }

        touched
    }

    /// Retry a bounded random sample of undated records.
    async fn backfill<R: Rng + ?Sized>(
        &self,
        cache: &mut MediaCache,
        touched: &HashSet<String>,
        rng: &mut R,
        report: &mut RunReport,
    ) {
        let candidates: Vec<String> = cache
            .undated_links()
            .into_iter()
            .filter(|link| !touched.contains(*link))
            .map(String::from)
            .collect();
        report.backfill_candidates = candidates.len();

        let sample = sample_links(&candidates, self.max_backfill_attempts, rng);

        for link in sample {
            let details = self.details.resolve(&link).await;
            if cache.upsert(&link, details) == UpsertOutcome::DateFilled {
                report.backfill_filled += 1;
                log::info!("Backfilled date for {}", link);
            }
            report.backfill_attempted.push(link);
        }
    }
}

/// Pick `min(links.len(), max)` distinct links at random.
pub fn sample_links<R: Rng + ?Sized>(links: &[String], max: usize, rng: &mut R) -> Vec<String> {
    let amount = links.len().min(max);
    links.choose_multiple(rng, amount).cloned().collect()
}

/// Run the update pipeline against the configured feed and cache file.
pub async fn run_update(
    config: &Config,
    storage_dir: &Path,
    client: &Client,
) -> Result<(MediaCache, RunReport)> {
    let feed = FeedReader::new(client.clone(), config.feed.wanted_markers.clone());
    let details = DetailResolver::new(client.clone(), &config.crawler)?;
    let repository = JsonCacheFile::new(config.cache.path(storage_dir));

    let mut rng = match config.cache.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let pipeline = UpdatePipeline::new(
        &feed,
        &details,
        &repository,
        config.cache.max_backfill_attempts,
    );
    let (cache, report) = pipeline.run(config.feed.url.as_deref(), &mut rng).await?;

    log::info!(
        "Update summary: feed {}, {} items, {} ingested, {} skipped, {}/{} backfilled, {} records",
        if report.feed_available { "ok" } else { "unavailable" },
        report.feed_items,
        report.ingested,
        report.skipped,
        report.backfill_filled,
        report.backfill_attempted.len(),
        report.records
    );

    Ok((cache, report))
}
