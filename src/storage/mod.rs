//! Storage abstractions for the media cache.
//!
//! The cache maps each detail link to its [`CacheRecord`]. It is loaded once
//! per run, mutated in memory, and saved once at the end.
//!
//! ## Persisted Layout
//!
//! ```text
//! {
//!   "https://movie.douban.com/subject/35575567/": {
//!     "name": "沙丘2",
//!     "release_date": "2024-03-08"
//!   },
//!   "https://www.douban.com/game/26826363/": {
//!     "name": "空洞骑士：丝之歌",
//!     "release_date": null
//!   }
//! }
//! ```

pub mod local;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{CacheRecord, MediaDetails};

// Re-export for convenience
pub use local::JsonCacheFile;

/// What an upsert did to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A new record was created
    Inserted,
    /// A missing release date was filled
    DateFilled,
    /// Only the name changed
    Renamed,
    /// Nothing changed
    Unchanged,
}

/// In-memory media cache keyed by detail link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaCache {
    records: BTreeMap<String, CacheRecord>,
}

impl MediaCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, link: &str) -> bool {
        self.records.contains_key(link)
    }

    pub fn get(&self, link: &str) -> Option<&CacheRecord> {
        self.records.get(link)
    }

    /// Iterate records in link order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CacheRecord)> {
        self.records.iter().map(|(link, record)| (link.as_str(), record))
    }

    /// Links of records still lacking a release date, in link order.
    pub fn undated_links(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, record)| !record.is_dated())
            .map(|(link, _)| link)
            .collect()
    }

    /// Number of records with a release date.
    pub fn dated_count(&self) -> usize {
        self.records.values().filter(|r| r.is_dated()).count()
    }

    /// Insert or merge resolved details for `link`.
    ///
    /// An existing record takes the new name unless it is the unresolved
    /// placeholder. Its release date is only set while still null, so a
    /// known date is never replaced or erased.
    pub fn upsert(&mut self, link: &str, details: MediaDetails) -> UpsertOutcome {
        let Some(record) = self.records.get_mut(link) else {
            self.records.insert(
                link.to_string(),
                CacheRecord {
                    name: details.name,
                    release_date: details.release_date,
                },
            );
            return UpsertOutcome::Inserted;
        };

        let mut outcome = UpsertOutcome::Unchanged;

        if !details.is_unknown() && record.name != details.name {
            record.name = details.name;
            outcome = UpsertOutcome::Renamed;
        }

        if record.release_date.is_none() && details.release_date.is_some() {
            record.release_date = details.release_date;
            outcome = UpsertOutcome::DateFilled;
        }

        outcome
    }
}

/// Trait for cache storage backends.
#[async_trait]
pub trait CacheRepository: Send + Sync {
    /// Load the persisted cache.
    ///
    /// Missing or unreadable state yields an empty cache.
    async fn load(&self) -> MediaCache;

    /// Replace the persisted cache with `cache`.
    async fn save(&self, cache: &MediaCache) -> Result<()>;

    /// Human-readable location for logs.
    fn location(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(name: &str, date: Option<&str>) -> MediaDetails {
        MediaDetails {
            name: name.to_string(),
            release_date: date.map(String::from),
        }
    }

    const LINK: &str = "https://movie.douban.com/subject/1/";

    #[test]
    fn test_insert_new_record() {
        let mut cache = MediaCache::new();
        let outcome = cache.upsert(LINK, details("Dune", None));

        assert_eq!(outcome, UpsertOutcome::Inserted);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.undated_links(), vec![LINK]);
    }

    #[test]
    fn test_fills_missing_date() {
        let mut cache = MediaCache::new();
        cache.upsert(LINK, details("Dune", None));

        let outcome = cache.upsert(LINK, details("Dune", Some("2024-03-08")));
        assert_eq!(outcome, UpsertOutcome::DateFilled);
        assert_eq!(
            cache.get(LINK).unwrap().release_date.as_deref(),
            Some("2024-03-08")
        );
        assert_eq!(cache.dated_count(), 1);
    }

    #[test]
    fn test_known_date_never_overwritten_or_erased() {
        let mut cache = MediaCache::new();
        cache.upsert(LINK, details("Dune", Some("2024-03-08")));

        cache.upsert(LINK, details("Dune", Some("2025-01-01")));
        cache.upsert(LINK, details("Dune", None));
        cache.upsert(LINK, MediaDetails::unknown());

        let record = cache.get(LINK).unwrap();
        assert_eq!(record.release_date.as_deref(), Some("2024-03-08"));
        assert_eq!(record.name, "Dune");
    }

    #[test]
    fn test_name_updates_but_not_to_unknown() {
        let mut cache = MediaCache::new();
        cache.upsert(LINK, details("沙丘", None));

        assert_eq!(
            cache.upsert(LINK, details("沙丘2", None)),
            UpsertOutcome::Renamed
        );
        assert_eq!(cache.upsert(LINK, MediaDetails::unknown()), UpsertOutcome::Unchanged);
        assert_eq!(cache.get(LINK).unwrap().name, "沙丘2");
    }

    #[test]
    fn test_json_shape() {
        let mut cache = MediaCache::new();
        cache.upsert(LINK, details("Dune", Some("2024-03-08")));

        let value = serde_json::to_value(&cache).unwrap();
        assert_eq!(value[LINK]["name"], "Dune");
        assert_eq!(value[LINK]["release_date"], "2024-03-08");
    }
}
