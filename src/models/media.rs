//! Media item data structures.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Name used when a detail page yields nothing usable.
pub const UNKNOWN_NAME: &str = "Unknown";

/// A wanted entry read from the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    /// Feed entry title, marker included
    pub title: String,

    /// Detail page URL
    pub link: String,

    /// Title with the wanted marker stripped
    pub display_name: String,
}

/// Kind of detail page, decided from the URL shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Film-like subject pages (`/subject/<id>/`)
    Film,
    /// Game pages (`/game/<id>/`)
    Game,
}

impl MediaKind {
    /// Classify a detail URL by its path segments.
    pub fn classify(link: &str) -> Option<Self> {
        let parsed = url::Url::parse(link).ok()?;
        let mut segments = parsed.path_segments()?;
        segments.find_map(|segment| match segment {
            "subject" => Some(Self::Film),
            "game" => Some(Self::Game),
            _ => None,
        })
    }
}

/// Name and release date extracted from a detail page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDetails {
    pub name: String,
    pub release_date: Option<String>,
}

impl MediaDetails {
    /// Details for a page that could not be resolved.
    pub fn unknown() -> Self {
        Self {
            name: UNKNOWN_NAME.to_string(),
            release_date: None,
        }
    }

    /// Whether the name is the unresolved placeholder.
    pub fn is_unknown(&self) -> bool {
        self.name == UNKNOWN_NAME
    }
}

/// A cached media record, keyed by link in the cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheRecord {
    /// Display name
    pub name: String,

    /// Release date as `YYYY-MM-DD`, null until resolved
    #[serde(default)]
    pub release_date: Option<String>,
}

impl CacheRecord {
    /// Whether a release date is known.
    pub fn is_dated(&self) -> bool {
        self.release_date.is_some()
    }

    /// Parse the stored release date.
    ///
    /// Returns `None` for undated records and for strings that are not a
    /// real calendar date.
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        self.release_date
            .as_deref()
            .and_then(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok())
    }
}

/// A calendar event projected from a cache record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    /// Cache key the event was derived from
    pub link: String,

    /// Event summary
    pub name: String,

    /// Event start, normalized to UTC
    pub start: DateTime<Utc>,
}
