// src/models/mod.rs

//! Domain models for the media calendar.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod media;

// Re-export all public types
pub use config::{CacheConfig, CalendarConfig, Config, CrawlerConfig, FEED_URL_ENV, FeedConfig};
pub use media::{CacheRecord, CalendarEvent, FeedItem, MediaDetails, MediaKind, UNKNOWN_NAME};
