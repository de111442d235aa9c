//! Service layer for the media calendar.
//!
//! This module contains the network-facing collaborators:
//! - Feed reading (`FeedReader`)
//! - Detail page resolution (`DetailResolver`)
//! - Per-kind extraction rules (`MediaExtractor`)

mod details;
mod feed;
mod selectors;

pub use details::{DetailResolver, DetailSource};
pub use feed::{FeedReader, FeedSource, parse_wanted};
pub use selectors::MediaExtractor;
