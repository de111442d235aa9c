//! Pipeline entry points for media calendar operations.
//!
//! - `run_update`: Ingest the feed, backfill undated records, save the cache
//! - `run_calendar`: Project the cache into the calendar file

pub mod calendar;
pub mod update;

pub use calendar::{CalendarWindow, project, render, run_calendar, write_calendar};
pub use update::{RunReport, RunState, UpdatePipeline, run_update, sample_links};
