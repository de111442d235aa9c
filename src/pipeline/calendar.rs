// src/pipeline/calendar.rs

//! Calendar projection.
//!
//! Turns the dated records of a cache snapshot into calendar events inside a
//! window around today, then regenerates the whole iCalendar file.

use std::path::Path;

use chrono::{DateTime, FixedOffset, NaiveDate, TimeDelta, Utc};
use ical::generator::Emitter;
use ical::parser::ical::component::{IcalCalendar, IcalEvent};
use ical::property::Property;
use sha2::{Digest, Sha256};

use crate::error::{AppError, Result};
use crate::models::{CalendarConfig, CalendarEvent};
use crate::storage::MediaCache;
use crate::utils::fs::write_atomic;

const PRODID: &str = "-//media-calendar//release dates//EN";
const UID_DOMAIN: &str = "media-calendar";
const UTC_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Date window relative to "now" in the reference timezone.
#[derive(Debug, Clone, Copy)]
pub struct CalendarWindow {
    /// Current time in the reference timezone
    pub now: DateTime<FixedOffset>,
    /// How far back events are kept
    pub before: TimeDelta,
    /// How far ahead events are kept
    pub after: TimeDelta,
    /// Local hour each event starts at
    pub event_hour: u32,
}

impl CalendarWindow {
    /// Build the window from configuration at instant `now`.
    pub fn from_config(config: &CalendarConfig, now: DateTime<Utc>) -> Result<Self> {
        let offset = config.offset().ok_or_else(|| {
            AppError::config(format!(
                "invalid utc_offset_hours: {}",
                config.utc_offset_hours
            ))
        })?;
        let before = TimeDelta::try_days(config.days_before)
            .ok_or_else(|| AppError::config("calendar.days_before out of range"))?;
        let after = TimeDelta::try_days(config.days_after)
            .ok_or_else(|| AppError::config("calendar.days_after out of range"))?;

        Ok(Self {
            now: now.with_timezone(&offset),
            before,
            after,
            event_hour: config.event_hour,
        })
    }

    /// Whether `date` lies in `[today - before, today + after]`.
    pub fn contains(&self, date: NaiveDate) -> bool {
        let today = self.now.date_naive();
        let start = today.checked_sub_signed(self.before).unwrap_or(NaiveDate::MIN);
        let end = today.checked_add_signed(self.after).unwrap_or(NaiveDate::MAX);
        start <= date && date <= end
    }

    /// Event start for `date`: the configured local hour, in UTC.
    pub fn event_start(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        date.and_hms_opt(self.event_hour, 0, 0)?
            .and_local_timezone(*self.now.offset())
            .single()
            .map(|local| local.with_timezone(&Utc))
    }
}

/// Project dated cache records inside the window into events.
///
/// Events are ordered by start, then name.
pub fn project(cache: &MediaCache, window: &CalendarWindow) -> Vec<CalendarEvent> {
    let mut events: Vec<CalendarEvent> = cache
        .iter()
        .filter_map(|(link, record)| {
            let raw = record.release_date.as_deref()?;
            let Some(date) = record.parsed_date() else {
                log::warn!("Skipping '{}': invalid release date {:?}", record.name, raw);
                return None;
            };
            if !window.contains(date) {
                return None;
            }
            Some(CalendarEvent {
                link: link.to_string(),
                name: record.name.clone(),
                start: window.event_start(date)?,
            })
        })
        .collect();

    events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.name.cmp(&b.name)));
    events
}

/// Serialize events to an iCalendar document.
pub fn render(events: &[CalendarEvent], stamp: DateTime<Utc>) -> String {
    let mut calendar = IcalCalendar::new();
    calendar.properties.push(property("VERSION", "2.0"));
    calendar.properties.push(property("PRODID", PRODID));
    calendar.properties.push(property("CALSCALE", "GREGORIAN"));

    let stamp = stamp.format(UTC_FORMAT).to_string();
    for event in events {
        let mut ical_event = IcalEvent::new();
        ical_event.properties.push(property("UID", &event_uid(&event.link)));
        ical_event.properties.push(property("DTSTAMP", &stamp));
        ical_event
            .properties
            .push(property("DTSTART", &event.start.format(UTC_FORMAT).to_string()));
        ical_event
            .properties
            .push(property("SUMMARY", &escape_text(&event.name)));
        ical_event.properties.push(property("URL", &event.link));
        calendar.events.push(ical_event);
    }

    calendar.generate()
}

/// Regenerate the calendar file at `path` from `events`.
pub async fn write_calendar(
    path: &Path,
    events: &[CalendarEvent],
    stamp: DateTime<Utc>,
) -> Result<()> {
    let document = render(events, stamp);
    write_atomic(path, document.as_bytes()).await
}

/// Project `cache` and write the configured calendar file.
///
/// Returns the number of events written.
pub async fn run_calendar(
    config: &CalendarConfig,
    storage_dir: &Path,
    cache: &MediaCache,
    now: DateTime<Utc>,
) -> Result<usize> {
    let window = CalendarWindow::from_config(config, now)?;
    let events = project(cache, &window);
    let path = config.path(storage_dir);

    write_calendar(&path, &events, now).await?;
    log::info!("Wrote {} events to {}", events.len(), path.display());

    Ok(events.len())
}

fn property(name: &str, value: &str) -> Property {
    Property {
        name: name.to_string(),
        params: None,
        value: Some(value.to_string()),
    }
}

/// Stable UID for the event derived from its link.
fn event_uid(link: &str) -> String {
    let digest = Sha256::digest(link.as_bytes());
    format!("{}@{}", &hex::encode(digest)[..32], UID_DOMAIN)
}

/// Escape TEXT values for iCalendar.
fn escape_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace('\n', "\\n")
}
