use std::time::Duration;

use chrono::{DateTime, Utc};
use icalendar::{Calendar, CalendarDateTime, Component, DatePerhapsTime, EventLike};
use tracing::warn;

use crate::limits::MAX_FEED_BODY_BYTES;
use crate::observability;

/// One external calendar to pull: where from, and the platform label
/// stamped onto everything it yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSource {
    pub url: String,
    pub label: String,
}

/// Normalized calendar event: one VEVENT with both endpoints present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEvent {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub title: String,
    pub source: String,
    pub uid: Option<String>,
}

#[derive(Debug)]
pub enum FeedError {
    Http(String),
    Status(u16),
    Parse(String),
    TooLarge(usize),
}

impl std::fmt::Display for FeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedError::Http(e) => write!(f, "http error: {e}"),
            FeedError::Status(code) => write!(f, "unexpected status: {code}"),
            FeedError::Parse(e) => write!(f, "calendar parse error: {e}"),
            FeedError::TooLarge(len) => write!(f, "feed body too large: {len} bytes"),
        }
    }
}

impl std::error::Error for FeedError {}

/// Fetches external iCal feeds and normalizes their events.
pub struct FeedNormalizer {
    client: reqwest::Client,
}

impl FeedNormalizer {
    pub fn new() -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| FeedError::Http(e.to_string()))?;
        Ok(Self { client })
    }

    /// Fetch and normalize every feed into one flat, unordered list.
    ///
    /// Feeds are independent: a non-success response or a malformed
    /// document skips that feed with a warning and a failure counter
    /// tick. The batch itself never fails.
    pub async fn fetch_all(&self, feeds: &[FeedSource]) -> Vec<FeedEvent> {
        let mut events = Vec::new();
        for feed in feeds {
            match self.fetch_one(feed).await {
                Ok(mut batch) => {
                    metrics::counter!(observability::FEED_EVENTS_TOTAL)
                        .increment(batch.len() as u64);
                    events.append(&mut batch);
                }
                Err(e) => {
                    warn!(source = %feed.label, url = %feed.url, "feed skipped: {e}");
                    metrics::counter!(observability::FEED_FAILURES_TOTAL).increment(1);
                }
            }
        }
        events
    }

    async fn fetch_one(&self, feed: &FeedSource) -> Result<Vec<FeedEvent>, FeedError> {
        let response = self
            .client
            .get(&feed.url)
            .send()
            .await
            .map_err(|e| FeedError::Http(e.to_string()))?;
        if !response.status().is_success() {
            return Err(FeedError::Status(response.status().as_u16()));
        }
        let body = response
            .text()
            .await
            .map_err(|e| FeedError::Http(e.to_string()))?;
        if body.len() > MAX_FEED_BODY_BYTES {
            return Err(FeedError::TooLarge(body.len()));
        }
        parse_feed(&body, &feed.label)
    }
}

/// Extract every VEVENT carrying both DTSTART and DTEND.
///
/// A missing SUMMARY falls back to `"Reservation {source}"`; events
/// without both endpoints are dropped rather than guessed at.
pub fn parse_feed(ics: &str, source: &str) -> Result<Vec<FeedEvent>, FeedError> {
    let calendar: Calendar = ics.parse().map_err(FeedError::Parse)?;

    let mut events = Vec::new();
    for component in &calendar.components {
        let Some(event) = component.as_event() else {
            continue;
        };
        let (Some(start), Some(end)) = (event.get_start(), event.get_end()) else {
            continue;
        };
        let (Some(start), Some(end)) = (to_utc(start), to_utc(end)) else {
            continue;
        };
        let title = event
            .get_summary()
            .map(str::to_owned)
            .unwrap_or_else(|| format!("Reservation {source}"));
        events.push(FeedEvent {
            start,
            end,
            title,
            source: source.to_owned(),
            uid: event.get_uid().map(str::to_owned),
        });
    }
    Ok(events)
}

/// All-day dates become midnight UTC; floating and zoned local times
/// are taken as UTC (rental feeds are date-granular in practice, and
/// resolving TZID tables is out of scope).
fn to_utc(value: DatePerhapsTime) -> Option<DateTime<Utc>> {
    match value {
        DatePerhapsTime::Date(d) => Some(d.and_hms_opt(0, 0, 0)?.and_utc()),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => Some(dt),
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(dt)) => Some(dt.and_utc()),
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, .. }) => {
            Some(date_time.and_utc())
        }
    }
}
