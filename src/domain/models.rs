use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title shown on every span the user marks on the grid.
pub const VIRTUAL_SPAN_TITLE: &str = "選択枠";

/// Title used for upstream events that carry no summary.
pub const UNTITLED_EVENT_TITLE: &str = "(タイトルなし)";

/// A read-only entry fetched from the upstream calendar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    pub organizer_email: Option<String>,
    pub html_link: Option<String>,
}

/// A user-created candidate free-time interval.
///
/// The id is always `span_key(start, end)`; two spans with the same bounds
/// are the same span.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VirtualSpan {
    pub id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl VirtualSpan {
    /// Builds a span at millisecond precision. Returns `None` unless
    /// `start < end` after truncation.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        let start = truncate_to_millis(start);
        let end = truncate_to_millis(end);
        if start >= end {
            return None;
        }
        Some(Self {
            id: span_key(start, end),
            title: VIRTUAL_SPAN_TITLE.to_string(),
            start,
            end,
        })
    }
}

/// Identity of a span: both bounds as epoch milliseconds.
///
/// Selection de-duplication and move-collapse rely on this being a pure
/// function of the bounds.
pub fn span_key(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    format!("{}-{}", start.timestamp_millis(), end.timestamp_millis())
}

pub fn truncate_to_millis(value: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(value.timestamp_millis()).unwrap_or(value)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OAuthToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub token_type: String,
    pub scope: Option<String>,
}

impl OAuthToken {
    pub fn is_valid_at(&self, now: DateTime<Utc>, leeway_seconds: i64) -> bool {
        !self.access_token.trim().is_empty()
            && self.expires_at > now + chrono::Duration::seconds(leeway_seconds)
    }
}
