use crate::domain::models::{CalendarEvent, UNTITLED_EVENT_TITLE};
use crate::infrastructure::error::InfraError;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq, Default)]
pub struct EventDateTime {
    #[serde(rename = "dateTime", skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(rename = "timeZone", skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq, Default)]
pub struct EventOrganizer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "displayName", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// One item of the upstream `events.list` payload.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct GoogleCalendarEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub start: EventDateTime,
    #[serde(default)]
    pub end: EventDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organizer: Option<EventOrganizer>,
    #[serde(rename = "htmlLink", skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
}

/// Normalizes an upstream item. All-day bounds (`date` only) are placed at
/// midnight of that date in `tz`.
pub fn to_calendar_event(event: &GoogleCalendarEvent, tz: &Tz) -> Result<CalendarEvent, InfraError> {
    let id = event
        .id
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| InfraError::InvalidEvent("event is missing id".to_string()))?;

    let (start, start_all_day) = resolve_bound(&event.start, tz, id, "start")?;
    let (end, _) = resolve_bound(&event.end, tz, id, "end")?;

    let title = event
        .summary
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(UNTITLED_EVENT_TITLE)
        .to_string();

    Ok(CalendarEvent {
        id: id.to_string(),
        title,
        start,
        end,
        all_day: start_all_day,
        organizer_email: event
            .organizer
            .as_ref()
            .and_then(|organizer| organizer.email.clone()),
        html_link: event.html_link.clone(),
    })
}

/// All-or-nothing: the first malformed item fails the whole batch.
pub fn to_calendar_events(
    events: &[GoogleCalendarEvent],
    tz: &Tz,
) -> Result<Vec<CalendarEvent>, InfraError> {
    events
        .iter()
        .map(|event| to_calendar_event(event, tz))
        .collect()
}

fn resolve_bound(
    value: &EventDateTime,
    tz: &Tz,
    event_id: &str,
    field_name: &str,
) -> Result<(DateTime<Utc>, bool), InfraError> {
    if let Some(raw) = value.date_time.as_deref() {
        let parsed = DateTime::parse_from_rfc3339(raw).map_err(|error| {
            InfraError::InvalidEvent(format!(
                "event {event_id} has invalid {field_name}.dateTime '{raw}': {error}"
            ))
        })?;
        return Ok((parsed.with_timezone(&Utc), false));
    }

    if let Some(raw) = value.date.as_deref() {
        let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|error| {
            InfraError::InvalidEvent(format!(
                "event {event_id} has invalid {field_name}.date '{raw}': {error}"
            ))
        })?;
        let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(|| {
            InfraError::InvalidEvent(format!("event {event_id} has no midnight on {raw}"))
        })?;
        let local = first_local_instant(tz, midnight).ok_or_else(|| {
            InfraError::InvalidEvent(format!(
                "event {event_id} {field_name}.date '{raw}' does not exist in {}",
                tz.name()
            ))
        })?;
        return Ok((local.with_timezone(&Utc), true));
    }

    Err(InfraError::InvalidEvent(format!(
        "event {event_id} has neither {field_name}.dateTime nor {field_name}.date"
    )))
}

/// `local` itself, or the first wall-clock minute after it that exists in
/// `tz` when `local` falls in a DST gap.
fn first_local_instant(tz: &Tz, local: NaiveDateTime) -> Option<DateTime<Tz>> {
    (0..=24 * 60)
        .map(|minutes| local + Duration::minutes(minutes))
        .find_map(|candidate| tz.from_local_datetime(&candidate).earliest())
}
