use crate::infrastructure::error::InfraError;
use crate::infrastructure::event_mapper::GoogleCalendarEvent;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use url::Url;

pub const DEFAULT_CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEventsRequest {
    pub time_min: DateTime<Utc>,
    pub max_results: u32,
    pub single_events: bool,
    pub order_by_start_time: bool,
}

impl ListEventsRequest {
    /// Concrete occurrences from `time_min` on, earliest first.
    pub fn chronological(time_min: DateTime<Utc>, max_results: u32) -> Self {
        Self {
            time_min,
            max_results,
            single_events: true,
            order_by_start_time: true,
        }
    }
}

#[async_trait]
pub trait GoogleCalendarClient: Send + Sync {
    /// Raw `events.list` body. Non-success statuses come back as
    /// `InfraError::Upstream` carrying the upstream body.
    async fn list_events_payload(
        &self,
        access_token: &str,
        calendar_id: &str,
        request: &ListEventsRequest,
    ) -> Result<serde_json::Value, InfraError>;

    async fn list_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        request: &ListEventsRequest,
    ) -> Result<Vec<GoogleCalendarEvent>, InfraError> {
        let payload = self
            .list_events_payload(access_token, calendar_id, request)
            .await?;
        parse_events_page(payload)
    }
}

#[derive(Debug, serde::Deserialize)]
struct EventsPageResponse {
    items: Option<Vec<GoogleCalendarEvent>>,
}

pub fn parse_events_page(payload: serde_json::Value) -> Result<Vec<GoogleCalendarEvent>, InfraError> {
    let parsed: EventsPageResponse = serde_json::from_value(payload)
        .map_err(|error| InfraError::InvalidEvent(format!("invalid events list payload: {error}")))?;
    Ok(parsed.items.unwrap_or_default())
}

#[derive(Debug, Clone)]
pub struct ReqwestGoogleCalendarClient {
    client: Client,
    api_base: String,
}

impl Default for ReqwestGoogleCalendarClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ReqwestGoogleCalendarClient {
    pub fn new() -> Self {
        Self::with_api_base(DEFAULT_CALENDAR_API_BASE)
    }

    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into(),
        }
    }

    fn ensure_non_empty(value: &str, field: &str) -> Result<(), InfraError> {
        if value.trim().is_empty() {
            return Err(InfraError::InvalidConfig(format!("{field} must not be empty")));
        }
        Ok(())
    }

    fn events_endpoint(&self, calendar_id: &str) -> Result<Url, InfraError> {
        let mut base = self.api_base.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let mut url = Url::parse(&base).map_err(|error| {
            InfraError::InvalidConfig(format!("invalid calendar api base url: {error}"))
        })?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                InfraError::InvalidConfig("calendar api base URL cannot be a base".to_string())
            })?;
            segments.pop_if_empty();
            segments.push("calendars");
            segments.push(calendar_id);
            segments.push("events");
        }
        Ok(url)
    }
}

#[async_trait]
impl GoogleCalendarClient for ReqwestGoogleCalendarClient {
    async fn list_events_payload(
        &self,
        access_token: &str,
        calendar_id: &str,
        request: &ListEventsRequest,
    ) -> Result<serde_json::Value, InfraError> {
        if access_token.trim().is_empty() {
            return Err(InfraError::MissingCredential);
        }
        Self::ensure_non_empty(calendar_id, "calendar id")?;

        let endpoint = self.events_endpoint(calendar_id)?;
        let mut req = self
            .client
            .get(endpoint)
            .bearer_auth(access_token)
            .query(&[
                ("maxResults", request.max_results.to_string()),
                (
                    "timeMin",
                    request.time_min.to_rfc3339_opts(SecondsFormat::Millis, true),
                ),
            ]);
        if request.single_events {
            req = req.query(&[("singleEvents", "true")]);
        }
        if request.order_by_start_time {
            req = req.query(&[("orderBy", "startTime")]);
        }

        let response = req.send().await.map_err(|error| {
            InfraError::Network(format!("network error while listing calendar events: {error}"))
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            InfraError::Network(format!("failed reading events list response: {error}"))
        })?;

        if !status.is_success() {
            return Err(InfraError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|error| {
            InfraError::InvalidEvent(format!("invalid events list payload: {error}; body={body}"))
        })
    }
}
