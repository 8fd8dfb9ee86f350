use crate::application::session::CredentialProvider;
use crate::domain::models::CalendarEvent;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::event_mapper::to_calendar_events;
use crate::infrastructure::google_calendar_client::{GoogleCalendarClient, ListEventsRequest};
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::sync::Arc;

type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// What the calendar view shows about upstream events.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchState {
    #[default]
    Idle,
    Loading,
    Loaded {
        events: Vec<CalendarEvent>,
        fetched_at: DateTime<Utc>,
    },
    Failed {
        message: String,
    },
}

impl FetchState {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

/// Reads upstream events for the lookback window and normalizes them.
pub struct EventSource {
    client: Arc<dyn GoogleCalendarClient>,
    calendar_id: String,
    lookback_days: i64,
    max_results: u32,
    timezone: Tz,
    now_provider: NowProvider,
}

impl EventSource {
    pub fn new(
        client: Arc<dyn GoogleCalendarClient>,
        calendar_id: impl Into<String>,
        timezone: Tz,
    ) -> Self {
        Self {
            client,
            calendar_id: calendar_id.into(),
            lookback_days: 7,
            max_results: 100,
            timezone,
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_window(mut self, lookback_days: i64, max_results: u32) -> Self {
        self.lookback_days = lookback_days;
        self.max_results = max_results;
        self
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    fn now(&self) -> DateTime<Utc> {
        (self.now_provider)()
    }

    fn window_start(&self) -> Result<DateTime<Utc>, InfraError> {
        Duration::try_days(self.lookback_days)
            .and_then(|lookback| self.now().checked_sub_signed(lookback))
            .ok_or_else(|| {
                InfraError::InvalidConfig(format!(
                    "lookback of {} days is out of range",
                    self.lookback_days
                ))
            })
    }

    /// One request, no retry. Any failure (no credential, transport,
    /// status, malformed item) fails the whole fetch.
    pub async fn fetch_events(
        &self,
        provider: &dyn CredentialProvider,
    ) -> Result<Vec<CalendarEvent>, InfraError> {
        let access_token = provider
            .current_access_token()
            .await?
            .ok_or(InfraError::MissingCredential)?;

        let request = ListEventsRequest::chronological(self.window_start()?, self.max_results);
        let items = self
            .client
            .list_events(&access_token, &self.calendar_id, &request)
            .await?;
        let events = to_calendar_events(&items, &self.timezone)?;

        tracing::debug!(
            count = events.len(),
            calendar_id = %self.calendar_id,
            "fetched upstream events"
        );
        Ok(events)
    }

    /// Upstream body for the next `max_results` events from now.
    pub async fn fetch_upcoming_payload(
        &self,
        access_token: &str,
        max_results: u32,
    ) -> Result<serde_json::Value, InfraError> {
        let request = ListEventsRequest::chronological(self.now(), max_results);
        self.client
            .list_events_payload(access_token, &self.calendar_id, &request)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::session::StaticCredentialProvider;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeCalendarClient {
        payload: Mutex<Option<Result<serde_json::Value, u16>>>,
        requests: Mutex<Vec<(String, String, ListEventsRequest)>>,
    }

    impl FakeCalendarClient {
        fn returning(payload: serde_json::Value) -> Self {
            let client = Self::default();
            *client.payload.lock().expect("payload") = Some(Ok(payload));
            client
        }

        fn failing(status: u16) -> Self {
            let client = Self::default();
            *client.payload.lock().expect("payload") = Some(Err(status));
            client
        }
    }

    #[async_trait]
    impl GoogleCalendarClient for FakeCalendarClient {
        async fn list_events_payload(
            &self,
            access_token: &str,
            calendar_id: &str,
            request: &ListEventsRequest,
        ) -> Result<serde_json::Value, InfraError> {
            self.requests.lock().expect("requests").push((
                access_token.to_string(),
                calendar_id.to_string(),
                request.clone(),
            ));
            match self.payload.lock().expect("payload").clone() {
                Some(Ok(value)) => Ok(value),
                Some(Err(status)) => Err(InfraError::Upstream {
                    status,
                    body: String::new(),
                }),
                None => Ok(serde_json::json!({})),
            }
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-08-03T00:00:00Z")
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn source(client: Arc<FakeCalendarClient>) -> EventSource {
        EventSource::new(client, "primary", chrono_tz::Asia::Tokyo)
            .with_now_provider(Arc::new(fixed_now))
    }

    #[tokio::test]
    async fn fetch_requests_lookback_window_with_bearer() {
        let client = Arc::new(FakeCalendarClient::returning(serde_json::json!({
            "items": [
                {
                    "id": "evt-1",
                    "start": { "dateTime": "2025-08-03T09:00:00+09:00" },
                    "end": { "dateTime": "2025-08-03T10:00:00+09:00" }
                },
                {
                    "id": "evt-2",
                    "summary": "夏休み",
                    "start": { "date": "2025-08-11" },
                    "end": { "date": "2025-08-16" }
                }
            ]
        })));
        let provider = StaticCredentialProvider::new(Some("token".to_string()));

        let events = source(Arc::clone(&client))
            .fetch_events(&provider)
            .await
            .expect("fetch");

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].title, "(タイトルなし)");
        assert!(events[1].all_day);

        let requests = client.requests.lock().expect("requests");
        let (token, calendar_id, request) = &requests[0];
        assert_eq!(token, "token");
        assert_eq!(calendar_id, "primary");
        assert_eq!(request.time_min, fixed_now() - Duration::days(7));
        assert_eq!(request.max_results, 100);
        assert!(request.single_events && request.order_by_start_time);
    }

    #[tokio::test]
    async fn missing_credential_fails_without_request() {
        let client = Arc::new(FakeCalendarClient::default());
        let provider = StaticCredentialProvider::new(None);

        let result = source(Arc::clone(&client)).fetch_events(&provider).await;

        assert!(matches!(result, Err(InfraError::MissingCredential)));
        assert!(client.requests.lock().expect("requests").is_empty());
    }

    #[tokio::test]
    async fn upstream_failure_is_a_single_error() {
        let client = Arc::new(FakeCalendarClient::failing(503));
        let provider = StaticCredentialProvider::new(Some("token".to_string()));

        let result = source(client).fetch_events(&provider).await;
        assert!(matches!(result, Err(InfraError::Upstream { status: 503, .. })));
    }

    #[tokio::test]
    async fn one_malformed_item_discards_the_whole_batch() {
        let client = Arc::new(FakeCalendarClient::returning(serde_json::json!({
            "items": [
                {
                    "id": "ok",
                    "start": { "dateTime": "2025-08-03T09:00:00+09:00" },
                    "end": { "dateTime": "2025-08-03T10:00:00+09:00" }
                },
                { "id": "broken", "start": {}, "end": {} }
            ]
        })));
        let provider = StaticCredentialProvider::new(Some("token".to_string()));

        let result = source(client).fetch_events(&provider).await;
        assert!(matches!(result, Err(InfraError::InvalidEvent(_))));
    }

    #[tokio::test]
    async fn out_of_range_lookback_is_a_config_error() {
        let client = Arc::new(FakeCalendarClient::returning(serde_json::json!({"items": []})));
        let provider = StaticCredentialProvider::new(Some("token".to_string()));

        for lookback_days in [1_000_000_000_000, i64::MAX] {
            let result = source(Arc::clone(&client))
                .with_window(lookback_days, 100)
                .fetch_events(&provider)
                .await;
            assert!(matches!(result, Err(InfraError::InvalidConfig(_))));
        }
        assert!(client.requests.lock().expect("requests").is_empty());
    }

    #[tokio::test]
    async fn upcoming_payload_starts_now() {
        let client = Arc::new(FakeCalendarClient::returning(serde_json::json!({"items": []})));
        let payload = source(Arc::clone(&client))
            .fetch_upcoming_payload("token", 10)
            .await
            .expect("payload");

        assert_eq!(payload, serde_json::json!({"items": []}));
        let requests = client.requests.lock().expect("requests");
        assert_eq!(requests[0].2.time_min, fixed_now());
        assert_eq!(requests[0].2.max_results, 10);
    }

    #[test]
    fn fetch_state_serializes_with_status_tag() {
        let failed = FetchState::Failed {
            message: "Googleアクセストークンがありません".to_string(),
        };
        let value = serde_json::to_value(&failed).expect("serialize");
        assert_eq!(value["status"], "failed");
        assert_eq!(serde_json::to_value(FetchState::Loading).expect("serialize")["status"], "loading");
    }
}
