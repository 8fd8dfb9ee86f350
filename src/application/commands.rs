use crate::application::event_source::{EventSource, FetchState};
use crate::application::session::{CredentialProvider, LoginFlow, SessionManager, StaticCredentialProvider};
use crate::domain::models::VirtualSpan;
use crate::domain::selection::SelectionStore;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::credential_store::KeyringCredentialStore;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::google_calendar_client::{GoogleCalendarClient, ReqwestGoogleCalendarClient};
use crate::infrastructure::oauth_client::ReqwestOAuthClient;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

const BEARER_PREFIX: &str = "Bearer ";
const OAUTH_STATE_TTL_MINUTES: i64 = 10;
const MAX_PENDING_OAUTH_STATES: usize = 32;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id(prefix: &str) -> String {
    let sequence = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{}-{sequence}", Utc::now().timestamp_micros())
}

pub struct AppState {
    config: AppConfig,
    selection: Mutex<SelectionStore>,
    fetch_state: Mutex<FetchState>,
    credentials: Arc<dyn CredentialProvider>,
    login: Option<Arc<dyn LoginFlow>>,
    event_source: EventSource,
    pending_oauth_states: Mutex<PendingOAuthStates>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        credentials: Arc<dyn CredentialProvider>,
        login: Option<Arc<dyn LoginFlow>>,
        calendar_client: Arc<dyn GoogleCalendarClient>,
    ) -> Self {
        let event_source = EventSource::new(calendar_client, config.calendar_id.clone(), config.timezone)
            .with_window(config.lookback_days, config.max_results);
        Self {
            config,
            selection: Mutex::new(SelectionStore::default()),
            fetch_state: Mutex::new(FetchState::default()),
            credentials,
            login,
            event_source,
            pending_oauth_states: Mutex::new(PendingOAuthStates::default()),
        }
    }

    /// Wires the keychain-backed session when OAuth is configured; otherwise
    /// the given static token (if any) is the only credential.
    pub fn from_config(config: AppConfig, access_token: Option<String>) -> Self {
        let calendar_client: Arc<dyn GoogleCalendarClient> = Arc::new(
            ReqwestGoogleCalendarClient::with_api_base(config.calendar_api_base.clone()),
        );

        match (config.oauth.clone(), access_token) {
            (Some(oauth), None) => {
                let session = Arc::new(SessionManager::new(
                    oauth,
                    Arc::new(KeyringCredentialStore::default()),
                    Arc::new(ReqwestOAuthClient::new()),
                ));
                let credentials: Arc<dyn CredentialProvider> = session.clone();
                let login: Arc<dyn LoginFlow> = session;
                Self::new(config, credentials, Some(login), calendar_client)
            }
            (_, token) => Self::new(
                config,
                Arc::new(StaticCredentialProvider::new(token)),
                None,
                calendar_client,
            ),
        }
    }

    pub fn credentials(&self) -> &dyn CredentialProvider {
        self.credentials.as_ref()
    }
}

/// Login `state` values issued by this process, oldest first. Entries
/// expire after a few minutes and the oldest is evicted past the cap.
#[derive(Debug, Default)]
struct PendingOAuthStates {
    issued: VecDeque<(String, DateTime<Utc>)>,
}

impl PendingOAuthStates {
    fn insert(&mut self, oauth_state: String, now: DateTime<Utc>) {
        self.prune(now);
        while self.issued.len() >= MAX_PENDING_OAUTH_STATES {
            self.issued.pop_front();
        }
        self.issued.push_back((oauth_state, now));
    }

    fn take(&mut self, oauth_state: &str, now: DateTime<Utc>) -> bool {
        self.prune(now);
        match self.issued.iter().position(|(issued, _)| issued == oauth_state) {
            Some(index) => {
                self.issued.remove(index);
                true
            }
            None => false,
        }
    }

    fn prune(&mut self, now: DateTime<Utc>) {
        let cutoff = now - Duration::minutes(OAUTH_STATE_TTL_MINUTES);
        while self
            .issued
            .front()
            .is_some_and(|(_, issued_at)| *issued_at < cutoff)
        {
            self.issued.pop_front();
        }
    }

    fn len(&self) -> usize {
        self.issued.len()
    }
}

/// Marks the fetch as `Failed` if a refresh ends without recording its
/// outcome, e.g. the request was cancelled or the fetch panicked.
struct LoadingGuard<'a> {
    state: &'a AppState,
    settled: bool,
}

impl LoadingGuard<'_> {
    fn settle(mut self, next: FetchState) -> Result<(), InfraError> {
        *lock_fetch_state(self.state)? = next;
        self.settled = true;
        Ok(())
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        tracing::warn!("event fetch ended without a result");
        if let Ok(mut fetch_state) = self.state.fetch_state.lock() {
            *fetch_state = FetchState::Failed {
                message: "event fetch was interrupted".to_string(),
            };
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SelectionSnapshot {
    pub spans: Vec<VirtualSpan>,
    pub text: String,
    pub copied: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SpanMutationResponse {
    /// `None` when the span was rejected or the id was unknown.
    pub id: Option<String>,
    pub selection: SelectionSnapshot,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RemoveSpanResponse {
    pub removed: bool,
    pub selection: SelectionSnapshot,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CopySelectionResponse {
    pub text: String,
    pub copied: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LoginCompletedResponse {
    pub status: String,
    pub expires_at: String,
}

/// Upstream answer for the relay, forwarded as-is including error statuses.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

pub fn add_span_impl(
    state: &AppState,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<SpanMutationResponse, InfraError> {
    let mut selection = lock_selection(state)?;
    let id = selection.add(start, end);
    match &id {
        Some(id) => tracing::info!(%id, total = selection.len(), "added span"),
        None => tracing::warn!(%start, %end, "rejected span with start >= end"),
    }
    Ok(SpanMutationResponse {
        id,
        selection: snapshot(state, &selection),
    })
}

pub fn remove_span_impl(state: &AppState, span_id: &str) -> Result<RemoveSpanResponse, InfraError> {
    let mut selection = lock_selection(state)?;
    let removed = selection.remove(span_id);
    tracing::info!(id = span_id, removed, "removed span");
    Ok(RemoveSpanResponse {
        removed,
        selection: snapshot(state, &selection),
    })
}

pub fn move_span_impl(
    state: &AppState,
    span_id: &str,
    new_start: DateTime<Utc>,
    new_end: DateTime<Utc>,
) -> Result<SpanMutationResponse, InfraError> {
    let mut selection = lock_selection(state)?;
    let id = selection.move_span(span_id, new_start, new_end);
    match &id {
        Some(new_id) => tracing::info!(from = span_id, to = %new_id, "moved span"),
        None => tracing::warn!(id = span_id, %new_start, %new_end, "ignored move"),
    }
    Ok(SpanMutationResponse {
        id,
        selection: snapshot(state, &selection),
    })
}

pub fn reset_selection_impl(state: &AppState) -> Result<SelectionSnapshot, InfraError> {
    let mut selection = lock_selection(state)?;
    let cleared = selection.len();
    selection.reset();
    tracing::info!(cleared, "reset selection");
    Ok(snapshot(state, &selection))
}

pub fn selection_snapshot_impl(state: &AppState) -> Result<SelectionSnapshot, InfraError> {
    let selection = lock_selection(state)?;
    Ok(snapshot(state, &selection))
}

pub fn copy_selection_impl(state: &AppState) -> Result<CopySelectionResponse, InfraError> {
    let mut selection = lock_selection(state)?;
    match selection.mark_copied(&state.config.timezone) {
        Some(text) => {
            tracing::info!(spans = selection.len(), "copied selection text");
            Ok(CopySelectionResponse { text, copied: true })
        }
        None => Ok(CopySelectionResponse {
            text: String::new(),
            copied: false,
        }),
    }
}

/// Runs one upstream fetch. A second trigger while one is outstanding is
/// rejected rather than queued.
pub async fn refresh_events_impl(state: &AppState) -> Result<FetchState, InfraError> {
    {
        let mut fetch_state = lock_fetch_state(state)?;
        if fetch_state.is_loading() {
            return Err(InfraError::FetchInProgress);
        }
        *fetch_state = FetchState::Loading;
    }
    let guard = LoadingGuard {
        state,
        settled: false,
    };

    let next = match state.event_source.fetch_events(state.credentials()).await {
        Ok(events) => {
            tracing::info!(count = events.len(), "loaded upstream events");
            FetchState::Loaded {
                events,
                fetched_at: Utc::now(),
            }
        }
        Err(error) => {
            tracing::error!(%error, "event fetch failed");
            FetchState::Failed {
                message: error.to_string(),
            }
        }
    };

    guard.settle(next.clone())?;
    Ok(next)
}

pub fn events_snapshot_impl(state: &AppState) -> Result<FetchState, InfraError> {
    Ok(lock_fetch_state(state)?.clone())
}

pub fn begin_login_impl(state: &AppState) -> Result<String, InfraError> {
    let login = login_flow(state)?;
    let oauth_state = next_id("oauth-state");
    let url = login.authorization_url(&oauth_state)?;
    let pending = {
        let mut pending_states = lock_pending_states(state)?;
        pending_states.insert(oauth_state, Utc::now());
        pending_states.len()
    };
    tracing::info!(pending, "issued google authorization url");
    Ok(url)
}

pub async fn complete_login_impl(
    state: &AppState,
    code: &str,
    oauth_state: &str,
) -> Result<LoginCompletedResponse, InfraError> {
    let login = login_flow(state)?;
    let code = code.trim();
    if code.is_empty() {
        return Err(InfraError::InvalidConfig("code must not be empty".to_string()));
    }
    let issued_here = lock_pending_states(state)?.take(oauth_state, Utc::now());
    if !issued_here {
        tracing::warn!("rejected oauth callback with unknown state");
        return Err(InfraError::OAuth("unknown or reused oauth state".to_string()));
    }

    let token = login.exchange_code(code).await?;
    tracing::info!(expires_at = %token.expires_at, "stored google session");
    Ok(LoginCompletedResponse {
        status: "authenticated".to_string(),
        expires_at: token.expires_at.to_rfc3339(),
    })
}

pub fn sign_out_impl(state: &AppState) -> Result<(), InfraError> {
    login_flow(state)?.forget_session()?;
    tracing::info!("removed stored google session");
    Ok(())
}

/// Proxies the next upcoming events using the caller's own bearer token.
pub async fn relay_upcoming_impl(
    state: &AppState,
    authorization_header: Option<&str>,
) -> Result<RelayResponse, InfraError> {
    let access_token = bearer_token(authorization_header)?;
    let result = state
        .event_source
        .fetch_upcoming_payload(access_token, state.config.relay_max_results)
        .await;

    match result {
        Ok(body) => Ok(RelayResponse { status: 200, body }),
        Err(InfraError::Upstream { status, body }) => {
            tracing::warn!(status, "relaying upstream error");
            let body: serde_json::Value = serde_json::from_str(&body)
                .unwrap_or_else(|_| serde_json::json!({ "error": body }));
            Ok(RelayResponse { status, body })
        }
        Err(error) => Err(error),
    }
}

fn bearer_token(authorization_header: Option<&str>) -> Result<&str, InfraError> {
    let header = authorization_header
        .ok_or_else(|| InfraError::Unauthorized("No access token".to_string()))?;
    let token = header
        .strip_prefix(BEARER_PREFIX)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| InfraError::Unauthorized("No access token".to_string()))?;
    Ok(token)
}

fn login_flow(state: &AppState) -> Result<&Arc<dyn LoginFlow>, InfraError> {
    state
        .login
        .as_ref()
        .ok_or_else(|| InfraError::Unauthorized("google oauth is not configured".to_string()))
}

fn snapshot(state: &AppState, selection: &SelectionStore) -> SelectionSnapshot {
    SelectionSnapshot {
        spans: selection.list().to_vec(),
        text: selection.text(&state.config.timezone),
        copied: selection.is_copied(),
    }
}

fn lock_selection(state: &AppState) -> Result<MutexGuard<'_, SelectionStore>, InfraError> {
    state
        .selection
        .lock()
        .map_err(|error| InfraError::InvalidConfig(format!("selection lock poisoned: {error}")))
}

fn lock_fetch_state(state: &AppState) -> Result<MutexGuard<'_, FetchState>, InfraError> {
    state
        .fetch_state
        .lock()
        .map_err(|error| InfraError::InvalidConfig(format!("fetch state lock poisoned: {error}")))
}

fn lock_pending_states(state: &AppState) -> Result<MutexGuard<'_, PendingOAuthStates>, InfraError> {
    state
        .pending_oauth_states
        .lock()
        .map_err(|error| InfraError::InvalidConfig(format!("oauth state lock poisoned: {error}")))
}
