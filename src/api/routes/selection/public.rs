//! Public types for the selection API
use chrono::{DateTime, Utc};
use serde::Deserialize;

pub use crate::application::commands::{
    CopySelectionResponse, RemoveSpanResponse, SelectionSnapshot, SpanMutationResponse,
};

/// Bounds of a span as RFC3339 timestamps.
#[derive(Debug, Deserialize)]
pub struct SpanRequest {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}
