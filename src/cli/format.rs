use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};

use crate::domain::selection::SelectionStore;
use crate::infrastructure::config::AppConfig;

fn parse_span(raw: &str) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let (start, end) = raw
        .split_once('/')
        .ok_or_else(|| anyhow!("expected START/END, got {raw}"))?;
    let parse = |value: &str| {
        DateTime::parse_from_rfc3339(value.trim())
            .map(|parsed| parsed.with_timezone(&Utc))
            .with_context(|| format!("invalid RFC3339 timestamp: {value}"))
    };
    Ok((parse(start)?, parse(end)?))
}

/// Builds the text for `raw_spans` through a fresh store, so repeats
/// collapse and inverted spans are dropped.
pub fn render(config: &AppConfig, raw_spans: &[String]) -> Result<String> {
    let mut store = SelectionStore::default();
    for raw in raw_spans {
        let (start, end) = parse_span(raw)?;
        if store.add(start, end).is_none() {
            tracing::warn!(span = %raw, "skipping span with start >= end");
        }
    }
    Ok(store.text(&config.timezone))
}

pub fn run(config: &AppConfig, raw_spans: &[String]) -> Result<()> {
    println!("{}", render(config, raw_spans)?);
    Ok(())
}
