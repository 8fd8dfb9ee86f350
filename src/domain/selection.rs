use crate::domain::models::VirtualSpan;
use crate::domain::serializer::format_selection_text;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// In-memory set of the spans the user has marked, in insertion order.
///
/// Identity is `span_key(start, end)`. Adding bounds that already exist is a
/// no-op, and moving a span onto bounds held by another span collapses the
/// two into the existing entry; that merge-on-collision is the
/// de-duplication rule.
///
/// Any mutation clears the "copied" acknowledgment.
#[derive(Debug, Default, Clone)]
pub struct SelectionStore {
    spans: Vec<VirtualSpan>,
    copied: bool,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the span id, or `None` when `start >= end`.
    pub fn add(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Option<String> {
        let span = VirtualSpan::new(start, end)?;
        let id = span.id.clone();
        if !self.contains(&id) {
            self.spans.push(span);
            self.copied = false;
        }
        Some(id)
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.copied = false;
        let before = self.spans.len();
        self.spans.retain(|span| span.id != id);
        self.spans.len() != before
    }

    /// Rewrites the span `id` with new bounds and returns its new id.
    ///
    /// Stale ids and invalid bounds leave the store untouched and return `None`.
    pub fn move_span(
        &mut self,
        id: &str,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
    ) -> Option<String> {
        let position = self.spans.iter().position(|span| span.id == id)?;
        let moved = VirtualSpan::new(new_start, new_end)?;
        let new_id = moved.id.clone();

        let collides = self
            .spans
            .iter()
            .enumerate()
            .any(|(index, span)| index != position && span.id == new_id);
        if collides {
            self.spans.remove(position);
        } else {
            self.spans[position] = moved;
        }
        self.copied = false;
        Some(new_id)
    }

    pub fn reset(&mut self) {
        self.spans.clear();
        self.copied = false;
    }

    /// Current spans in insertion order. Callers that need chronological
    /// order go through the serializer.
    pub fn list(&self) -> &[VirtualSpan] {
        &self.spans
    }

    pub fn get(&self, id: &str) -> Option<&VirtualSpan> {
        self.spans.iter().find(|span| span.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn text(&self, tz: &Tz) -> String {
        format_selection_text(&self.spans, tz)
    }

    /// Sets the copied flag and returns the text to put on the clipboard.
    /// An empty selection has nothing to copy.
    pub fn mark_copied(&mut self, tz: &Tz) -> Option<String> {
        let text = self.text(tz);
        if text.is_empty() {
            return None;
        }
        self.copied = true;
        Some(text)
    }

    pub fn is_copied(&self) -> bool {
        self.copied
    }
}
