use chrono::{DateTime, Utc};

use crate::models::Event;

/// A closed `[start, end]` interval at a venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn of(event: &Event) -> Self {
        Self::new(event.start_date, event.end_date)
    }

    /// Boundaries are inclusive: windows that merely touch still conflict.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// Whether `window` at `venue` collides with any of `events`, ignoring the
/// event identified by `exclude` (the one being re-saved).
pub fn conflicts_with<'a>(
    events: impl IntoIterator<Item = &'a Event>,
    exclude: Option<uuid::Uuid>,
    venue: &str,
    window: TimeWindow,
) -> bool {
    events.into_iter().any(|event| {
        Some(event.id) != exclude && event.venue == venue && TimeWindow::of(event).overlaps(&window)
    })
}
