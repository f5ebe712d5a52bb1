use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub organizer_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub venue: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub total_seats: i32,
    pub available_seats: i32,
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Seats already taken by tickets.
    pub fn booked_seats(&self) -> i32 {
        self.total_seats - self.available_seats
    }
}

/// Fields an organizer supplies when creating or updating an event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: String,
    pub venue: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub total_seats: i32,
}

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: i64,
    pub size: i64,
}

impl Page {
    /// Normalizes user-supplied paging values: non-positive page numbers
    /// become 1, non-positive sizes fall back to the default.
    pub fn new(number: i64, size: i64) -> Self {
        let number = if number <= 0 { 1 } else { number };
        let size = if size <= 0 {
            DEFAULT_PAGE_SIZE
        } else {
            size.min(MAX_PAGE_SIZE)
        };
        Self { number, size }
    }

    /// Builds a page only when the caller asked for one.
    pub fn from_query(number: Option<i64>, size: Option<i64>) -> Option<Self> {
        if number.is_none() && size.is_none() {
            return None;
        }
        Some(Self::new(number.unwrap_or(1), size.unwrap_or(DEFAULT_PAGE_SIZE)))
    }

    /// Rows to skip. Saturates for absurdly large page numbers, which then
    /// simply yield an empty page.
    pub fn offset(&self) -> i64 {
        (self.number - 1).saturating_mul(self.size)
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub keyword: Option<String>,
    pub category: Option<String>,
    pub starts_after: Option<DateTime<Utc>>,
    pub ends_before: Option<DateTime<Utc>>,
    pub page: Option<Page>,
}

impl EventFilter {
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(keyword) = self.keyword.as_deref().filter(|k| !k.is_empty()) {
            let keyword = keyword.to_lowercase();
            let in_title = event.title.to_lowercase().contains(&keyword);
            let in_description = event
                .description
                .as_deref()
                .map(|d| d.to_lowercase().contains(&keyword))
                .unwrap_or(false);
            if !in_title && !in_description {
                return false;
            }
        }
        if let Some(category) = self.category.as_deref().filter(|c| !c.is_empty()) {
            if event.category != category {
                return false;
            }
        }
        if let Some(start) = self.starts_after {
            if event.start_date < start {
                return false;
            }
        }
        if let Some(end) = self.ends_before {
            if event.end_date > end {
                return false;
            }
        }
        true
    }
}
