//! Persistence gateway.
//!
//! Services never talk to a database directly. They open a [`UnitOfWork`]
//! through a [`Store`], run their reads and writes against it and then
//! either [`UnitOfWork::commit`] or [`UnitOfWork::rollback`]. Dropping a unit
//! of work without committing discards everything it did.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Event, EventFilter, Review, ReviewView, Ticket, TicketScope, TicketView, User};
use crate::services::scheduling::TimeWindow;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("exclusion constraint violated: {0}")]
    ExclusionViolation(String),

    #[error("database error")]
    Database(#[source] sqlx::Error),
}

const UNIQUE_VIOLATION: &str = "23505";
const EXCLUSION_VIOLATION: &str = "23P01";

impl StoreError {
    /// Maps a Postgres SQLSTATE to the constraint violation it signals.
    fn constraint_violation(code: &str, constraint: &str) -> Option<Self> {
        match code {
            UNIQUE_VIOLATION => Some(StoreError::UniqueViolation(constraint.to_string())),
            EXCLUSION_VIOLATION => Some(StoreError::ExclusionViolation(constraint.to_string())),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        err.as_database_error()
            .and_then(|db| {
                let code = db.code()?;
                Self::constraint_violation(&code, db.constraint().unwrap_or("unknown"))
            })
            .unwrap_or_else(|| StoreError::Database(err))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>>;
}

/// One transaction's worth of access to users, events, tickets and reviews.
#[async_trait]
pub trait UnitOfWork: Send {
    // users
    async fn find_user(&mut self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>>;
    async fn insert_user(&mut self, user: &User) -> StoreResult<()>;
    async fn count_users(&mut self) -> StoreResult<i64>;

    // events
    async fn find_event(&mut self, id: Uuid) -> StoreResult<Option<Event>>;
    /// Like [`UnitOfWork::find_event`] but holds the row against concurrent
    /// writers until this unit of work ends.
    async fn find_event_for_update(&mut self, id: Uuid) -> StoreResult<Option<Event>>;
    async fn list_events(&mut self, filter: &EventFilter) -> StoreResult<Vec<Event>>;
    async fn events_by_organizer(&mut self, organizer_id: Uuid) -> StoreResult<Vec<Event>>;
    async fn count_events(&mut self) -> StoreResult<i64>;
    /// Serializes scheduling at `venue` until this unit of work ends. Call
    /// before [`UnitOfWork::has_overlap`] when the result decides a write.
    async fn lock_venue(&mut self, venue: &str) -> StoreResult<()>;
    async fn has_overlap(
        &mut self,
        exclude: Option<Uuid>,
        venue: &str,
        window: TimeWindow,
    ) -> StoreResult<bool>;
    async fn popular_events(&mut self, limit: i64) -> StoreResult<Vec<Event>>;
    async fn insert_event(&mut self, event: &Event) -> StoreResult<()>;
    async fn update_event(&mut self, event: &Event) -> StoreResult<()>;
    /// Removes the event together with its tickets and reviews.
    async fn delete_event(&mut self, id: Uuid) -> StoreResult<bool>;
    async fn set_available_seats(&mut self, event_id: Uuid, seats: i32) -> StoreResult<()>;

    // tickets
    async fn find_ticket_for_holder(
        &mut self,
        ticket_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Ticket>>;
    async fn has_ticket(&mut self, user_id: Uuid, event_id: Uuid) -> StoreResult<bool>;
    async fn insert_ticket(&mut self, ticket: &Ticket) -> StoreResult<()>;
    async fn delete_ticket(&mut self, id: Uuid) -> StoreResult<()>;
    async fn ticket_views(&mut self, scope: TicketScope) -> StoreResult<Vec<TicketView>>;
    /// All tickets, or only those belonging to `event_ids` when given.
    async fn list_tickets(&mut self, event_ids: Option<&[Uuid]>) -> StoreResult<Vec<Ticket>>;

    // reviews
    async fn has_review(&mut self, user_id: Uuid, event_id: Uuid) -> StoreResult<bool>;
    async fn insert_review(&mut self, review: &Review) -> StoreResult<()>;
    async fn review_views(&mut self, event_id: Uuid) -> StoreResult<Vec<ReviewView>>;
    async fn list_reviews(&mut self, event_ids: Option<&[Uuid]>) -> StoreResult<Vec<Review>>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_violations_are_recognized() {
        assert!(matches!(
            StoreError::constraint_violation("23505", "users_email_key"),
            Some(StoreError::UniqueViolation(c)) if c == "users_email_key"
        ));
        assert!(matches!(
            StoreError::constraint_violation("23P01", "events_venue_no_overlap"),
            Some(StoreError::ExclusionViolation(c)) if c == "events_venue_no_overlap"
        ));
        assert!(StoreError::constraint_violation("40001", "x").is_none());
    }
}
