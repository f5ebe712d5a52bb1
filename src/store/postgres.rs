use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use super::{Store, StoreResult, UnitOfWork};
use crate::models::{Event, EventFilter, Review, ReviewView, Ticket, TicketScope, TicketView, User};
use crate::services::scheduling::TimeWindow;

const EVENT_COLUMNS: &str = "id, organizer_id, title, description, category, venue, \
     start_date, end_date, total_seats, available_seats, created_at";

const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at";

const TICKET_COLUMNS: &str = "id, event_id, user_id, quantity, total_price, booking_date";

const REVIEW_COLUMNS: &str = "id, event_id, user_id, rating, comment, created_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }
}

pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

/// Escapes LIKE metacharacters so user keywords match literally.
fn like_pattern(keyword: &str) -> String {
    let escaped = keyword
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn find_user(&mut self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(user)
    }

    async fn insert_user(&mut self, user: &User) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, role, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(user.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn count_users(&mut self) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(count)
    }

    async fn find_event(&mut self, id: Uuid) -> StoreResult<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(event)
    }

    async fn find_event_for_update(&mut self, id: Uuid) -> StoreResult<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(event)
    }

    async fn list_events(&mut self, filter: &EventFilter) -> StoreResult<Vec<Event>> {
        let mut query =
            QueryBuilder::<Postgres>::new(format!("SELECT {EVENT_COLUMNS} FROM events WHERE TRUE"));

        if let Some(keyword) = filter.keyword.as_deref().filter(|k| !k.is_empty()) {
            let pattern = like_pattern(keyword);
            query
                .push(" AND (title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(category) = filter.category.as_deref().filter(|c| !c.is_empty()) {
            query.push(" AND category = ").push_bind(category.to_string());
        }
        if let Some(start) = filter.starts_after {
            query.push(" AND start_date >= ").push_bind(start);
        }
        if let Some(end) = filter.ends_before {
            query.push(" AND end_date <= ").push_bind(end);
        }

        query.push(" ORDER BY start_date, created_at");

        if let Some(page) = filter.page {
            query
                .push(" LIMIT ")
                .push_bind(page.size)
                .push(" OFFSET ")
                .push_bind(page.offset());
        }

        let events = query
            .build_query_as::<Event>()
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(events)
    }

    async fn events_by_organizer(&mut self, organizer_id: Uuid) -> StoreResult<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE organizer_id = $1 ORDER BY start_date"
        ))
        .bind(organizer_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(events)
    }

    async fn count_events(&mut self) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events")
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(count)
    }

    async fn lock_venue(&mut self, venue: &str) -> StoreResult<()> {
        // released automatically at commit or rollback
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(venue)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn has_overlap(
        &mut self,
        exclude: Option<Uuid>,
        venue: &str,
        window: TimeWindow,
    ) -> StoreResult<bool> {
        let overlap: bool = sqlx::query_scalar(
            "SELECT EXISTS ( \
                SELECT 1 FROM events \
                WHERE venue = $1 \
                  AND ($2::uuid IS NULL OR id <> $2) \
                  AND start_date <= $4 \
                  AND $3 <= end_date \
             )",
        )
        .bind(venue)
        .bind(exclude)
        .bind(window.start)
        .bind(window.end)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(overlap)
    }

    async fn popular_events(&mut self, limit: i64) -> StoreResult<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events \
             ORDER BY (total_seats - available_seats) DESC, created_at \
             LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(events)
    }

    async fn insert_event(&mut self, event: &Event) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO events (id, organizer_id, title, description, category, venue, \
             start_date, end_date, total_seats, available_seats, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(event.id)
        .bind(event.organizer_id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.category)
        .bind(&event.venue)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(event.total_seats)
        .bind(event.available_seats)
        .bind(event.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_event(&mut self, event: &Event) -> StoreResult<()> {
        sqlx::query(
            "UPDATE events SET title = $2, description = $3, category = $4, venue = $5, \
             start_date = $6, end_date = $7, total_seats = $8, available_seats = $9 \
             WHERE id = $1",
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.category)
        .bind(&event.venue)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(event.total_seats)
        .bind(event.available_seats)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn delete_event(&mut self, id: Uuid) -> StoreResult<bool> {
        // tickets and reviews go with it through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_available_seats(&mut self, event_id: Uuid, seats: i32) -> StoreResult<()> {
        sqlx::query("UPDATE events SET available_seats = $2 WHERE id = $1")
            .bind(event_id)
            .bind(seats)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn find_ticket_for_holder(
        &mut self,
        ticket_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Ticket>> {
        let ticket = sqlx::query_as::<_, Ticket>(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1 AND user_id = $2"
        ))
        .bind(ticket_id)
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(ticket)
    }

    async fn has_ticket(&mut self, user_id: Uuid, event_id: Uuid) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM tickets WHERE user_id = $1 AND event_id = $2)",
        )
        .bind(user_id)
        .bind(event_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(exists)
    }

    async fn insert_ticket(&mut self, ticket: &Ticket) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO tickets (id, event_id, user_id, quantity, total_price, booking_date) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(ticket.id)
        .bind(ticket.event_id)
        .bind(ticket.user_id)
        .bind(ticket.quantity)
        .bind(ticket.total_price)
        .bind(ticket.booking_date)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn delete_ticket(&mut self, id: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM tickets WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn ticket_views(&mut self, scope: TicketScope) -> StoreResult<Vec<TicketView>> {
        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT t.id, t.event_id, e.title AS event_title, t.user_id, u.name AS user_name, \
             t.quantity, t.total_price, t.booking_date \
             FROM tickets t \
             JOIN events e ON e.id = t.event_id \
             JOIN users u ON u.id = t.user_id",
        );
        match scope {
            TicketScope::All => {}
            TicketScope::Holder(user_id) => {
                query.push(" WHERE t.user_id = ").push_bind(user_id);
            }
            TicketScope::Organizer(organizer_id) => {
                query.push(" WHERE e.organizer_id = ").push_bind(organizer_id);
            }
        }
        query.push(" ORDER BY t.booking_date DESC");

        let tickets = query
            .build_query_as::<TicketView>()
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(tickets)
    }

    async fn list_tickets(&mut self, event_ids: Option<&[Uuid]>) -> StoreResult<Vec<Ticket>> {
        let tickets = match event_ids {
            Some(ids) => {
                sqlx::query_as::<_, Ticket>(&format!(
                    "SELECT {TICKET_COLUMNS} FROM tickets WHERE event_id = ANY($1)"
                ))
                .bind(ids)
                .fetch_all(&mut *self.tx)
                .await?
            }
            None => {
                sqlx::query_as::<_, Ticket>(&format!("SELECT {TICKET_COLUMNS} FROM tickets"))
                    .fetch_all(&mut *self.tx)
                    .await?
            }
        };
        Ok(tickets)
    }

    async fn has_review(&mut self, user_id: Uuid, event_id: Uuid) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM reviews WHERE user_id = $1 AND event_id = $2)",
        )
        .bind(user_id)
        .bind(event_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(exists)
    }

    async fn insert_review(&mut self, review: &Review) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO reviews (id, event_id, user_id, rating, comment, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(review.id)
        .bind(review.event_id)
        .bind(review.user_id)
        .bind(review.rating)
        .bind(&review.comment)
        .bind(review.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn review_views(&mut self, event_id: Uuid) -> StoreResult<Vec<ReviewView>> {
        let reviews = sqlx::query_as::<_, ReviewView>(
            "SELECT r.id, r.event_id, r.rating, r.comment, u.name AS user_name, r.created_at \
             FROM reviews r JOIN users u ON u.id = r.user_id \
             WHERE r.event_id = $1 \
             ORDER BY r.created_at",
        )
        .bind(event_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(reviews)
    }

    async fn list_reviews(&mut self, event_ids: Option<&[Uuid]>) -> StoreResult<Vec<Review>> {
        let reviews = match event_ids {
            Some(ids) => {
                sqlx::query_as::<_, Review>(&format!(
                    "SELECT {REVIEW_COLUMNS} FROM reviews WHERE event_id = ANY($1)"
                ))
                .bind(ids)
                .fetch_all(&mut *self.tx)
                .await?
            }
            None => {
                sqlx::query_as::<_, Review>(&format!("SELECT {REVIEW_COLUMNS} FROM reviews"))
                    .fetch_all(&mut *self.tx)
                    .await?
            }
        };
        Ok(reviews)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("jazz"), "%jazz%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
    }
}
