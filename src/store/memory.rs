use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{Store, StoreError, StoreResult, UnitOfWork};
use crate::models::{Event, EventFilter, Review, ReviewView, Ticket, TicketScope, TicketView, User};
use crate::services::scheduling::{conflicts_with, TimeWindow};

#[derive(Debug, Clone, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    events: HashMap<Uuid, Event>,
    tickets: HashMap<Uuid, Ticket>,
    reviews: HashMap<Uuid, Review>,
}

/// In-process store. Units of work run one at a time: each takes the table
/// lock for its whole lifetime and works on a private copy that only
/// replaces the shared tables on commit.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let guard = self.tables.clone().lock_owned().await;
        let working = (*guard).clone();
        Ok(Box::new(MemoryUnitOfWork { guard, working }))
    }
}

pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

impl MemoryUnitOfWork {
    fn user_name(&self, user_id: Uuid) -> String {
        self.working
            .users
            .get(&user_id)
            .map(|u| u.name.clone())
            .unwrap_or_default()
    }

    fn sorted_events(&self, mut events: Vec<Event>) -> Vec<Event> {
        events.sort_by(|a, b| {
            a.start_date
                .cmp(&b.start_date)
                .then(a.created_at.cmp(&b.created_at))
        });
        events
    }
}

fn in_scope(event_ids: Option<&[Uuid]>, event_id: &Uuid) -> bool {
    event_ids.map(|ids| ids.contains(event_id)).unwrap_or(true)
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn find_user(&mut self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.working.users.get(&id).cloned())
    }

    async fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .working
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn insert_user(&mut self, user: &User) -> StoreResult<()> {
        if self.working.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::UniqueViolation("users_email_key".to_string()));
        }
        self.working.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn count_users(&mut self) -> StoreResult<i64> {
        Ok(self.working.users.len() as i64)
    }

    async fn find_event(&mut self, id: Uuid) -> StoreResult<Option<Event>> {
        Ok(self.working.events.get(&id).cloned())
    }

    async fn find_event_for_update(&mut self, id: Uuid) -> StoreResult<Option<Event>> {
        // the whole store is already held by this unit of work
        self.find_event(id).await
    }

    async fn list_events(&mut self, filter: &EventFilter) -> StoreResult<Vec<Event>> {
        let matching = self
            .working
            .events
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        let events = self.sorted_events(matching);

        Ok(match filter.page {
            Some(page) => events
                .into_iter()
                .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
                .take(usize::try_from(page.size).unwrap_or(0))
                .collect(),
            None => events,
        })
    }

    async fn events_by_organizer(&mut self, organizer_id: Uuid) -> StoreResult<Vec<Event>> {
        let owned = self
            .working
            .events
            .values()
            .filter(|e| e.organizer_id == organizer_id)
            .cloned()
            .collect();
        Ok(self.sorted_events(owned))
    }

    async fn count_events(&mut self) -> StoreResult<i64> {
        Ok(self.working.events.len() as i64)
    }

    async fn lock_venue(&mut self, _venue: &str) -> StoreResult<()> {
        // the whole store is already held by this unit of work
        Ok(())
    }

    async fn has_overlap(
        &mut self,
        exclude: Option<Uuid>,
        venue: &str,
        window: TimeWindow,
    ) -> StoreResult<bool> {
        Ok(conflicts_with(
            self.working.events.values(),
            exclude,
            venue,
            window,
        ))
    }

    async fn popular_events(&mut self, limit: i64) -> StoreResult<Vec<Event>> {
        let mut events: Vec<Event> = self.working.events.values().cloned().collect();
        events.sort_by(|a, b| {
            b.booked_seats()
                .cmp(&a.booked_seats())
                .then(a.created_at.cmp(&b.created_at))
        });
        events.truncate(limit.max(0) as usize);
        Ok(events)
    }

    async fn insert_event(&mut self, event: &Event) -> StoreResult<()> {
        self.working.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn update_event(&mut self, event: &Event) -> StoreResult<()> {
        if let Some(existing) = self.working.events.get_mut(&event.id) {
            *existing = event.clone();
        }
        Ok(())
    }

    async fn delete_event(&mut self, id: Uuid) -> StoreResult<bool> {
        let removed = self.working.events.remove(&id).is_some();
        if removed {
            self.working.tickets.retain(|_, t| t.event_id != id);
            self.working.reviews.retain(|_, r| r.event_id != id);
        }
        Ok(removed)
    }

    async fn set_available_seats(&mut self, event_id: Uuid, seats: i32) -> StoreResult<()> {
        if let Some(event) = self.working.events.get_mut(&event_id) {
            event.available_seats = seats;
        }
        Ok(())
    }

    async fn find_ticket_for_holder(
        &mut self,
        ticket_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Ticket>> {
        Ok(self
            .working
            .tickets
            .get(&ticket_id)
            .filter(|t| t.user_id == user_id)
            .cloned())
    }

    async fn has_ticket(&mut self, user_id: Uuid, event_id: Uuid) -> StoreResult<bool> {
        Ok(self
            .working
            .tickets
            .values()
            .any(|t| t.user_id == user_id && t.event_id == event_id))
    }

    async fn insert_ticket(&mut self, ticket: &Ticket) -> StoreResult<()> {
        let duplicate = self
            .working
            .tickets
            .values()
            .any(|t| t.user_id == ticket.user_id && t.event_id == ticket.event_id);
        if duplicate {
            return Err(StoreError::UniqueViolation(
                "tickets_event_id_user_id_key".to_string(),
            ));
        }
        self.working.tickets.insert(ticket.id, ticket.clone());
        Ok(())
    }

    async fn delete_ticket(&mut self, id: Uuid) -> StoreResult<()> {
        self.working.tickets.remove(&id);
        Ok(())
    }

    async fn ticket_views(&mut self, scope: TicketScope) -> StoreResult<Vec<TicketView>> {
        let mut views: Vec<TicketView> = self
            .working
            .tickets
            .values()
            .filter_map(|ticket| {
                let event = self.working.events.get(&ticket.event_id)?;
                let visible = match scope {
                    TicketScope::All => true,
                    TicketScope::Holder(user_id) => ticket.user_id == user_id,
                    TicketScope::Organizer(organizer_id) => event.organizer_id == organizer_id,
                };
                visible.then(|| TicketView {
                    id: ticket.id,
                    event_id: ticket.event_id,
                    event_title: event.title.clone(),
                    user_id: ticket.user_id,
                    user_name: self.user_name(ticket.user_id),
                    quantity: ticket.quantity,
                    total_price: ticket.total_price,
                    booking_date: ticket.booking_date,
                })
            })
            .collect();
        views.sort_by(|a, b| b.booking_date.cmp(&a.booking_date));
        Ok(views)
    }

    async fn list_tickets(&mut self, event_ids: Option<&[Uuid]>) -> StoreResult<Vec<Ticket>> {
        Ok(self
            .working
            .tickets
            .values()
            .filter(|t| in_scope(event_ids, &t.event_id))
            .cloned()
            .collect())
    }

    async fn has_review(&mut self, user_id: Uuid, event_id: Uuid) -> StoreResult<bool> {
        Ok(self
            .working
            .reviews
            .values()
            .any(|r| r.user_id == user_id && r.event_id == event_id))
    }

    async fn insert_review(&mut self, review: &Review) -> StoreResult<()> {
        let duplicate = self
            .working
            .reviews
            .values()
            .any(|r| r.user_id == review.user_id && r.event_id == review.event_id);
        if duplicate {
            return Err(StoreError::UniqueViolation(
                "reviews_event_id_user_id_key".to_string(),
            ));
        }
        self.working.reviews.insert(review.id, review.clone());
        Ok(())
    }

    async fn review_views(&mut self, event_id: Uuid) -> StoreResult<Vec<ReviewView>> {
        let mut views: Vec<ReviewView> = self
            .working
            .reviews
            .values()
            .filter(|r| r.event_id == event_id)
            .map(|r| ReviewView {
                id: r.id,
                event_id: r.event_id,
                rating: r.rating,
                comment: r.comment.clone(),
                user_name: self.user_name(r.user_id),
                created_at: r.created_at,
            })
            .collect();
        views.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(views)
    }

    async fn list_reviews(&mut self, event_ids: Option<&[Uuid]>) -> StoreResult<Vec<Review>> {
        Ok(self
            .working
            .reviews
            .values()
            .filter(|r| in_scope(event_ids, &r.event_id))
            .cloned()
            .collect())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryUnitOfWork { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}
