//! Ticket booking and cancellation.
//!
//! Both operations run inside a single unit of work: the seat counter on the
//! event and the ticket row change together or not at all. The event row is
//! loaded with [`UnitOfWork::find_event_for_update`] so two bookings for the
//! same event cannot both pass the availability check.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::abandon;
use crate::clock::Clock;
use crate::models::{Ticket, TicketScope, TicketView};
use crate::store::{Store, UnitOfWork};
use crate::utils::{AppError, AppResult};

#[derive(Clone)]
pub struct TicketService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    unit_price: Decimal,
}

impl TicketService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, unit_price: Decimal) -> Self {
        Self {
            store,
            clock,
            unit_price,
        }
    }

    pub async fn book(&self, event_id: Uuid, user_id: Uuid, quantity: i32) -> AppResult<Ticket> {
        let mut uow = self.store.begin().await?;

        match self.reserve(uow.as_mut(), event_id, user_id, quantity).await {
            Ok(ticket) => {
                uow.commit().await?;
                info!(
                    ticket_id = %ticket.id,
                    event_id = %event_id,
                    user_id = %user_id,
                    quantity,
                    "Ticket booked"
                );
                Ok(ticket)
            }
            Err(err) => {
                abandon(uow).await;
                Err(err)
            }
        }
    }

    async fn reserve(
        &self,
        uow: &mut dyn UnitOfWork,
        event_id: Uuid,
        user_id: Uuid,
        quantity: i32,
    ) -> AppResult<Ticket> {
        let event = uow
            .find_event_for_update(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found.".to_string()))?;

        if quantity <= 0 {
            return Err(AppError::ValidationError(
                "Quantity must be at least 1.".to_string(),
            ));
        }

        if event.available_seats < quantity {
            return Err(AppError::InsufficientSeats {
                available: event.available_seats,
            });
        }

        if uow.has_ticket(user_id, event_id).await? {
            return Err(AppError::Conflict(
                "You have already booked this event.".to_string(),
            ));
        }

        uow.set_available_seats(event_id, event.available_seats - quantity)
            .await?;

        let ticket = Ticket {
            id: Uuid::new_v4(),
            event_id,
            user_id,
            quantity,
            total_price: self.unit_price * Decimal::from(quantity),
            booking_date: self.clock.now(),
        };
        uow.insert_ticket(&ticket).await?;

        Ok(ticket)
    }

    pub async fn cancel(&self, ticket_id: Uuid, user_id: Uuid) -> AppResult<()> {
        let mut uow = self.store.begin().await?;

        match Self::release(uow.as_mut(), ticket_id, user_id).await {
            Ok(ticket) => {
                uow.commit().await?;
                info!(
                    ticket_id = %ticket_id,
                    event_id = %ticket.event_id,
                    restored = ticket.quantity,
                    "Ticket cancelled"
                );
                Ok(())
            }
            Err(err) => {
                abandon(uow).await;
                Err(err)
            }
        }
    }

    async fn release(uow: &mut dyn UnitOfWork, ticket_id: Uuid, user_id: Uuid) -> AppResult<Ticket> {
        let ticket = uow
            .find_ticket_for_holder(ticket_id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Ticket not found or not authorized".to_string()))?;

        if let Some(event) = uow.find_event_for_update(ticket.event_id).await? {
            let restored = (event.available_seats + ticket.quantity).min(event.total_seats);
            uow.set_available_seats(event.id, restored).await?;
        }

        uow.delete_ticket(ticket.id).await?;
        Ok(ticket)
    }

    pub async fn for_holder(&self, user_id: Uuid) -> AppResult<Vec<TicketView>> {
        self.views(TicketScope::Holder(user_id)).await
    }

    pub async fn for_organizer(&self, organizer_id: Uuid) -> AppResult<Vec<TicketView>> {
        self.views(TicketScope::Organizer(organizer_id)).await
    }

    pub async fn all(&self) -> AppResult<Vec<TicketView>> {
        self.views(TicketScope::All).await
    }

    async fn views(&self, scope: TicketScope) -> AppResult<Vec<TicketView>> {
        let mut uow = self.store.begin().await?;
        let tickets = uow.ticket_views(scope).await?;
        uow.commit().await?;
        Ok(tickets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::{Event, Role, User};
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone, Utc};

    struct Fixture {
        store: MemoryStore,
        service: TicketService,
    }

    fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap(),
        ));
        let service = TicketService::new(Arc::new(store.clone()), clock, Decimal::new(100, 0));
        Fixture { store, service }
    }

    async fn seed_user(store: &MemoryStore, name: &str) -> Uuid {
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            password_hash: String::new(),
            role: Role::Attendee,
            created_at: Utc::now(),
        };
        let mut uow = store.begin().await.unwrap();
        uow.insert_user(&user).await.unwrap();
        uow.commit().await.unwrap();
        user.id
    }

    async fn seed_event(store: &MemoryStore, seats: i32) -> Uuid {
        let start = Utc.with_ymd_and_hms(2025, 2, 1, 18, 0, 0).unwrap();
        let event = Event {
            id: Uuid::new_v4(),
            organizer_id: Uuid::new_v4(),
            title: "Spring Gala".to_string(),
            description: None,
            category: "Gala".to_string(),
            venue: "Ballroom".to_string(),
            start_date: start,
            end_date: start + Duration::hours(4),
            total_seats: seats,
            available_seats: seats,
            created_at: Utc::now(),
        };
        let mut uow = store.begin().await.unwrap();
        uow.insert_event(&event).await.unwrap();
        uow.commit().await.unwrap();
        event.id
    }

    async fn seats_left(store: &MemoryStore, event_id: Uuid) -> i32 {
        let mut uow = store.begin().await.unwrap();
        uow.find_event(event_id).await.unwrap().unwrap().available_seats
    }

    #[tokio::test]
    async fn test_booking_deducts_seats_and_prices_ticket() {
        let f = fixture();
        let user = seed_user(&f.store, "Ada").await;
        let event = seed_event(&f.store, 10).await;

        let ticket = f.service.book(event, user, 3).await.unwrap();

        assert_eq!(ticket.quantity, 3);
        assert_eq!(ticket.total_price, Decimal::new(300, 0));
        assert_eq!(seats_left(&f.store, event).await, 7);
    }

    #[tokio::test]
    async fn test_booking_unknown_event_is_not_found() {
        let f = fixture();
        let user = seed_user(&f.store, "Ada").await;

        let err = f.service.book(Uuid::new_v4(), user, 1).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_non_positive_quantity_is_rejected() {
        let f = fixture();
        let user = seed_user(&f.store, "Ada").await;
        let event = seed_event(&f.store, 10).await;

        for quantity in [0, -2] {
            let err = f.service.book(event, user, quantity).await.unwrap_err();
            assert!(matches!(err, AppError::ValidationError(_)));
        }
        assert_eq!(seats_left(&f.store, event).await, 10);
    }

    #[tokio::test]
    async fn test_overbooking_reports_remaining_seats() {
        let f = fixture();
        let user = seed_user(&f.store, "Ada").await;
        let event = seed_event(&f.store, 2).await;

        let err = f.service.book(event, user, 3).await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientSeats { available: 2 }));
        assert_eq!(err.public_message(), "Only 2 seats available.");
        assert_eq!(seats_left(&f.store, event).await, 2);
    }

    #[tokio::test]
    async fn test_second_booking_by_same_user_is_a_conflict() {
        let f = fixture();
        let user = seed_user(&f.store, "Ada").await;
        let event = seed_event(&f.store, 10).await;

        f.service.book(event, user, 1).await.unwrap();
        let err = f.service.book(event, user, 1).await.unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(seats_left(&f.store, event).await, 9);
        assert_eq!(f.service.for_holder(user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_restores_seats() {
        let f = fixture();
        let user = seed_user(&f.store, "Ada").await;
        let event = seed_event(&f.store, 10).await;

        let ticket = f.service.book(event, user, 4).await.unwrap();
        assert_eq!(seats_left(&f.store, event).await, 6);

        f.service.cancel(ticket.id, user).await.unwrap();
        assert_eq!(seats_left(&f.store, event).await, 10);
        assert!(f.service.for_holder(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cannot_cancel_someone_elses_ticket() {
        let f = fixture();
        let owner = seed_user(&f.store, "Ada").await;
        let intruder = seed_user(&f.store, "Mallory").await;
        let event = seed_event(&f.store, 10).await;

        let ticket = f.service.book(event, owner, 2).await.unwrap();
        let err = f.service.cancel(ticket.id, intruder).await.unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(seats_left(&f.store, event).await, 8);
    }

    #[tokio::test]
    async fn test_listings_are_scoped() {
        let f = fixture();
        let ada = seed_user(&f.store, "Ada").await;
        let bob = seed_user(&f.store, "Bob").await;
        let event = seed_event(&f.store, 10).await;

        f.service.book(event, ada, 1).await.unwrap();
        f.service.book(event, bob, 2).await.unwrap();

        let mine = f.service.for_holder(ada).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].user_name, "Ada");
        assert_eq!(mine[0].event_title, "Spring Gala");
        assert_eq!(f.service.all().await.unwrap().len(), 2);
        assert!(f.service.for_organizer(Uuid::new_v4()).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_bookings_for_last_seat() {
        let f = fixture();
        let event = seed_event(&f.store, 1).await;
        let first = seed_user(&f.store, "Ada").await;
        let second = seed_user(&f.store, "Bob").await;

        let a = tokio::spawn({
            let service = f.service.clone();
            async move { service.book(event, first, 1).await }
        });
        let b = tokio::spawn({
            let service = f.service.clone();
            async move { service.book(event, second, 1).await }
        });

        let results = [a.await.unwrap(), b.await.unwrap()];
        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);

        let failure = results.iter().find_map(|r| r.as_ref().err()).unwrap();
        assert!(matches!(
            failure,
            AppError::InsufficientSeats { available: 0 } | AppError::Conflict(_)
        ));
        assert_eq!(seats_left(&f.store, event).await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_seat_counter_stays_within_bounds_under_load() {
        let f = fixture();
        let event = seed_event(&f.store, 5).await;

        let mut handles = Vec::new();
        for i in 0..12 {
            let user = seed_user(&f.store, &format!("User{i}")).await;
            let service = f.service.clone();
            handles.push(tokio::spawn(async move { service.book(event, user, 1).await }));
        }

        let mut booked = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                booked += 1;
            }
        }

        assert_eq!(booked, 5);
        assert_eq!(seats_left(&f.store, event).await, 0);
    }
}
