use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use super::reviews::mean_rating;
use crate::models::Ticket;
use crate::store::Store;
use crate::utils::AppResult;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboard {
    pub total_users: i64,
    pub total_events: i64,
    pub total_tickets: i64,
    pub total_revenue: Decimal,
    pub average_rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizerDashboard {
    pub total_events: i64,
    pub total_tickets: i64,
    pub total_revenue: Decimal,
    pub average_rating: f64,
}

fn revenue(tickets: &[Ticket]) -> Decimal {
    tickets.iter().map(|t| t.total_price).sum()
}

/// Aggregates recomputed on every call.
#[derive(Clone)]
pub struct DashboardService {
    store: Arc<dyn Store>,
}

impl DashboardService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn admin(&self) -> AppResult<AdminDashboard> {
        let mut uow = self.store.begin().await?;
        let total_users = uow.count_users().await?;
        let total_events = uow.count_events().await?;
        let tickets = uow.list_tickets(None).await?;
        let reviews = uow.list_reviews(None).await?;
        uow.commit().await?;

        Ok(AdminDashboard {
            total_users,
            total_events,
            total_tickets: tickets.len() as i64,
            total_revenue: revenue(&tickets),
            average_rating: mean_rating(&reviews),
        })
    }

    pub async fn organizer(&self, organizer_id: Uuid) -> AppResult<OrganizerDashboard> {
        let mut uow = self.store.begin().await?;
        let event_ids: Vec<Uuid> = uow
            .events_by_organizer(organizer_id)
            .await?
            .into_iter()
            .map(|e| e.id)
            .collect();
        let tickets = uow.list_tickets(Some(event_ids.as_slice())).await?;
        let reviews = uow.list_reviews(Some(event_ids.as_slice())).await?;
        uow.commit().await?;

        Ok(OrganizerDashboard {
            total_events: event_ids.len() as i64,
            total_tickets: tickets.len() as i64,
            total_revenue: revenue(&tickets),
            average_rating: mean_rating(&reviews),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Event, Review, Role, User};
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone, Utc};

    fn event(organizer_id: Uuid, venue: &str) -> Event {
        let start = Utc.with_ymd_and_hms(2025, 4, 10, 19, 0, 0).unwrap();
        Event {
            id: Uuid::new_v4(),
            organizer_id,
            title: format!("Show at {venue}"),
            description: None,
            category: "Theatre".to_string(),
            venue: venue.to_string(),
            start_date: start,
            end_date: start + Duration::hours(2),
            total_seats: 100,
            available_seats: 100,
            created_at: Utc::now(),
        }
    }

    fn ticket(event_id: Uuid, quantity: i32) -> Ticket {
        Ticket {
            id: Uuid::new_v4(),
            event_id,
            user_id: Uuid::new_v4(),
            quantity,
            total_price: Decimal::new(100, 0) * Decimal::from(quantity),
            booking_date: Utc::now(),
        }
    }

    fn review(event_id: Uuid, rating: i32) -> Review {
        Review {
            id: Uuid::new_v4(),
            event_id,
            user_id: Uuid::new_v4(),
            rating,
            comment: String::new(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_admin_and_organizer_totals() {
        let store = MemoryStore::new();
        let mine = Uuid::new_v4();
        let theirs = Uuid::new_v4();
        let a = event(mine, "Globe");
        let b = event(theirs, "Rose");

        let mut uow = store.begin().await.unwrap();
        uow.insert_user(&User {
            id: mine,
            name: "Olive".to_string(),
            email: "olive@example.com".to_string(),
            password_hash: String::new(),
            role: Role::Organizer,
            created_at: Utc::now(),
        })
        .await
        .unwrap();
        uow.insert_event(&a).await.unwrap();
        uow.insert_event(&b).await.unwrap();
        uow.insert_ticket(&ticket(a.id, 2)).await.unwrap();
        uow.insert_ticket(&ticket(a.id, 1)).await.unwrap();
        uow.insert_ticket(&ticket(b.id, 4)).await.unwrap();
        uow.insert_review(&review(a.id, 3)).await.unwrap();
        uow.insert_review(&review(a.id, 5)).await.unwrap();
        uow.insert_review(&review(b.id, 2)).await.unwrap();
        uow.commit().await.unwrap();

        let service = DashboardService::new(Arc::new(store));

        let admin = service.admin().await.unwrap();
        assert_eq!(admin.total_users, 1);
        assert_eq!(admin.total_events, 2);
        assert_eq!(admin.total_tickets, 3);
        assert_eq!(admin.total_revenue, Decimal::new(700, 0));
        assert!((admin.average_rating - 10.0 / 3.0).abs() < 1e-9);

        let organizer = service.organizer(mine).await.unwrap();
        assert_eq!(
            organizer,
            OrganizerDashboard {
                total_events: 1,
                total_tickets: 2,
                total_revenue: Decimal::new(300, 0),
                average_rating: 4.0,
            }
        );
    }

    #[tokio::test]
    async fn test_empty_store_reports_zeroes() {
        let service = DashboardService::new(Arc::new(MemoryStore::new()));

        let admin = service.admin().await.unwrap();
        assert_eq!(admin.total_revenue, Decimal::ZERO);
        assert_eq!(admin.average_rating, 0.0);

        let organizer = service.organizer(Uuid::new_v4()).await.unwrap();
        assert_eq!(organizer.total_events, 0);
        assert_eq!(organizer.total_tickets, 0);
    }
}
