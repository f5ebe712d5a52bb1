use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::abandon;
use crate::clock::Clock;
use crate::models::review::{MAX_RATING, MIN_RATING};
use crate::models::{Review, ReviewView};
use crate::store::{Store, UnitOfWork};
use crate::utils::{AppError, AppResult};

/// Mean of the ratings, or 0 when there are none.
pub fn mean_rating(reviews: &[Review]) -> f64 {
    if reviews.is_empty() {
        return 0.0;
    }
    let sum: i64 = reviews.iter().map(|r| i64::from(r.rating)).sum();
    sum as f64 / reviews.len() as f64
}

#[derive(Clone)]
pub struct ReviewService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl ReviewService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Records a review by someone who holds a ticket for the event. Each
    /// user may review an event once.
    pub async fn add(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        rating: i32,
        comment: String,
    ) -> AppResult<Review> {
        let mut uow = self.store.begin().await?;

        match self.submit(uow.as_mut(), event_id, user_id, rating, comment).await {
            Ok(review) => {
                uow.commit().await?;
                info!(review_id = %review.id, event_id = %event_id, rating, "Review submitted");
                Ok(review)
            }
            Err(err) => {
                abandon(uow).await;
                Err(err)
            }
        }
    }

    async fn submit(
        &self,
        uow: &mut dyn UnitOfWork,
        event_id: Uuid,
        user_id: Uuid,
        rating: i32,
        comment: String,
    ) -> AppResult<Review> {
        if uow.find_event(event_id).await?.is_none() {
            return Err(AppError::NotFound("Event not found.".to_string()));
        }

        if !(MIN_RATING..=MAX_RATING).contains(&rating) {
            return Err(AppError::ValidationError(format!(
                "Rating must be between {MIN_RATING} and {MAX_RATING}."
            )));
        }

        if !uow.has_ticket(user_id, event_id).await? {
            return Err(AppError::ValidationError(
                "You can only review events you attended.".to_string(),
            ));
        }

        if uow.has_review(user_id, event_id).await? {
            return Err(AppError::Conflict(
                "You have already reviewed this event.".to_string(),
            ));
        }

        let review = Review {
            id: Uuid::new_v4(),
            event_id,
            user_id,
            rating,
            comment: comment.trim().to_string(),
            created_at: self.clock.now(),
        };
        uow.insert_review(&review).await?;
        Ok(review)
    }

    pub async fn for_event(&self, event_id: Uuid) -> AppResult<Vec<ReviewView>> {
        let mut uow = self.store.begin().await?;
        let reviews = uow.review_views(event_id).await?;
        uow.commit().await?;
        Ok(reviews)
    }

    pub async fn average(&self, event_id: Uuid) -> AppResult<f64> {
        let mut uow = self.store.begin().await?;
        let reviews = uow.list_reviews(Some(std::slice::from_ref(&event_id))).await?;
        uow.commit().await?;
        Ok(mean_rating(&reviews))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::{Event, Role, Ticket, User};
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;

    struct Fixture {
        store: MemoryStore,
        clock: Arc<ManualClock>,
        service: ReviewService,
        event_id: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 3, 2, 10, 0, 0).unwrap(),
        ));
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 18, 0, 0).unwrap();
        let event = Event {
            id: Uuid::new_v4(),
            organizer_id: Uuid::new_v4(),
            title: "Poetry Slam".to_string(),
            description: None,
            category: "Arts".to_string(),
            venue: "Cellar".to_string(),
            start_date: start,
            end_date: start + Duration::hours(3),
            total_seats: 40,
            available_seats: 40,
            created_at: start - Duration::days(30),
        };
        let mut uow = store.begin().await.unwrap();
        uow.insert_event(&event).await.unwrap();
        uow.commit().await.unwrap();

        let service = ReviewService::new(Arc::new(store.clone()), clock.clone());
        Fixture {
            store,
            clock,
            service,
            event_id: event.id,
        }
    }

    async fn attendee(f: &Fixture, name: &str, with_ticket: bool) -> Uuid {
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            password_hash: String::new(),
            role: Role::Attendee,
            created_at: Utc::now(),
        };
        let mut uow = f.store.begin().await.unwrap();
        uow.insert_user(&user).await.unwrap();
        if with_ticket {
            uow.insert_ticket(&Ticket {
                id: Uuid::new_v4(),
                event_id: f.event_id,
                user_id: user.id,
                quantity: 1,
                total_price: Decimal::new(100, 0),
                booking_date: Utc::now(),
            })
            .await
            .unwrap();
        }
        uow.commit().await.unwrap();
        user.id
    }

    #[test]
    fn test_mean_rating() {
        assert_eq!(mean_rating(&[]), 0.0);
    }

    #[tokio::test]
    async fn test_ticket_holder_reviews_once() {
        let f = fixture().await;
        let user = attendee(&f, "Ada", true).await;

        let review = f
            .service
            .add(f.event_id, user, 4, "  Loved it ".to_string())
            .await
            .unwrap();
        assert_eq!(review.comment, "Loved it");

        let err = f
            .service
            .add(f.event_id, user, 5, "Again".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_non_holder_cannot_review() {
        let f = fixture().await;
        let user = attendee(&f, "Mallory", false).await;

        let err = f
            .service
            .add(f.event_id, user, 5, "Great".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(ref m) if m.contains("attended")));
    }

    #[tokio::test]
    async fn test_rating_bounds_and_missing_event() {
        let f = fixture().await;
        let user = attendee(&f, "Ada", true).await;

        for rating in [0, 6, -1] {
            let err = f
                .service
                .add(f.event_id, user, rating, String::new())
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::ValidationError(_)));
        }

        let err = f
            .service
            .add(Uuid::new_v4(), user, 3, String::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_average_and_listing() {
        let f = fixture().await;
        assert_eq!(f.service.average(f.event_id).await.unwrap(), 0.0);

        let ada = attendee(&f, "Ada", true).await;
        let bob = attendee(&f, "Bob", true).await;
        f.service
            .add(f.event_id, ada, 3, "Fine".to_string())
            .await
            .unwrap();
        f.clock.advance(Duration::minutes(5));
        f.service
            .add(f.event_id, bob, 5, "Superb".to_string())
            .await
            .unwrap();

        assert_eq!(f.service.average(f.event_id).await.unwrap(), 4.0);

        let listed = f.service.for_event(f.event_id).await.unwrap();
        let names: Vec<_> = listed.iter().map(|r| r.user_name.as_str()).collect();
        assert_eq!(names, vec!["Ada", "Bob"]);
    }
}
