//! Event catalogue: scheduling-checked writes, paged reads, keyword search
//! and the cached "popular events" ranking.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::abandon;
use super::scheduling::TimeWindow;
use crate::auth::CurrentUser;
use crate::cache::TtlCache;
use crate::clock::Clock;
use crate::models::{Event, EventFilter, EventInput, Page};
use crate::store::{Store, UnitOfWork};
use crate::utils::{AppError, AppResult};

pub const MAX_POPULAR: u32 = 100;

#[derive(Clone)]
pub struct EventService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    popular: Arc<TtlCache<u32, Vec<Event>>>,
}

/// Trimmed and checked form of an [`EventInput`].
struct ValidEvent {
    title: String,
    description: Option<String>,
    category: String,
    venue: String,
    window: TimeWindow,
    total_seats: i32,
}

fn required(value: &str, field: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::ValidationError(format!("{field} is required.")));
    }
    Ok(value.to_string())
}

fn validate(input: EventInput, now: DateTime<Utc>) -> AppResult<ValidEvent> {
    let title = required(&input.title, "Title")?;
    let category = required(&input.category, "Category")?;
    let venue = required(&input.venue, "Venue")?;

    if input.total_seats < 1 {
        return Err(AppError::ValidationError(
            "Total seats must be at least 1.".to_string(),
        ));
    }
    if input.start_date > input.end_date {
        return Err(AppError::ValidationError(
            "Event start date must not be after its end date.".to_string(),
        ));
    }
    if input.start_date < now {
        return Err(AppError::ValidationError(
            "Event dates cannot be earlier than the current time.".to_string(),
        ));
    }

    let description = input
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());

    Ok(ValidEvent {
        title,
        description,
        category,
        venue,
        window: TimeWindow::new(input.start_date, input.end_date),
        total_seats: input.total_seats,
    })
}

fn ensure_can_manage(actor: &CurrentUser, event: &Event) -> AppResult<()> {
    if actor.is_admin() || event.organizer_id == actor.id {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only the event's organizer or an admin may change it.".to_string(),
        ))
    }
}

fn venue_taken(venue: &str) -> AppError {
    AppError::Conflict(format!(
        "Venue '{venue}' is already booked for an overlapping time."
    ))
}

fn event_not_found() -> AppError {
    AppError::NotFound("Event not found.".to_string())
}

impl EventService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, popular_ttl: Duration) -> Self {
        let popular = Arc::new(TtlCache::new(popular_ttl, clock.clone()));
        Self {
            store,
            clock,
            popular,
        }
    }

    pub async fn create(&self, organizer: &CurrentUser, input: EventInput) -> AppResult<Event> {
        let valid = validate(input, self.clock.now())?;
        let mut uow = self.store.begin().await?;

        uow.lock_venue(&valid.venue).await?;
        if uow.has_overlap(None, &valid.venue, valid.window).await? {
            abandon(uow).await;
            return Err(venue_taken(&valid.venue));
        }

        let event = Event {
            id: Uuid::new_v4(),
            organizer_id: organizer.id,
            title: valid.title,
            description: valid.description,
            category: valid.category,
            venue: valid.venue,
            start_date: valid.window.start,
            end_date: valid.window.end,
            total_seats: valid.total_seats,
            available_seats: valid.total_seats,
            created_at: self.clock.now(),
        };
        uow.insert_event(&event).await?;
        uow.commit().await?;

        info!(event_id = %event.id, organizer_id = %event.organizer_id, "Event created");
        Ok(event)
    }

    pub async fn update(&self, actor: &CurrentUser, id: Uuid, input: EventInput) -> AppResult<Event> {
        let mut uow = self.store.begin().await?;

        match self.revise(uow.as_mut(), actor, id, input).await {
            Ok(event) => {
                uow.commit().await?;
                info!(event_id = %event.id, actor_id = %actor.id, "Event updated");
                Ok(event)
            }
            Err(err) => {
                abandon(uow).await;
                Err(err)
            }
        }
    }

    async fn revise(
        &self,
        uow: &mut dyn UnitOfWork,
        actor: &CurrentUser,
        id: Uuid,
        input: EventInput,
    ) -> AppResult<Event> {
        let existing = uow
            .find_event_for_update(id)
            .await?
            .ok_or_else(event_not_found)?;
        ensure_can_manage(actor, &existing)?;

        let valid = validate(input, self.clock.now())?;

        let booked = existing.booked_seats();
        if valid.total_seats < booked {
            return Err(AppError::ValidationError(format!(
                "Total seats cannot be lower than the {booked} seats already booked."
            )));
        }

        uow.lock_venue(&valid.venue).await?;
        if uow.has_overlap(Some(id), &valid.venue, valid.window).await? {
            return Err(venue_taken(&valid.venue));
        }

        let event = Event {
            title: valid.title,
            description: valid.description,
            category: valid.category,
            venue: valid.venue,
            start_date: valid.window.start,
            end_date: valid.window.end,
            total_seats: valid.total_seats,
            available_seats: valid.total_seats - booked,
            ..existing
        };
        uow.update_event(&event).await?;
        Ok(event)
    }

    pub async fn delete(&self, actor: &CurrentUser, id: Uuid) -> AppResult<()> {
        let mut uow = self.store.begin().await?;

        let existing = match uow.find_event_for_update(id).await? {
            Some(event) => event,
            None => {
                abandon(uow).await;
                return Err(event_not_found());
            }
        };
        if let Err(err) = ensure_can_manage(actor, &existing) {
            abandon(uow).await;
            return Err(err);
        }

        uow.delete_event(id).await?;
        uow.commit().await?;

        info!(event_id = %id, actor_id = %actor.id, "Event deleted");
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Event> {
        let mut uow = self.store.begin().await?;
        let event = uow.find_event(id).await?;
        uow.commit().await?;
        event.ok_or_else(event_not_found)
    }

    pub async fn list(&self, page: Option<Page>) -> AppResult<Vec<Event>> {
        self.search(EventFilter {
            page,
            ..Default::default()
        })
        .await
    }

    pub async fn search(&self, filter: EventFilter) -> AppResult<Vec<Event>> {
        let mut uow = self.store.begin().await?;
        let events = uow.list_events(&filter).await?;
        uow.commit().await?;
        Ok(events)
    }

    /// Events ranked by seats sold. Results are served from the cache until
    /// they expire, so recent bookings may not be reflected yet.
    pub async fn popular(&self, top: u32) -> AppResult<Vec<Event>> {
        let top = top.min(MAX_POPULAR);
        if let Some(events) = self.popular.get(&top) {
            return Ok(events);
        }

        let mut uow = self.store.begin().await?;
        let events = uow.popular_events(i64::from(top)).await?;
        uow.commit().await?;

        tracing::debug!(top, count = events.len(), "Popular events recomputed");
        self.popular.insert(top, events.clone());
        Ok(events)
    }
}
