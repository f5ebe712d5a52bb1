use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{Action, CurrentUser};
use crate::models::{EventFilter, EventInput, Page};
use crate::state::AppState;
use crate::utils::response::{empty_success, success};
use crate::utils::AppResult;

pub const DEFAULT_POPULAR: u32 = 5;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl From<SearchQuery> for EventFilter {
    fn from(query: SearchQuery) -> Self {
        let text = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        EventFilter {
            keyword: text(query.q),
            category: text(query.category),
            starts_after: query.start,
            ends_before: query.end,
            page: Page::from_query(query.page, query.page_size),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    pub top: Option<u32>,
}

/// Body of `PUT /Event`: the event id alongside the editable fields.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    pub id: Uuid,
    #[serde(flatten)]
    pub input: EventInput,
}

pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Response> {
    let events = state
        .events
        .list(Page::from_query(query.page, query.page_size))
        .await?;
    Ok(success(events, "Events retrieved"))
}

pub async fn get_event(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Response> {
    let event = state.events.get(id).await?;
    Ok(success(event, "Event retrieved"))
}

pub async fn search_events(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Response> {
    let events = state.events.search(query.into()).await?;
    Ok(success(events, "Search results"))
}

pub async fn popular_events(
    State(state): State<AppState>,
    Query(query): Query<PopularQuery>,
) -> AppResult<Response> {
    let events = state
        .events
        .popular(query.top.unwrap_or(DEFAULT_POPULAR))
        .await?;
    Ok(success(events, "Popular events"))
}

pub async fn create_event(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<EventInput>,
) -> AppResult<Response> {
    user.require(Action::CreateEvent)?;
    let event = state.events.create(&user, input).await?;
    Ok(success(event, "Event created"))
}

pub async fn update_event(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<UpdateEventRequest>,
) -> AppResult<Response> {
    user.require(Action::UpdateEvent)?;
    let event = state.events.update(&user, req.id, req.input).await?;
    Ok(success(event, "Event updated"))
}

pub async fn delete_event(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    user.require(Action::DeleteEvent)?;
    state.events.delete(&user, id).await?;
    Ok(empty_success("Event deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_query_drops_blank_terms() {
        let filter = EventFilter::from(SearchQuery {
            q: Some("  ".to_string()),
            category: Some(" Music ".to_string()),
            page_size: Some(5),
            ..Default::default()
        });
        assert_eq!(filter.keyword, None);
        assert_eq!(filter.category.as_deref(), Some("Music"));
        assert_eq!(filter.page, Some(Page::new(1, 5)));
    }
}
