use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{Action, CurrentUser};
use crate::state::AppState;
use crate::utils::response::{empty_success, success};
use crate::utils::AppResult;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookRequest {
    pub event_id: Uuid,
    pub quantity: i32,
}

pub async fn book_ticket(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<BookRequest>,
) -> AppResult<Response> {
    user.require(Action::BookTicket)?;
    let ticket = state
        .tickets
        .book(req.event_id, user.id, req.quantity)
        .await?;
    Ok(success(ticket, "Ticket booked"))
}

pub async fn my_tickets(State(state): State<AppState>, user: CurrentUser) -> AppResult<Response> {
    user.require(Action::ViewOwnTickets)?;
    let tickets = state.tickets.for_holder(user.id).await?;
    Ok(success(tickets, "Tickets retrieved"))
}

pub async fn cancel_ticket(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    user.require(Action::CancelTicket)?;
    state.tickets.cancel(id, user.id).await?;
    Ok(empty_success("Ticket cancelled"))
}

pub async fn organizer_tickets(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Response> {
    user.require(Action::ViewOrganizerTickets)?;
    let tickets = state.tickets.for_organizer(user.id).await?;
    Ok(success(tickets, "Tickets retrieved"))
}

pub async fn all_tickets(State(state): State<AppState>, user: CurrentUser) -> AppResult<Response> {
    user.require(Action::ViewAllTickets)?;
    let tickets = state.tickets.all().await?;
    Ok(success(tickets, "Tickets retrieved"))
}
