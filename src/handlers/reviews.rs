use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{Action, CurrentUser};
use crate::state::AppState;
use crate::utils::response::success;
use crate::utils::AppResult;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub event_id: Uuid,
    pub rating: i32,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AverageRating {
    event_id: Uuid,
    average_rating: f64,
}

pub async fn add_review(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<ReviewRequest>,
) -> AppResult<Response> {
    user.require(Action::SubmitReview)?;
    let review = state
        .reviews
        .add(req.event_id, user.id, req.rating, req.comment.unwrap_or_default())
        .await?;
    Ok(success(review, "Review submitted"))
}

pub async fn event_reviews(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> AppResult<Response> {
    let reviews = state.reviews.for_event(event_id).await?;
    Ok(success(reviews, "Reviews retrieved"))
}

pub async fn average_rating(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> AppResult<Response> {
    let average_rating = state.reviews.average(event_id).await?;
    Ok(success(
        AverageRating {
            event_id,
            average_rating,
        },
        "Average rating",
    ))
}
