use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer, Config};
use crate::handlers::{auth, dashboard, events, health_check, reviews, tickets};
use crate::state::AppState;

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route(
            "/Event",
            get(events::list_events)
                .post(events::create_event)
                .put(events::update_event),
        )
        .route("/Event/search", get(events::search_events))
        .route("/Event/popular", get(events::popular_events))
        .route(
            "/Event/:id",
            get(events::get_event).delete(events::delete_event),
        )
        .route("/Tickets/book", post(tickets::book_ticket))
        .route("/Tickets/my", get(tickets::my_tickets))
        .route("/Tickets/organizer", get(tickets::organizer_tickets))
        .route("/Tickets/all", get(tickets::all_tickets))
        .route("/Tickets/:id", delete(tickets::cancel_ticket))
        .route("/Reviews", post(reviews::add_review))
        .route("/Reviews/:event_id", get(reviews::event_reviews))
        .route("/Reviews/:event_id/average", get(reviews::average_rating))
        .route("/Dashboard/admin", get(dashboard::admin_dashboard))
        .route("/Dashboard/organizer", get(dashboard::organizer_dashboard))
}

pub fn create_routes(state: AppState, config: &Config) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer(config.production))
        .layer(create_cors_layer(&config.allowed_origins))
}
