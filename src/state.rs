use std::sync::Arc;

use crate::auth::TokenIssuer;
use crate::clock::Clock;
use crate::config::Config;
use crate::services::{AccountService, DashboardService, EventService, ReviewService, TicketService};
use crate::store::Store;

/// Shared handles passed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub tokens: Arc<TokenIssuer>,
    pub accounts: AccountService,
    pub events: EventService,
    pub tickets: TicketService,
    pub reviews: ReviewService,
    pub dashboard: DashboardService,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, config: &Config) -> Self {
        let tokens = Arc::new(TokenIssuer::new(&config.jwt));

        Self {
            accounts: AccountService::new(store.clone(), clock.clone(), tokens.clone()),
            events: EventService::new(store.clone(), clock.clone(), config.popular_cache_ttl),
            tickets: TicketService::new(store.clone(), clock.clone(), config.ticket_unit_price),
            reviews: ReviewService::new(store.clone(), clock),
            dashboard: DashboardService::new(store),
            tokens,
        }
    }
}
