pub mod accounts;
pub mod dashboard;
pub mod events;
pub mod reviews;
pub mod scheduling;
pub mod tickets;

pub use accounts::AccountService;
pub use dashboard::DashboardService;
pub use events::EventService;
pub use reviews::ReviewService;
pub use tickets::TicketService;

use crate::store::UnitOfWork;

/// Ends a failed unit of work. The original error is what the caller
/// reports, so a failing rollback is only logged.
pub(crate) async fn abandon(uow: Box<dyn UnitOfWork>) {
    if let Err(e) = uow.rollback().await {
        tracing::warn!(error = ?e, "Rollback failed");
    }
}
