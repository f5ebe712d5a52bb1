pub mod event;
pub mod review;
pub mod ticket;
pub mod user;

pub use event::{Event, EventFilter, EventInput, Page};
pub use review::{Review, ReviewView};
pub use ticket::{Ticket, TicketScope, TicketView};
pub use user::{Role, User};
