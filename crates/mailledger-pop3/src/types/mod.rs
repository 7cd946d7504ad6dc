//! Core POP3 types.

mod mailbox;
mod reply;
mod state;

pub use mailbox::{Listing, Stat};
pub use reply::{Reply, Status};
pub use state::SessionState;
