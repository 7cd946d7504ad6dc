//! POP3 reply parsing.
//!
//! Sans-I/O: the [`ResponseFramer`] turns raw bytes into complete
//! [`Reply`](crate::types::Reply) values, and the payload functions turn
//! replies into typed results.

mod framer;
mod payload;

pub use framer::{DEFAULT_MAX_REPLY_SIZE, ResponseFramer, TERMINATOR};
pub use payload::{announced_count, extract_body, parse_list_entry, parse_listing, parse_stat};
