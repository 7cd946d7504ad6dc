//! # mailledger-pop3
//!
//! An async POP3 client library implementing RFC 1939 over implicit TLS.
//!
//! ## Features
//!
//! - **TLS via rustls**: Implicit TLS (port 995) with certificate validation
//! - **Commands**: USER, PASS, STAT, LIST, RETR, DELE, NOOP, RSET, QUIT
//! - **One command at a time**: A second command issued while one is in
//!   flight fails instead of interleaving on the wire
//! - **Drain**: Retrieve and delete every message, one at a time
//! - **Sans-I/O framing**: Reply framing separated from network I/O
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailledger_pop3::{Config, Session};
//!
//! #[tokio::main]
//! async fn main() -> mailledger_pop3::Result<()> {
//!     let config = Config::new("pop.example.com");
//!     let mut session = Session::connect(&config).await?;
//!     session.login("user@example.com", "password").await?;
//!
//!     let listing = session.list().await?;
//!     for (msg, size) in listing.iter() {
//!         println!("message {msg}: {size} octets");
//!     }
//!
//!     let mut drain = session.drain();
//!     while let Some(message) = drain.next().await {
//!         let message = message?;
//!         println!("{}", message.lines().next().unwrap_or_default());
//!     }
//!
//!     session.quit().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Session States
//!
//! ```text
//! ┌──────────────┐               ┌──────────────┐
//! │  Connected   │ ── login() ──→│Authenticated │
//! └──────────────┘               └──────────────┘
//!        │                              │
//!        └──── quit() / EOF / error ────┴──→ Disconnected
//! ```
//!
//! Mailbox commands require `Authenticated` and fail with
//! [`Error::InvalidState`] otherwise, without touching the connection.
//!
//! ## Modules
//!
//! - [`command`]: POP3 command builder
//! - [`connection`]: Configuration, transport and session
//! - [`parser`]: Reply framer and payload parsers
//! - [`types`]: Replies, session states, STAT/LIST results

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use command::Command;
pub use connection::{Config, ConfigBuilder, Drain, Pop3Stream, Session};
pub use error::{Error, Result};
pub use parser::ResponseFramer;
pub use types::{Listing, Reply, SessionState, Stat, Status};

/// POP3 protocol version supported.
pub const POP3_VERSION: &str = "POP3 (RFC 1939)";
