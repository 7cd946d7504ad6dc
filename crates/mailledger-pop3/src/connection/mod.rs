//! POP3 connection management.
//!
//! This module provides:
//! - Configuration (host, port, timeouts)
//! - The implicit-TLS transport
//! - A deadline guard for connect and commands
//! - The [`Session`] that executes commands and tracks state
//! - [`Drain`], which retrieves and deletes a mailbox message by message

mod config;
mod drain;
mod session;
mod stream;
mod timeout;

pub use config::{Config, ConfigBuilder, DEFAULT_CONNECT_TIMEOUT, DEFAULT_PORT};
pub use drain::Drain;
pub use session::Session;
pub use stream::{Pop3Stream, connect_tls, create_tls_connector};
pub use timeout::with_timeout;
