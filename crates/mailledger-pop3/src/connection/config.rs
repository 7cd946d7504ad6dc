//! Connection configuration types.

use std::time::Duration;

use crate::parser::DEFAULT_MAX_REPLY_SIZE;

/// Default POP3-over-TLS port (RFC 8314).
pub const DEFAULT_PORT: u16 = 995;

/// Default deadline for the TLS handshake and the greeting.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// POP3 connection configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Server hostname, also used for certificate validation.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Deadline for connecting, and again for reading the greeting.
    pub connect_timeout: Duration,
    /// Deadline for each mailbox command; `None` waits indefinitely.
    pub command_timeout: Option<Duration>,
    /// Largest reply the framer will buffer.
    pub max_reply_size: usize,
}

impl Config {
    /// Creates a configuration for implicit TLS on port 995.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self::builder(host).build()
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder::new(host)
    }
}

/// Builder for connection configuration.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    host: String,
    port: u16,
    connect_timeout: Duration,
    command_timeout: Option<Duration>,
    max_reply_size: usize,
}

impl ConfigBuilder {
    /// Creates a new builder with the given hostname.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            command_timeout: None,
            max_reply_size: DEFAULT_MAX_REPLY_SIZE,
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the connection and greeting timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Bounds every mailbox command by `timeout`.
    ///
    /// A command that times out abandons the session.
    #[must_use]
    pub const fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    /// Sets the largest reply the framer will buffer.
    #[must_use]
    pub const fn max_reply_size(mut self, bytes: usize) -> Self {
        self.max_reply_size = bytes;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> Config {
        Config {
            host: self.host,
            port: self.port,
            connect_timeout: self.connect_timeout,
            command_timeout: self.command_timeout,
            max_reply_size: self.max_reply_size,
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new() {
        let config = Config::new("pop.example.com");
        assert_eq!(config.host, "pop.example.com");
        assert_eq!(config.port, 995);
        assert_eq!(config.connect_timeout, Duration::from_millis(30000));
        assert_eq!(config.command_timeout, None);
        assert_eq!(config.max_reply_size, DEFAULT_MAX_REPLY_SIZE);
    }

    #[test]
    fn test_config_builder() {
        let config = Config::builder("pop.example.com")
            .port(1995)
            .connect_timeout(Duration::from_secs(5))
            .command_timeout(Duration::from_secs(60))
            .max_reply_size(1024)
            .build();

        assert_eq!(config.port, 1995);
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.command_timeout, Some(Duration::from_secs(60)));
        assert_eq!(config.max_reply_size, 1024);
    }
}
