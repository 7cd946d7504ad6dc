//! Error types for POP3 operations.

use std::io;
use std::time::Duration;

use crate::types::SessionState;

/// Result type alias for POP3 operations.
pub type Result<T> = std::result::Result<T, Error>;

/// POP3 error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error on the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS handshake or certificate validation error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Hostname is not a valid TLS server name.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// The connection was closed or abandoned; the session is unusable.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// A guarded operation did not finish before its deadline.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        /// Which operation timed out (e.g. `connect`, `greeting`, `RETR`).
        operation: &'static str,
        /// The deadline that elapsed.
        after: Duration,
    },

    /// Server answered a command with `-ERR`.
    #[error("POP3 {command} failed: {}", response.trim_end())]
    Command {
        /// Command verb (e.g. `RETR`).
        command: &'static str,
        /// Raw reply text as received, including the trailing CRLF.
        response: String,
    },

    /// Server greeting was negative.
    #[error("POP3 connection rejected: {}", .0.trim_end())]
    Greeting(String),

    /// Operation invoked in the wrong session state.
    #[error("Invalid state: expected {expected}, found {actual}")]
    InvalidState {
        /// State the operation requires.
        expected: SessionState,
        /// State the session was in.
        actual: SessionState,
    },

    /// Another command is already awaiting its reply on this session.
    #[error("POP3 {command} failed: another command is in flight")]
    Busy {
        /// Command that was refused.
        command: &'static str,
    },

    /// A command argument cannot be sent as given.
    #[error("Invalid {command} argument: {reason}")]
    InvalidArgument {
        /// Command verb (e.g. `USER`).
        command: &'static str,
        /// What is wrong with the argument.
        reason: &'static str,
    },

    /// Malformed or unexpected reply.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl Error {
    /// Creates a command failure from a verb and the raw reply.
    #[must_use]
    pub fn command(command: &'static str, response: impl Into<String>) -> Self {
        Self::Command {
            command,
            response: response.into(),
        }
    }

    /// Returns true if the server answered `-ERR`.
    ///
    /// The session stays usable after such an error.
    #[must_use]
    pub const fn is_negative_reply(&self) -> bool {
        matches!(self, Self::Command { .. } | Self::Greeting(_))
    }

    /// Returns true if a deadline elapsed.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns true if the error leaves the session unusable.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Io(_)
                | Self::Tls(_)
                | Self::InvalidDnsName(_)
                | Self::ConnectionLost(_)
                | Self::Timeout { .. }
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_command_error_display() {
        let err = Error::command("RETR", "-ERR no such message\r\n");
        assert_eq!(err.to_string(), "POP3 RETR failed: -ERR no such message");
        assert!(err.is_negative_reply());
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_invalid_state_display() {
        let err = Error::InvalidState {
            expected: SessionState::Authenticated,
            actual: SessionState::Connected,
        };
        assert_eq!(
            err.to_string(),
            "Invalid state: expected authenticated, found connected"
        );
    }

    #[test]
    fn test_timeout_is_fatal() {
        let err = Error::Timeout {
            operation: "connect",
            after: Duration::from_secs(30),
        };
        assert!(err.is_timeout());
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), "connect timed out after 30s");
    }

    #[test]
    fn test_busy_is_not_fatal() {
        let err = Error::Busy { command: "STAT" };
        assert!(!err.is_fatal());
        assert!(!err.is_negative_reply());
    }
}
