//! Session lifecycle states.

use std::fmt;

/// Lifecycle state of a POP3 session.
///
/// ```text
/// Disconnected ── connect ──→ Connected ── login ──→ Authenticated
///      ↑                          │                        │
///      └──────── quit / EOF / transport error ─────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum SessionState {
    /// No transport; initial and final state.
    #[default]
    Disconnected = 0,
    /// Greeting received, not yet logged in (RFC 1939 AUTHORIZATION).
    Connected = 1,
    /// USER/PASS accepted (RFC 1939 TRANSACTION).
    Authenticated = 2,
}

impl SessionState {
    /// Returns the state as a lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::Authenticated => "authenticated",
        }
    }

    pub(crate) const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connected,
            2 => Self::Authenticated,
            _ => Self::Disconnected,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
