//! POP3 reply types.

/// Status indicator of a POP3 reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// `+OK`
    Ok,
    /// `-ERR`
    Err,
}

impl Status {
    /// Positive status indicator.
    pub const OK_MARKER: &'static [u8] = b"+OK";
    /// Negative status indicator.
    pub const ERR_MARKER: &'static [u8] = b"-ERR";

    /// Classifies a status line by its prefix.
    ///
    /// Returns `None` if the line starts with neither indicator.
    #[must_use]
    pub fn classify(line: &[u8]) -> Option<Self> {
        if line.starts_with(Self::OK_MARKER) {
            Some(Self::Ok)
        } else if line.starts_with(Self::ERR_MARKER) {
            Some(Self::Err)
        } else {
            None
        }
    }

    /// Returns the wire form of the indicator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "+OK",
            Self::Err => "-ERR",
        }
    }
}

/// A complete POP3 reply.
///
/// `text` is the raw payload as framed: the status line with its CRLF, and
/// for multi-line replies the body and the `CRLF.CRLF` terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Positive or negative.
    pub status: Status,
    /// Raw reply text.
    pub text: String,
}

impl Reply {
    /// Creates a new reply.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // String is not const-compatible
    pub fn new(status: Status, text: String) -> Self {
        Self { status, text }
    }

    /// Returns true if the server answered `+OK`.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self.status, Status::Ok)
    }

    /// Returns the first line without its CRLF.
    #[must_use]
    pub fn status_line(&self) -> &str {
        let end = self.text.find("\r\n").unwrap_or(self.text.len());
        &self.text[..end]
    }

    /// Returns the status line text after the indicator, trimmed.
    ///
    /// `+OK 3 1200` yields `3 1200`.
    #[must_use]
    pub fn message(&self) -> &str {
        let line = self.status_line();
        line.strip_prefix(self.status.as_str())
            .unwrap_or(line)
            .trim()
    }
}
