//! Reply framing.
//!
//! POP3 replies are either a single CRLF-terminated status line, or, for a
//! positive answer to LIST/RETR, a status line followed by a body that ends
//! with a line holding a single dot. The framer buffers raw bytes and
//! decides from the buffer contents alone when a reply is complete.

use bytes::BytesMut;

use crate::error::{Error, Result};
use crate::types::{Reply, Status};

/// Multi-line reply terminator.
pub const TERMINATOR: &[u8] = b"\r\n.\r\n";

/// Default buffer size for reading.
const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Default cap on a single buffered reply.
pub const DEFAULT_MAX_REPLY_SIZE: usize = 64 * 1024 * 1024; // 64 MB

/// Incremental reply framer.
///
/// Feed bytes with [`extend`](Self::extend) and poll with
/// [`next_reply`](Self::next_reply). Bytes past the end of a reply stay
/// buffered for the next one.
#[derive(Debug)]
pub struct ResponseFramer {
    buffer: BytesMut,
    max_reply_size: usize,
    /// Offset below which no terminator exists in the current buffer.
    scanned: usize,
}

impl ResponseFramer {
    /// Creates a framer with the default size cap.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_reply_size(DEFAULT_MAX_REPLY_SIZE)
    }

    /// Creates a framer that rejects replies larger than `max_reply_size`.
    #[must_use]
    pub fn with_max_reply_size(max_reply_size: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
            max_reply_size,
            scanned: 0,
        }
    }

    /// Appends raw bytes from the transport.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Number of bytes buffered and not yet emitted.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Returns the next complete reply, if the buffer holds one.
    ///
    /// `multiline` selects dot-terminated framing for a positive reply.
    /// A negative reply is always a single line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if a multi-line reply does not start with
    /// a status indicator, or if the reply outgrows the size cap.
    pub fn next_reply(&mut self, multiline: bool) -> Result<Option<Reply>> {
        let Some(line_end) = find_crlf(&self.buffer) else {
            return self.pending();
        };

        let status = match Status::classify(&self.buffer[..line_end]) {
            Some(status) => status,
            None if !multiline => Status::Ok,
            None => {
                return Err(Error::Protocol(format!(
                    "unexpected status line: {}",
                    String::from_utf8_lossy(&self.buffer[..line_end])
                )));
            }
        };

        let frame_len = if multiline && status == Status::Ok {
            // The status line's own CRLF may open the terminator (empty body).
            let from = self.scanned.max(line_end);
            match find_terminator(&self.buffer, from) {
                Some(pos) => pos + TERMINATOR.len(),
                None => {
                    self.scanned = self.buffer.len().saturating_sub(TERMINATOR.len() - 1);
                    return self.pending();
                }
            }
        } else {
            line_end + 2
        };

        let frame = self.buffer.split_to(frame_len);
        self.scanned = 0;
        Ok(Some(Reply::new(status, decode(&frame))))
    }

    fn pending(&self) -> Result<Option<Reply>> {
        if self.buffer.len() > self.max_reply_size {
            return Err(Error::Protocol(format!(
                "reply too large: more than {} bytes",
                self.max_reply_size
            )));
        }
        Ok(None)
    }
}

impl Default for ResponseFramer {
    fn default() -> Self {
        Self::new()
    }
}

/// Finds the position of CRLF in a buffer.
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

/// Finds the terminator at or after `from`.
fn find_terminator(buf: &[u8], from: usize) -> Option<usize> {
    buf.get(from..)?
        .windows(TERMINATOR.len())
        .position(|w| w == TERMINATOR)
        .map(|pos| pos + from)
}

/// Decodes reply bytes as text; POP3 is 7-bit, anything else is replaced.
fn decode(frame: &[u8]) -> String {
    String::from_utf8_lossy(frame).into_owned()
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
    use proptest::prelude::*;

    fn frame_all(input: &[u8], multiline: bool) -> Option<Reply> {
        let mut framer = ResponseFramer::new();
        framer.extend(input);
        framer.next_reply(multiline).unwrap()
    }

    #[test]
    fn test_find_crlf() {
        assert_eq!(find_crlf(b"+OK\r\n"), Some(3));
        assert_eq!(find_crlf(b"\r\n"), Some(0));
        assert_eq!(find_crlf(b"+OK\n"), None);
    }

    #[test]
    fn test_single_line_positive() {
        let reply = frame_all(b"+OK 3 1200\r\n", false).unwrap();
        assert_eq!(reply.status, Status::Ok);
        assert_eq!(reply.text, "+OK 3 1200\r\n");
    }

    #[test]
    fn test_single_line_negative() {
        let reply = frame_all(b"-ERR no such message\r\n", false).unwrap();
        assert_eq!(reply.status, Status::Err);
        assert_eq!(reply.text, "-ERR no such message\r\n");
    }

    #[test]
    fn test_single_line_unmarked_defaults_positive() {
        let reply = frame_all(b"hello there\r\n", false).unwrap();
        assert_eq!(reply.status, Status::Ok);
    }

    #[test]
    fn test_incomplete_line_waits() {
        let mut framer = ResponseFramer::new();
        framer.extend(b"+OK 3 12");
        assert!(framer.next_reply(false).unwrap().is_none());
        framer.extend(b"00\r\n");
        let reply = framer.next_reply(false).unwrap().unwrap();
        assert_eq!(reply.text, "+OK 3 1200\r\n");
        assert_eq!(framer.buffered(), 0);
    }

    #[test]
    fn test_split_marker_waits() {
        let mut framer = ResponseFramer::new();
        framer.extend(b"-E");
        assert!(framer.next_reply(true).unwrap().is_none());
        framer.extend(b"RR gone\r\n");
        let reply = framer.next_reply(true).unwrap().unwrap();
        assert_eq!(reply.status, Status::Err);
    }

    #[test]
    fn test_multiline_waits_for_terminator() {
        let mut framer = ResponseFramer::new();
        framer.extend(b"+OK\r\nHello\r\n");
        assert!(framer.next_reply(true).unwrap().is_none());
        framer.extend(b"World\r\n.");
        assert!(framer.next_reply(true).unwrap().is_none());
        framer.extend(b"\r\n");
        let reply = framer.next_reply(true).unwrap().unwrap();
        assert_eq!(reply.text, "+OK\r\nHello\r\nWorld\r\n.\r\n");
    }

    #[test]
    fn test_multiline_empty_body() {
        let reply = frame_all(b"+OK 0 messages\r\n.\r\n", true).unwrap();
        assert_eq!(reply.text, "+OK 0 messages\r\n.\r\n");
    }

    #[test]
    fn test_multiline_negative_is_single_line() {
        let reply = frame_all(b"-ERR no such message\r\n", true).unwrap();
        assert_eq!(reply.status, Status::Err);
        assert_eq!(reply.text, "-ERR no such message\r\n");
    }

    #[test]
    fn test_multiline_unmarked_is_protocol_error() {
        let mut framer = ResponseFramer::new();
        framer.extend(b"* OK not pop3\r\n");
        let err = framer.next_reply(true).unwrap_err();
        assert!(err.to_string().contains("unexpected status line"));
    }

    #[test]
    fn test_dot_stuffed_line_is_not_terminator() {
        let mut framer = ResponseFramer::new();
        framer.extend(b"+OK\r\n..hidden\r\n");
        assert!(framer.next_reply(true).unwrap().is_none());
        framer.extend(b".\r\n");
        let reply = framer.next_reply(true).unwrap().unwrap();
        assert_eq!(reply.text, "+OK\r\n..hidden\r\n.\r\n");
    }

    #[test]
    fn test_trailing_bytes_stay_buffered() {
        let mut framer = ResponseFramer::new();
        framer.extend(b"+OK first\r\n+OK second\r\n");
        assert_eq!(
            framer.next_reply(false).unwrap().unwrap().text,
            "+OK first\r\n"
        );
        assert_eq!(
            framer.next_reply(false).unwrap().unwrap().text,
            "+OK second\r\n"
        );
        assert!(framer.next_reply(false).unwrap().is_none());
    }

    #[test]
    fn test_reply_size_cap() {
        let mut framer = ResponseFramer::with_max_reply_size(16);
        framer.extend(b"+OK\r\n");
        framer.extend(&[b'x'; 32]);
        let err = framer.next_reply(true).unwrap_err();
        assert!(err.to_string().contains("reply too large"));
    }

    #[test]
    fn test_non_ascii_is_replaced() {
        let reply = frame_all(b"+OK caf\xe9\r\n", false).unwrap();
        assert_eq!(reply.text, "+OK caf\u{fffd}\r\n");
    }

    proptest! {
        #[test]
        fn framing_ignores_chunk_boundaries(
            body in proptest::collection::vec("[a-z .]{0,12}", 0..6),
            cuts in proptest::collection::vec(any::<prop::sample::Index>(), 0..8),
        ) {
            let mut wire = b"+OK\r\n".to_vec();
            for line in &body {
                if line.starts_with('.') {
                    wire.push(b'.');
                }
                wire.extend_from_slice(line.as_bytes());
                wire.extend_from_slice(b"\r\n");
            }
            wire.extend_from_slice(b".\r\n");

            let mut points: Vec<usize> = cuts.iter().map(|i| i.index(wire.len())).collect();
            points.sort_unstable();

            let mut framer = ResponseFramer::new();
            let mut start = 0;
            let mut reply = None;
            for point in points.into_iter().chain(std::iter::once(wire.len())) {
                framer.extend(&wire[start..point]);
                start = point;
                if let Some(r) = framer.next_reply(true).unwrap() {
                    prop_assert!(reply.is_none());
                    reply = Some(r);
                }
            }

            let reply = reply.unwrap();
            prop_assert_eq!(reply.text.as_bytes(), wire.as_slice());
            prop_assert_eq!(framer.buffered(), 0);
        }
    }
}
