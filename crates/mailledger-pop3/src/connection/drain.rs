//! Retrieve-and-delete iteration over a mailbox.

use std::collections::VecDeque;

use tokio::io::{AsyncRead, AsyncWrite};

use super::Session;
use crate::Result;
use crate::types::SessionState;

/// Lazily retrieves and deletes every message listed at the start.
///
/// The first call to [`next`](Self::next) lists the mailbox once. Each call
/// then sends `RETR n` and `DELE n` for the next listed message and yields
/// its text, so a message is deleted before the next one is retrieved.
/// Stopping early leaves the remaining messages on the server. After an
/// error is yielded the drain is finished.
///
/// Created by [`Session::drain`]; each call starts a fresh listing.
#[derive(Debug)]
pub struct Drain<'a, S> {
    session: &'a Session<S>,
    /// `None` until the mailbox has been listed.
    pending: Option<VecDeque<u32>>,
    finished: bool,
}

impl<'a, S> Drain<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) const fn new(session: &'a Session<S>) -> Self {
        Self {
            session,
            pending: None,
            finished: false,
        }
    }

    /// Retrieves and deletes the next message.
    ///
    /// Returns `None` once every listed message has been drained, or after
    /// an error has been returned.
    pub async fn next(&mut self) -> Option<Result<String>> {
        if self.finished {
            return None;
        }

        match self.step().await {
            Ok(Some(message)) => Some(Ok(message)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }

    /// Number of listed messages not yet drained, once listed.
    #[must_use]
    pub fn remaining(&self) -> Option<usize> {
        self.pending.as_ref().map(VecDeque::len)
    }

    async fn step(&mut self) -> Result<Option<String>> {
        if self.pending.is_none() {
            self.session.require(SessionState::Authenticated)?;
            let listing = self.session.list().await?;
            self.pending = Some(listing.seqs().collect());
        }

        let Some(msg) = self.pending.as_mut().and_then(VecDeque::pop_front) else {
            return Ok(None);
        };

        let message = self.session.retr(msg).await?;
        self.session.dele(msg).await?;
        Ok(Some(message))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tokio_test::io::{Builder, Mock};

    use crate::Error;
    use crate::connection::{Config, Session};

    async fn session(mock: Mock) -> Session<Mock> {
        let mut session = Session::from_stream(mock, &Config::new("pop.example.com"))
            .await
            .unwrap();
        session.login("bob", "pw").await.unwrap();
        session
    }

    fn login() -> Builder {
        let mut builder = Builder::new();
        builder
            .read(b"+OK ready\r\n")
            .write(b"USER bob\r\n")
            .read(b"+OK\r\n")
            .write(b"PASS pw\r\n")
            .read(b"+OK\r\n");
        builder
    }

    #[tokio::test]
    async fn test_drain_two_messages() {
        let mock = login()
            .write(b"LIST\r\n")
            .read(b"+OK 2 messages\r\n1 5\r\n2 3\r\n.\r\n")
            .write(b"RETR 1\r\n")
            .read(b"+OK\r\nfirst\r\n.\r\n")
            .write(b"DELE 1\r\n")
            .read(b"+OK\r\n")
            .write(b"RETR 2\r\n")
            .read(b"+OK\r\ntwo\r\n.\r\n")
            .write(b"DELE 2\r\n")
            .read(b"+OK\r\n")
            .build();
        let session = session(mock).await;

        let mut drain = session.drain();
        assert_eq!(drain.remaining(), None);
        assert_eq!(drain.next().await.unwrap().unwrap(), "first");
        assert_eq!(drain.remaining(), Some(1));
        assert_eq!(drain.next().await.unwrap().unwrap(), "two");
        assert!(drain.next().await.is_none());
        assert!(drain.next().await.is_none());
    }

    #[tokio::test]
    async fn test_drain_empty_mailbox() {
        let mock = login()
            .write(b"LIST\r\n")
            .read(b"+OK 0 messages\r\n.\r\n")
            .build();
        let session = session(mock).await;

        let mut drain = session.drain();
        assert!(drain.next().await.is_none());
        assert_eq!(drain.remaining(), Some(0));
    }

    #[tokio::test]
    async fn test_drain_stops_early() {
        let mock = login()
            .write(b"LIST\r\n")
            .read(b"+OK\r\n1 5\r\n2 3\r\n.\r\n")
            .write(b"RETR 1\r\n")
            .read(b"+OK\r\nfirst\r\n.\r\n")
            .write(b"DELE 1\r\n")
            .read(b"+OK\r\n")
            .build();
        let session = session(mock).await;

        let mut drain = session.drain();
        let first = drain.next().await.unwrap().unwrap();
        assert_eq!(first, "first");
        drop(drain);
    }

    #[tokio::test]
    async fn test_drain_ends_after_error() {
        let mock = login()
            .write(b"LIST\r\n")
            .read(b"+OK\r\n1 5\r\n2 3\r\n.\r\n")
            .write(b"RETR 1\r\n")
            .read(b"-ERR message locked\r\n")
            .build();
        let session = session(mock).await;

        let mut drain = session.drain();
        let err = drain.next().await.unwrap().unwrap_err();
        assert!(matches!(err, Error::Command { command: "RETR", .. }));
        assert!(drain.next().await.is_none());
    }

    #[tokio::test]
    async fn test_drain_requires_login() {
        let mock = Builder::new().read(b"+OK ready\r\n").build();
        let session = Session::from_stream(mock, &Config::new("pop.example.com"))
            .await
            .unwrap();

        let mut drain = session.drain();
        let err = drain.next().await.unwrap().unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));
    }
}
