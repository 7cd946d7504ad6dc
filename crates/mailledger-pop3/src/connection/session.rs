//! POP3 session: command execution, state tracking and mailbox operations.
//!
//! ## Design
//!
//! A POP3 connection alternates strictly between one command and its reply.
//! The transport and its framer sit behind an async mutex; a command takes
//! the lock with `try_lock` and holds the guard until its reply is framed,
//! so a second command issued while one is in flight fails with
//! [`Error::Busy`] instead of interleaving on the wire. The guard is
//! released on every exit path, including when the command's future is
//! dropped.
//!
//! Mailbox operations take `&self`; `login` and `quit` take `&mut self`.
//!
//! ## Example
//!
//! ```ignore
//! use mailledger_pop3::{Config, Session};
//!
//! let config = Config::new("pop.example.com");
//! let mut session = Session::connect(&config).await?;
//! session.login("user@example.com", "password").await?;
//!
//! let stat = session.stat().await?;
//! println!("{} messages, {} octets", stat.count, stat.octets);
//!
//! let mut drain = session.drain();
//! while let Some(message) = drain.next().await {
//!     println!("{} bytes", message?.len());
//! }
//!
//! session.quit().await?;
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use super::drain::Drain;
use super::stream::{Pop3Stream, connect_tls};
use super::timeout::{with_optional_timeout, with_timeout};
use super::Config;
use crate::command::Command;
use crate::parser::{
    ResponseFramer, announced_count, extract_body, parse_list_entry, parse_listing, parse_stat,
};
use crate::types::{Listing, Reply, SessionState, Stat};
use crate::{Error, Result};

/// Size of each read from the transport.
const READ_CHUNK_SIZE: usize = 8192;

/// Stream plus the framer holding bytes read from it.
struct Transport<S> {
    stream: S,
    framer: ResponseFramer,
    /// Set from the write of a command until its reply is framed. Still set
    /// on entry means the previous command was dropped mid-flight.
    awaiting_reply: bool,
}

impl<S> Transport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    const fn new(stream: S, framer: ResponseFramer) -> Self {
        Self {
            stream,
            framer,
            awaiting_reply: false,
        }
    }

    /// Writes one command and reads its reply.
    async fn round_trip(&mut self, command: &Command) -> Result<Reply> {
        if self.awaiting_reply {
            return Err(Error::ConnectionLost(
                "previous command was abandoned before its reply arrived".into(),
            ));
        }

        self.awaiting_reply = true;
        self.stream.write_all(&command.serialize()).await?;
        self.stream.flush().await?;

        let reply = self.read_reply(command.expects_multiline()).await?;
        self.awaiting_reply = false;
        Ok(reply)
    }

    /// Pulls bytes into the framer until it yields a reply.
    async fn read_reply(&mut self, multiline: bool) -> Result<Reply> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            if let Some(reply) = self.framer.next_reply(multiline)? {
                return Ok(reply);
            }

            let n = self.stream.read(&mut chunk).await?;
            if n == 0 {
                return Err(Error::ConnectionLost("connection closed by server".into()));
            }
            self.framer.extend(&chunk[..n]);
        }
    }
}

/// Session state readable while a command holds the transport.
#[derive(Debug, Default)]
struct StateCell(AtomicU8);

impl StateCell {
    fn get(&self) -> SessionState {
        SessionState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn set(&self, state: SessionState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

/// A POP3 session over a stream `S`.
///
/// Normally `S` is [`Pop3Stream`]; any `AsyncRead + AsyncWrite` stream works,
/// which is how the tests drive it.
pub struct Session<S = Pop3Stream> {
    /// `None` once the session is disconnected.
    transport: Mutex<Option<Transport<S>>>,
    state: StateCell,
    username: Option<String>,
    host: String,
    port: u16,
    command_timeout: Option<Duration>,
}

impl Session<Pop3Stream> {
    /// Connects with implicit TLS and reads the greeting.
    ///
    /// The TLS handshake and the greeting each get
    /// [`Config::connect_timeout`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if either step is too slow, a transport or
    /// TLS error if the connection or certificate validation fails, and
    /// [`Error::Greeting`] if the server greets with `-ERR`.
    pub async fn connect(config: &Config) -> Result<Self> {
        let stream = with_timeout(
            "connect",
            config.connect_timeout,
            connect_tls(&config.host, config.port),
        )
        .await?;

        Self::from_stream(stream, config).await
    }
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a session over an open stream and reads the greeting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if no greeting arrives within
    /// [`Config::connect_timeout`], or [`Error::Greeting`] if it is negative.
    pub async fn from_stream(stream: S, config: &Config) -> Result<Self> {
        let mut transport = Transport::new(
            stream,
            ResponseFramer::with_max_reply_size(config.max_reply_size),
        );

        let greeting = with_timeout(
            "greeting",
            config.connect_timeout,
            transport.read_reply(false),
        )
        .await?;
        if !greeting.is_ok() {
            return Err(Error::Greeting(greeting.text));
        }

        tracing::info!(host = %config.host, port = config.port, "connected");

        Ok(Self {
            transport: Mutex::new(Some(transport)),
            state: StateCell(AtomicU8::new(SessionState::Connected as u8)),
            username: None,
            host: config.host.clone(),
            port: config.port,
            command_timeout: config.command_timeout,
        })
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    /// Returns true until the session is disconnected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() != SessionState::Disconnected
    }

    /// Returns true after a successful login.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }

    /// Returns the authenticated username.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Returns the server hostname.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the server port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Authenticates with USER then PASS.
    ///
    /// On failure the session stays in the connected state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] unless connected and not yet
    /// authenticated, [`Error::InvalidArgument`] if either argument contains
    /// CR or LF (nothing is sent), or [`Error::Command`] if either command
    /// is refused.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<()> {
        self.require(SessionState::Connected)?;

        let user = Command::User {
            username: username.to_string(),
        };
        let pass = Command::Pass {
            password: password.to_string(),
        };
        user.validate()?;
        pass.validate()?;

        self.execute(user).await?;
        self.execute(pass).await?;

        self.state.set(SessionState::Authenticated);
        self.username = Some(username.to_string());
        tracing::info!(user = username, "authenticated");

        Ok(())
    }

    /// Returns the message count and mailbox size.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] unless authenticated, or an error if
    /// the command fails or the reply is malformed.
    pub async fn stat(&self) -> Result<Stat> {
        self.require(SessionState::Authenticated)?;
        let reply = self.execute(Command::Stat).await?;
        parse_stat(&reply)
    }

    /// Returns the number of messages in the mailbox.
    ///
    /// # Errors
    ///
    /// Same as [`stat`](Self::stat).
    pub async fn count(&self) -> Result<u32> {
        Ok(self.stat().await?.count)
    }

    /// Lists the size of every message.
    ///
    /// The count is the number of listed entries. A different count on the
    /// status line is logged and otherwise ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] unless authenticated, or an error if
    /// the command fails.
    pub async fn list(&self) -> Result<Listing> {
        self.require(SessionState::Authenticated)?;
        let reply = self.execute(Command::List { msg: None }).await?;

        let listing = parse_listing(&reply);
        if let Some(announced) = announced_count(&reply)
            && announced != listing.count()
        {
            tracing::warn!(
                announced,
                listed = listing.count(),
                "LIST count differs from listed entries"
            );
        }

        Ok(listing)
    }

    /// Lists the size of one message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] unless authenticated, [`Error::Command`]
    /// if there is no such message, or [`Error::Protocol`] if the reply is
    /// malformed.
    pub async fn list_one(&self, msg: u32) -> Result<Listing> {
        self.require(SessionState::Authenticated)?;
        let reply = self.execute(Command::List { msg: Some(msg) }).await?;
        parse_list_entry(&reply)
    }

    /// Retrieves a message.
    ///
    /// Returns the text between the status line and the terminating dot,
    /// with dot-stuffing removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] unless authenticated, or
    /// [`Error::Command`] if there is no such message.
    pub async fn retr(&self, msg: u32) -> Result<String> {
        self.require(SessionState::Authenticated)?;
        let reply = self.execute(Command::Retr { msg }).await?;
        let message = extract_body(&reply);

        tracing::debug!(
            msg,
            user = self.username().unwrap_or_default(),
            bytes = message.len(),
            "retrieved message"
        );

        Ok(message)
    }

    /// Marks a message as deleted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] unless authenticated, or
    /// [`Error::Command`] if the server refuses.
    pub async fn dele(&self, msg: u32) -> Result<()> {
        self.require(SessionState::Authenticated)?;
        self.execute(Command::Dele { msg }).await?;
        Ok(())
    }

    /// Sends NOOP.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] unless authenticated.
    pub async fn noop(&self) -> Result<()> {
        self.require(SessionState::Authenticated)?;
        self.execute(Command::Noop).await?;
        Ok(())
    }

    /// Unmarks all messages marked as deleted in this session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] unless authenticated.
    pub async fn rset(&self) -> Result<()> {
        self.require(SessionState::Authenticated)?;
        self.execute(Command::Rset).await?;
        Ok(())
    }

    /// Retrieves and deletes every listed message, one at a time.
    ///
    /// Nothing is sent until the first [`Drain::next`].
    #[must_use]
    pub const fn drain(&self) -> Drain<'_, S> {
        Drain::new(self)
    }

    /// Sends QUIT and closes the connection.
    ///
    /// Does nothing if already disconnected. The transport is shut down and
    /// the session disconnected even if QUIT fails.
    ///
    /// # Errors
    ///
    /// Returns the QUIT command's error, after cleanup.
    pub async fn quit(&mut self) -> Result<()> {
        if self.state() == SessionState::Disconnected {
            return Ok(());
        }

        let result = self.execute(Command::Quit).await;

        if let Some(mut transport) = self.transport.get_mut().take() {
            if let Err(e) = transport.stream.shutdown().await {
                tracing::debug!(?e, "shutdown failed");
            }
            tracing::info!(host = %self.host, "connection closed");
        }
        self.state.set(SessionState::Disconnected);

        result.map(|_| ())
    }

    /// Fails with [`Error::InvalidState`] unless in `expected`.
    pub(crate) fn require(&self, expected: SessionState) -> Result<()> {
        let actual = self.state();
        if actual == expected {
            Ok(())
        } else {
            Err(Error::InvalidState { expected, actual })
        }
    }

    /// Runs one command to completion.
    ///
    /// Fails with [`Error::InvalidArgument`] before touching the transport
    /// if the command does not fit on one line, with [`Error::Busy`] if
    /// another command holds the transport, and maps `-ERR` to [`Error::Command`]. Transport failures, framing
    /// errors and timeouts disconnect the session.
    async fn execute(&self, command: Command) -> Result<Reply> {
        let name = command.name();
        command.validate()?;

        let mut slot = self
            .transport
            .try_lock()
            .map_err(|_| Error::Busy { command: name })?;

        tracing::debug!(command = ?command, "sending");

        let result = match slot.as_mut() {
            Some(transport) => {
                with_optional_timeout(name, self.command_timeout, transport.round_trip(&command))
                    .await
            }
            None => Err(Error::ConnectionLost("session is disconnected".into())),
        };

        match result {
            Ok(reply) if reply.is_ok() => Ok(reply),
            Ok(reply) => Err(Error::command(name, reply.text)),
            Err(err) => {
                if slot.take().is_some() {
                    match &err {
                        Error::ConnectionLost(reason) => {
                            tracing::info!(
                                host = %self.host,
                                reason = %reason,
                                "connection closed"
                            );
                        }
                        Error::Timeout { .. } => {
                            tracing::warn!(
                                command = name,
                                "no reply before deadline, abandoning session"
                            );
                        }
                        other => tracing::warn!(error = %other, "socket error"),
                    }
                }
                self.state.set(SessionState::Disconnected);
                Err(err)
            }
        }
    }
}

impl<S> fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("state", &self.state.get())
            .field("username", &self.username)
            .finish_non_exhaustive()
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
    use tokio_test::io::{Builder, Mock};

    fn config() -> Config {
        Config::new("pop.example.com")
    }

    async fn authenticated(mock: Mock) -> Session<Mock> {
        let mut session = Session::from_stream(mock, &config()).await.unwrap();
        session.login("alice", "secret").await.unwrap();
        session
    }

    fn login_script() -> Builder {
        let mut builder = Builder::new();
        builder
            .read(b"+OK POP3 server ready\r\n")
            .write(b"USER alice\r\n")
            .read(b"+OK\r\n")
            .write(b"PASS secret\r\n")
            .read(b"+OK maildrop locked\r\n");
        builder
    }

    #[tokio::test]
    async fn test_greeting_sets_connected() {
        let mock = Builder::new().read(b"+OK ready\r\n").build();
        let session = Session::from_stream(mock, &config()).await.unwrap();
        assert_eq!(session.state(), SessionState::Connected);
        assert_eq!(session.host(), "pop.example.com");
        assert_eq!(session.port(), 995);
    }

    #[tokio::test]
    async fn test_negative_greeting() {
        let mock = Builder::new().read(b"-ERR go away\r\n").build();
        let err = Session::from_stream(mock, &config()).await.unwrap_err();
        assert!(matches!(err, Error::Greeting(ref text) if text == "-ERR go away\r\n"));
    }

    #[tokio::test]
    async fn test_greeting_in_pieces() {
        let mock = Builder::new().read(b"+O").read(b"K hi\r\n").build();
        let session = Session::from_stream(mock, &config()).await.unwrap();
        assert!(session.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_greeting_timeout() {
        let (client, _server) = tokio::io::duplex(64);
        let err = Session::from_stream(client, &config()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Timeout {
                operation: "greeting",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_connect_timeout_when_handshake_stalls() {
        // The listener never accepts, so the TCP connect completes but the
        // TLS handshake waits forever for a ServerHello.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let config = Config::builder("127.0.0.1")
            .port(port)
            .connect_timeout(Duration::from_millis(200))
            .build();

        let err = Session::connect(&config).await.unwrap_err();
        match err {
            Error::Timeout { operation, after } => {
                assert_eq!(operation, "connect");
                assert_eq!(after, Duration::from_millis(200));
            }
            other => panic!("unexpected error: {other}"),
        }
        drop(listener);
    }

    #[tokio::test]
    async fn test_login() {
        let session = authenticated(login_script().build()).await;
        assert_eq!(session.state(), SessionState::Authenticated);
        assert_eq!(session.username(), Some("alice"));
    }

    #[tokio::test]
    async fn test_login_rejected_stays_connected() {
        let mock = Builder::new()
            .read(b"+OK ready\r\n")
            .write(b"USER alice\r\n")
            .read(b"+OK\r\n")
            .write(b"PASS wrong\r\n")
            .read(b"-ERR invalid password\r\n")
            .build();
        let mut session = Session::from_stream(mock, &config()).await.unwrap();

        let err = session.login("alice", "wrong").await.unwrap_err();
        assert!(matches!(err, Error::Command { command: "PASS", .. }));
        assert_eq!(session.state(), SessionState::Connected);
        assert_eq!(session.username(), None);
    }

    #[tokio::test]
    async fn test_login_with_line_break_sends_nothing() {
        // The mock fails on any unexpected write.
        let mock = Builder::new().read(b"+OK ready\r\n").build();
        let mut session = Session::from_stream(mock, &config()).await.unwrap();

        let err = session.login("alice\r\nDELE 1", "wrong").await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { command: "USER", .. }));
        assert_eq!(session.state(), SessionState::Connected);

        let err = session.login("alice", "secret\r\nDELE 1").await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { command: "PASS", .. }));
        assert_eq!(session.state(), SessionState::Connected);
        assert_eq!(session.username(), None);
    }

    #[tokio::test]
    async fn test_login_twice_is_invalid() {
        let mut session = authenticated(login_script().build()).await;
        let err = session.login("alice", "secret").await.unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidState {
                expected: SessionState::Connected,
                actual: SessionState::Authenticated,
            }
        ));
    }

    #[tokio::test]
    async fn test_stat_before_login() {
        let mock = Builder::new().read(b"+OK ready\r\n").build();
        let session = Session::from_stream(mock, &config()).await.unwrap();

        let err = session.stat().await.unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidState {
                expected: SessionState::Authenticated,
                actual: SessionState::Connected,
            }
        ));
    }

    #[tokio::test]
    async fn test_stat_after_login() {
        let mock = login_script()
            .write(b"STAT\r\n")
            .read(b"+OK 3 1200\r\n")
            .build();
        let session = authenticated(mock).await;

        let stat = session.stat().await.unwrap();
        assert_eq!(stat.count, 3);
        assert_eq!(stat.octets, 1200);
    }

    #[tokio::test]
    async fn test_count() {
        let mock = login_script()
            .write(b"STAT\r\n")
            .read(b"+OK 5 9000\r\n")
            .build();
        let session = authenticated(mock).await;
        assert_eq!(session.count().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_list_all() {
        let mock = login_script()
            .write(b"LIST\r\n")
            .read(b"+OK 2 messages\r\n1 200\r\n")
            .read(b"2 450\r\n.\r\n")
            .build();
        let session = authenticated(mock).await;

        let listing = session.list().await.unwrap();
        assert_eq!(listing.count(), 2);
        assert_eq!(listing.size_of(1), Some(200));
        assert_eq!(listing.size_of(2), Some(450));
    }

    #[tokio::test]
    async fn test_list_count_mismatch_trusts_entries() {
        let mock = login_script()
            .write(b"LIST\r\n")
            .read(b"+OK 5 messages\r\n1 200\r\n.\r\n")
            .build();
        let session = authenticated(mock).await;
        assert_eq!(session.list().await.unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_list_one() {
        let mock = login_script()
            .write(b"LIST 2\r\n")
            .read(b"+OK 2 450\r\n")
            .build();
        let session = authenticated(mock).await;

        let listing = session.list_one(2).await.unwrap();
        assert_eq!(listing.iter().collect::<Vec<_>>(), vec![(2, 450)]);
    }

    #[tokio::test]
    async fn test_retr() {
        let mock = login_script()
            .write(b"RETR 1\r\n")
            .read(b"+OK\r\nHello\r\nWorld\r\n.\r\n")
            .build();
        let session = authenticated(mock).await;
        assert_eq!(session.retr(1).await.unwrap(), "Hello\r\nWorld");
    }

    #[tokio::test]
    async fn test_retr_negative_reply() {
        let mock = login_script()
            .write(b"RETR 9\r\n")
            .read(b"-ERR no such message\r\n")
            .build();
        let session = authenticated(mock).await;

        let err = session.retr(9).await.unwrap_err();
        match err {
            Error::Command { command, response } => {
                assert_eq!(command, "RETR");
                assert_eq!(response, "-ERR no such message\r\n");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn test_dele_noop_rset() {
        let mock = login_script()
            .write(b"DELE 1\r\n")
            .read(b"+OK message 1 deleted\r\n")
            .write(b"NOOP\r\n")
            .read(b"+OK\r\n")
            .write(b"RSET\r\n")
            .read(b"+OK\r\n")
            .build();
        let session = authenticated(mock).await;

        session.dele(1).await.unwrap();
        session.noop().await.unwrap();
        session.rset().await.unwrap();
    }

    #[tokio::test]
    async fn test_quit() {
        let mock = login_script()
            .write(b"QUIT\r\n")
            .read(b"+OK bye\r\n")
            .build();
        let mut session = authenticated(mock).await;

        session.quit().await.unwrap();
        assert_eq!(session.state(), SessionState::Disconnected);
        // A second quit writes nothing.
        session.quit().await.unwrap();
    }

    #[tokio::test]
    async fn test_quit_failure_still_disconnects() {
        let mock = login_script()
            .write(b"QUIT\r\n")
            .read(b"-ERR some deleted messages not removed\r\n")
            .build();
        let mut session = authenticated(mock).await;

        let err = session.quit().await.unwrap_err();
        assert!(matches!(err, Error::Command { command: "QUIT", .. }));
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_server_eof_disconnects() {
        let mock = login_script().write(b"STAT\r\n").build();
        let session = authenticated(mock).await;

        let err = session.stat().await.unwrap_err();
        assert!(matches!(err, Error::ConnectionLost(_)));
        assert_eq!(session.state(), SessionState::Disconnected);

        let err = session.stat().await.unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidState {
                actual: SessionState::Disconnected,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_malformed_multiline_disconnects() {
        let mock = login_script()
            .write(b"LIST\r\n")
            .read(b"* 1 EXISTS\r\n")
            .build();
        let session = authenticated(mock).await;

        let err = session.list().await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
        assert!(!session.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_command_timeout_abandons_session() {
        let (client, mut server) = tokio::io::duplex(1024);
        let config = Config::builder("pop.example.com")
            .command_timeout(Duration::from_secs(60))
            .build();

        server.write_all(b"+OK ready\r\n").await.unwrap();
        let mut session = Session::from_stream(client, &config).await.unwrap();

        server.write_all(b"+OK\r\n+OK\r\n").await.unwrap();
        session.login("alice", "secret").await.unwrap();

        let err = session.stat().await.unwrap_err();
        assert!(matches!(err, Error::Timeout { operation: "STAT", .. }));
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_abandoned_command_is_detected() {
        let (client, mut server) = tokio::io::duplex(1024);
        server.write_all(b"+OK ready\r\n").await.unwrap();
        let mut session = Session::from_stream(client, &config()).await.unwrap();
        server.write_all(b"+OK\r\n+OK\r\n").await.unwrap();
        session.login("alice", "secret").await.unwrap();

        // Poll STAT once so it is written, then drop it before the reply.
        {
            let stat = session.stat();
            tokio::pin!(stat);
            assert!(poll_once(stat.as_mut()).await.is_none());
        }

        server.write_all(b"+OK 1 10\r\n").await.unwrap();
        let err = session.noop().await.unwrap_err();
        assert!(matches!(err, Error::ConnectionLost(_)));
        assert!(!session.is_connected());
    }

    /// Polls a future once, returning its output if it was ready.
    async fn poll_once<F: std::future::Future + Unpin>(mut fut: F) -> Option<F::Output> {
        std::future::poll_fn(|cx| {
            std::task::Poll::Ready(match std::pin::Pin::new(&mut fut).poll(cx) {
                std::task::Poll::Ready(out) => Some(out),
                std::task::Poll::Pending => None,
            })
        })
        .await
    }
}
