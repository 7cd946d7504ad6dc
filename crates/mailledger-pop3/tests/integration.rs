//! Integration tests for the POP3 session.
//!
//! These tests use a scripted stream to simulate a POP3 server without a
//! real connection. The stream records every command and panics if a command
//! arrives while the reply to the previous one is still unread.

use std::collections::VecDeque;
use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};

use mailledger_pop3::{Config, Error, Session, SessionState};

/// Mock server that answers each command from a script.
struct ScriptedStream {
    /// Expected command lines and the replies to send back.
    script: VecDeque<(&'static str, &'static [u8])>,
    /// Reply bytes not yet read by the client.
    reply: Cursor<Vec<u8>>,
    /// Bytes of a command line still being written.
    partial: Vec<u8>,
    /// Commands received, in order, without CRLF.
    log: Arc<Mutex<Vec<String>>>,
}

impl ScriptedStream {
    fn new(greeting: &[u8], script: &[(&'static str, &'static [u8])]) -> Self {
        Self {
            script: script.iter().copied().collect(),
            reply: Cursor::new(greeting.to_vec()),
            partial: Vec::new(),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.log)
    }

    fn reply_pending(&self) -> bool {
        (self.reply.position() as usize) < self.reply.get_ref().len()
    }
}

impl AsyncRead for ScriptedStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let data = self.reply.get_ref();
        let pos = self.reply.position() as usize;

        if pos >= data.len() {
            // Nothing scripted: behave like a closed connection.
            return Poll::Ready(Ok(()));
        }

        // Hand out small chunks to exercise incremental framing.
        let to_read = (data.len() - pos).min(buf.remaining()).min(7);
        buf.put_slice(&data[pos..pos + to_read]);
        self.reply.set_position((pos + to_read) as u64);

        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for ScriptedStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        assert!(
            !self.reply_pending(),
            "command written while the previous reply was still unread"
        );

        self.partial.extend_from_slice(buf);
        if self.partial.ends_with(b"\r\n") {
            let line = String::from_utf8(std::mem::take(&mut self.partial)).unwrap();
            let line = line.trim_end().to_string();

            let (expected, reply) = self
                .script
                .pop_front()
                .unwrap_or_else(|| panic!("unexpected command: {line}"));
            assert_eq!(line, expected);

            self.log.lock().unwrap().push(line);
            self.reply = Cursor::new(reply.to_vec());
        }

        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

const LOGIN: [(&str, &[u8]); 2] = [("USER alice", b"+OK\r\n"), ("PASS secret", b"+OK\r\n")];

fn config() -> Config {
    Config::new("pop.example.com")
}

async fn login(stream: ScriptedStream) -> Session<ScriptedStream> {
    let mut session = Session::from_stream(stream, &config()).await.unwrap();
    session.login("alice", "secret").await.unwrap();
    session
}

fn script(rest: &[(&'static str, &'static [u8])]) -> Vec<(&'static str, &'static [u8])> {
    LOGIN.iter().chain(rest).copied().collect()
}

#[tokio::test]
async fn test_drain_deletes_before_next_retrieval() {
    let stream = ScriptedStream::new(
        b"+OK POP3 ready\r\n",
        &script(&[
            ("LIST", b"+OK 2 messages (650 octets)\r\n1 200\r\n2 450\r\n.\r\n"),
            ("RETR 1", b"+OK 200 octets\r\nSubject: one\r\n\r\nfirst\r\n.\r\n"),
            ("DELE 1", b"+OK message 1 deleted\r\n"),
            ("RETR 2", b"+OK 450 octets\r\nSubject: two\r\n\r\nsecond\r\n.\r\n"),
            ("DELE 2", b"+OK message 2 deleted\r\n"),
            ("QUIT", b"+OK bye\r\n"),
        ]),
    );
    let log = stream.log();
    let mut session = login(stream).await;

    let mut bodies = Vec::new();
    let mut drain = session.drain();
    while let Some(message) = drain.next().await {
        bodies.push(message.unwrap());
    }
    drop(drain);
    assert_eq!(
        bodies,
        vec![
            "Subject: one\r\n\r\nfirst".to_string(),
            "Subject: two\r\n\r\nsecond".to_string()
        ]
    );

    session.quit().await.unwrap();
    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "USER alice",
            "PASS secret",
            "LIST",
            "RETR 1",
            "DELE 1",
            "RETR 2",
            "DELE 2",
            "QUIT"
        ]
    );
}

#[tokio::test]
async fn test_mailbox_session() {
    let stream = ScriptedStream::new(
        b"+OK ready\r\n",
        &script(&[
            ("STAT", b"+OK 3 1200\r\n"),
            ("LIST", b"+OK\r\n1 200\r\n2 450\r\n.\r\n"),
            ("LIST 2", b"+OK 2 450\r\n"),
            ("RETR 9", b"-ERR no such message\r\n"),
            ("RETR 2", b"+OK\r\nHello\r\nWorld\r\n.\r\n"),
        ]),
    );
    let session = login(stream).await;

    let stat = session.stat().await.unwrap();
    assert_eq!((stat.count, stat.octets), (3, 1200));

    let listing = session.list().await.unwrap();
    assert_eq!(listing.count(), 2);
    assert_eq!(listing.iter().collect::<Vec<_>>(), vec![(1, 200), (2, 450)]);

    let one = session.list_one(2).await.unwrap();
    assert_eq!(one.size_of(2), Some(450));

    match session.retr(9).await.unwrap_err() {
        Error::Command { command, response } => {
            assert_eq!(command, "RETR");
            assert_eq!(response, "-ERR no such message\r\n");
        }
        other => panic!("unexpected error: {other}"),
    }

    // A refused command leaves the session usable.
    assert_eq!(session.retr(2).await.unwrap(), "Hello\r\nWorld");
}

#[tokio::test]
async fn test_state_is_checked_before_sending() {
    let stream = ScriptedStream::new(b"+OK ready\r\n", &script(&[("STAT", b"+OK 0 0\r\n")]));
    let mut session = Session::from_stream(stream, &config()).await.unwrap();

    // Nothing is scripted for this; the stream would panic if STAT were sent.
    let err = session.stat().await.unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidState {
            expected: SessionState::Authenticated,
            actual: SessionState::Connected,
        }
    ));

    session.login("alice", "secret").await.unwrap();
    assert_eq!(session.stat().await.unwrap().count, 0);
}

#[tokio::test]
async fn test_quit_when_disconnected_sends_nothing() {
    let stream = ScriptedStream::new(b"+OK ready\r\n", &[("QUIT", b"+OK\r\n")]);
    let log = stream.log();
    let mut session = Session::from_stream(stream, &config()).await.unwrap();

    session.quit().await.unwrap();
    assert_eq!(session.state(), SessionState::Disconnected);
    session.quit().await.unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["QUIT"]);
}

#[tokio::test]
async fn test_concurrent_command_is_refused() {
    let (client, mut server) = tokio::io::duplex(1024);
    server.write_all(b"+OK ready\r\n+OK\r\n+OK\r\n").await.unwrap();

    let mut session = Session::from_stream(client, &config()).await.unwrap();
    session.login("alice", "secret").await.unwrap();

    let mut received = vec![0u8; "USER alice\r\nPASS secret\r\n".len()];
    server.read_exact(&mut received).await.unwrap();

    let server_side = async {
        let mut line = [0u8; 6];
        server.read_exact(&mut line).await.unwrap();
        assert_eq!(&line, b"STAT\r\n");
        server.write_all(b"+OK 1 10\r\n").await.unwrap();
    };

    // STAT is polled first and holds the session until its reply arrives.
    let (stat, noop, ()) = tokio::join!(session.stat(), session.noop(), server_side);

    assert_eq!(stat.unwrap().count, 1);
    assert!(matches!(noop.unwrap_err(), Error::Busy { command: "NOOP" }));

    // The refused command left nothing behind.
    server.write_all(b"+OK\r\n").await.unwrap();
    session.noop().await.unwrap();
    let mut line = [0u8; 6];
    server.read_exact(&mut line).await.unwrap();
    assert_eq!(&line, b"NOOP\r\n");
}

#[tokio::test]
async fn test_server_close_disconnects() {
    let stream = ScriptedStream::new(b"+OK ready\r\n", &script(&[("STAT", b"+OK 1 ")]));
    let session = login(stream).await;

    let err = session.stat().await.unwrap_err();
    assert!(matches!(err, Error::ConnectionLost(_)));
    assert!(err.is_fatal());
    assert_eq!(session.state(), SessionState::Disconnected);
}
