//! Payload parsing for STAT, LIST and RETR replies.

use crate::error::{Error, Result};
use crate::types::{Listing, Reply, Stat};

/// Parses `+OK <count> <octets>`.
///
/// # Errors
///
/// Returns [`Error::Protocol`] if either field is missing or not a number.
pub fn parse_stat(reply: &Reply) -> Result<Stat> {
    let mut fields = reply.message().split_whitespace();
    let count = parse_field(fields.next(), "STAT count", reply)?;
    let octets = parse_field(fields.next(), "STAT size", reply)?;
    Ok(Stat { count, octets })
}

/// Parses the single-line answer to `LIST <n>`: `+OK <n> <size>`.
///
/// # Errors
///
/// Returns [`Error::Protocol`] if either field is missing or not a number.
pub fn parse_list_entry(reply: &Reply) -> Result<Listing> {
    let mut fields = reply.message().split_whitespace();
    let seq = parse_field(fields.next(), "LIST message number", reply)?;
    let size = parse_field(fields.next(), "LIST size", reply)?;

    let mut listing = Listing::new();
    listing.insert(seq, size);
    Ok(listing)
}

/// Parses the body of a multi-line LIST reply.
///
/// Each line is `<seq> <size>`. Lines with fewer than two fields, or with
/// fields that are not numbers, are skipped.
#[must_use]
pub fn parse_listing(reply: &Reply) -> Listing {
    body_lines(&reply.text)
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let seq: u32 = fields.next()?.parse().ok()?;
            let size: u64 = fields.next()?.parse().ok()?;
            Some((seq, size))
        })
        .collect()
}

/// Returns the message count the status line of a LIST reply announces.
///
/// Servers commonly answer `+OK 2 messages (320 octets)`; the text after
/// `+OK` is free-form, so `None` is not an error.
#[must_use]
pub fn announced_count(reply: &Reply) -> Option<usize> {
    reply.message().split_whitespace().next()?.parse().ok()
}

/// Extracts the body of a multi-line reply and reverses dot-stuffing.
///
/// The body is everything between the status line's CRLF and the
/// `CRLF.CRLF` terminator. Lines the server prefixed with an extra `.` have
/// it removed.
#[must_use]
pub fn extract_body(reply: &Reply) -> String {
    unstuff(raw_body(&reply.text))
}

/// Body between the status line and the terminator, as sent.
fn raw_body(text: &str) -> &str {
    let Some(line_end) = text.find("\r\n") else {
        return "";
    };
    let start = line_end + 2;
    let end = if text.ends_with("\r\n.\r\n") {
        text.len() - 5
    } else {
        text.len()
    };

    if end > start { &text[start..end] } else { "" }
}

fn body_lines(text: &str) -> impl Iterator<Item = &str> {
    raw_body(text).split("\r\n").filter(|line| !line.is_empty())
}

/// Removes one leading `.` from lines that start with `..`.
fn unstuff(body: &str) -> String {
    if !body.starts_with("..") && !body.contains("\r\n..") {
        return body.to_string();
    }

    body.split("\r\n")
        .map(|line| {
            line.strip_prefix('.')
                .filter(|rest| rest.starts_with('.'))
                .unwrap_or(line)
        })
        .collect::<Vec<_>>()
        .join("\r\n")
}

fn parse_field<T: std::str::FromStr>(field: Option<&str>, what: &str, reply: &Reply) -> Result<T> {
    field.and_then(|f| f.parse().ok()).ok_or_else(|| {
        Error::Protocol(format!("malformed {what} in reply: {}", reply.status_line()))
    })
}
