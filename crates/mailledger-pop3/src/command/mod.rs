//! POP3 command builder.

use std::fmt;

use crate::{Error, Result};

/// POP3 command (RFC 1939).
#[derive(Clone, PartialEq, Eq)]
pub enum Command {
    /// USER - Name the maildrop
    User {
        /// Mailbox name
        username: String,
    },
    /// PASS - Password for the named maildrop
    Pass {
        /// Password
        password: String,
    },
    /// STAT - Maildrop size summary
    Stat,
    /// LIST - Scan listing, for one message or all of them
    List {
        /// Message number; `None` lists every message
        msg: Option<u32>,
    },
    /// RETR - Retrieve a message
    Retr {
        /// Message number
        msg: u32,
    },
    /// DELE - Mark a message as deleted
    Dele {
        /// Message number
        msg: u32,
    },
    /// NOOP - No operation
    Noop,
    /// RSET - Unmark deleted messages
    Rset,
    /// QUIT - Enter UPDATE state and close
    Quit,
}

impl Command {
    /// Returns the command verb.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::User { .. } => "USER",
            Self::Pass { .. } => "PASS",
            Self::Stat => "STAT",
            Self::List { .. } => "LIST",
            Self::Retr { .. } => "RETR",
            Self::Dele { .. } => "DELE",
            Self::Noop => "NOOP",
            Self::Rset => "RSET",
            Self::Quit => "QUIT",
        }
    }

    /// Returns true if a positive reply carries a dot-terminated body.
    #[must_use]
    pub const fn expects_multiline(&self) -> bool {
        matches!(self, Self::List { msg: None } | Self::Retr { .. })
    }

    /// Checks that the argument fits on one command line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if a USER or PASS argument contains
    /// CR or LF, which would put a second command on the wire.
    pub fn validate(&self) -> Result<()> {
        let argument = match self {
            Self::User { username } => username,
            Self::Pass { password } => password,
            _ => return Ok(()),
        };

        if argument.contains(['\r', '\n']) {
            return Err(Error::InvalidArgument {
                command: self.name(),
                reason: "contains CR or LF",
            });
        }
        Ok(())
    }

    /// Serializes the command to `VERB[ SP ARGUMENT]CRLF`.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(16);
        buf.extend_from_slice(self.name().as_bytes());

        match self {
            Self::User { username } => {
                buf.push(b' ');
                buf.extend_from_slice(username.as_bytes());
            }
            Self::Pass { password } => {
                buf.push(b' ');
                buf.extend_from_slice(password.as_bytes());
            }
            Self::List { msg: Some(msg) } | Self::Retr { msg } | Self::Dele { msg } => {
                buf.extend_from_slice(format!(" {msg}").as_bytes());
            }
            Self::Stat | Self::List { msg: None } | Self::Noop | Self::Rset | Self::Quit => {}
        }

        buf.extend_from_slice(b"\r\n");
        buf
    }
}

// Keeps passwords out of logs.
impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User { username } => write!(f, "USER {username}"),
            Self::Pass { .. } => f.write_str("PASS <redacted>"),
            Self::List { msg: Some(msg) } => write!(f, "LIST {msg}"),
            Self::Retr { msg } => write!(f, "RETR {msg}"),
            Self::Dele { msg } => write!(f, "DELE {msg}"),
            _ => f.write_str(self.name()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_user_command() {
        let cmd = Command::User {
            username: "alice".to_string(),
        };
        assert_eq!(cmd.serialize(), b"USER alice\r\n");
    }

    #[test]
    fn test_pass_command() {
        let cmd = Command::Pass {
            password: "s3cret".to_string(),
        };
        assert_eq!(cmd.serialize(), b"PASS s3cret\r\n");
    }

    #[test]
    fn test_stat_command() {
        assert_eq!(Command::Stat.serialize(), b"STAT\r\n");
    }

    #[test]
    fn test_list_commands() {
        assert_eq!(Command::List { msg: None }.serialize(), b"LIST\r\n");
        assert_eq!(Command::List { msg: Some(7) }.serialize(), b"LIST 7\r\n");
    }

    #[test]
    fn test_retr_dele_commands() {
        assert_eq!(Command::Retr { msg: 12 }.serialize(), b"RETR 12\r\n");
        assert_eq!(Command::Dele { msg: 3 }.serialize(), b"DELE 3\r\n");
    }

    #[test]
    fn test_bare_commands() {
        assert_eq!(Command::Noop.serialize(), b"NOOP\r\n");
        assert_eq!(Command::Rset.serialize(), b"RSET\r\n");
        assert_eq!(Command::Quit.serialize(), b"QUIT\r\n");
    }

    #[test]
    fn test_expects_multiline() {
        assert!(Command::List { msg: None }.expects_multiline());
        assert!(Command::Retr { msg: 1 }.expects_multiline());
        assert!(!Command::List { msg: Some(1) }.expects_multiline());
        assert!(!Command::Stat.expects_multiline());
        assert!(!Command::Dele { msg: 1 }.expects_multiline());
    }

    #[test]
    fn test_validate_rejects_line_breaks() {
        let cmd = Command::User {
            username: "alice\r\nDELE 1".to_string(),
        };
        assert!(matches!(
            cmd.validate(),
            Err(Error::InvalidArgument { command: "USER", .. })
        ));

        let cmd = Command::Pass {
            password: "wrong\n".to_string(),
        };
        let err = cmd.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { command: "PASS", .. }));
        assert!(!err.to_string().contains("wrong"));

        assert!(
            Command::User {
                username: "alice".to_string()
            }
            .validate()
            .is_ok()
        );
        assert!(Command::Retr { msg: 1 }.validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_password() {
        let cmd = Command::Pass {
            password: "hunter2".to_string(),
        };
        assert_eq!(format!("{cmd:?}"), "PASS <redacted>");
        assert_eq!(format!("{:?}", Command::Retr { msg: 4 }), "RETR 4");
    }
}
