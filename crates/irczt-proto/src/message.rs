//! Owned IRC message type used for outbound traffic.
//!
//! Implements the RFC 1459 shape:
//!
//! ```text
//! [':' prefix SPACE] command *(SPACE param) [SPACE ':' trailing]
//! ```
//!
//! The trailing parameter is kept as a separate field rather than folded
//! into `params`: a trailing parameter is always serialized with its `:`
//! marker even when it is a single word (`353 alice = #lobby :alice`),
//! while middle parameters never are (`:alice JOIN #lobby`).

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::error::ProtocolError;
use crate::response::Response;

/// An owned IRC message, without the `\r\n` terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Source prefix (server name or sender nickname), without the `:`.
    pub prefix: Option<String>,
    /// Command word or three-digit numeric.
    pub command: String,
    /// Middle parameters.
    pub params: Vec<String>,
    /// Trailing parameter; may be empty or contain spaces.
    pub trailing: Option<String>,
}

impl Message {
    /// A command relayed on behalf of a user, prefixed `:<nick>`.
    pub fn from_user(
        nick: impl Into<String>,
        command: impl Into<String>,
        params: Vec<String>,
        trailing: Option<String>,
    ) -> Self {
        Self {
            prefix: Some(nick.into()),
            command: command.into(),
            params,
            trailing,
        }
    }

    /// A numeric reply originated by the server, prefixed `:<host>`.
    ///
    /// Numeric replies always carry their final text as the trailing
    /// parameter.
    pub fn numeric(
        server: impl Into<String>,
        code: Response,
        params: Vec<String>,
        trailing: impl Into<String>,
    ) -> Self {
        Self {
            prefix: Some(server.into()),
            command: code.to_string(),
            params,
            trailing: Some(trailing.into()),
        }
    }

    /// An unprefixed `ERROR :<text>` line.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            prefix: None,
            command: "ERROR".to_string(),
            params: Vec::new(),
            trailing: Some(text.into()),
        }
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, ":{} ", prefix)?;
        }
        f.write_str(&self.command)?;
        for param in &self.params {
            write!(f, " {}", param)?;
        }
        if let Some(trailing) = &self.trailing {
            write!(f, " :{}", trailing)?;
        }
        Ok(())
    }
}

impl FromStr for Message {
    type Err = ProtocolError;

    /// Parse one message line (trailing `\r\n` tolerated).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut rest = s.trim_end_matches(['\r', '\n']);
        if rest.is_empty() {
            return Err(ProtocolError::MissingCommand);
        }

        let prefix = if let Some(after) = rest.strip_prefix(':') {
            match after.split_once(' ') {
                Some((p, r)) => {
                    rest = r;
                    Some(p.to_string())
                }
                None => return Err(ProtocolError::MissingCommand),
            }
        } else {
            None
        };

        let (command, mut rest) = match rest.split_once(' ') {
            Some((c, r)) => (c, r),
            None => (rest, ""),
        };
        if command.is_empty() {
            return Err(ProtocolError::MissingCommand);
        }

        let mut params = Vec::new();
        let mut trailing = None;
        while !rest.is_empty() {
            if let Some(t) = rest.strip_prefix(':') {
                trailing = Some(t.to_string());
                break;
            }
            match rest.split_once(' ') {
                Some((p, r)) => {
                    if !p.is_empty() {
                        params.push(p.to_string());
                    }
                    rest = r;
                }
                None => {
                    params.push(rest.to_string());
                    break;
                }
            }
        }

        Ok(Message {
            prefix,
            command: command.to_string(),
            params,
            trailing,
        })
    }
}
