//! Protocol-level errors.

use thiserror::Error;

/// Errors raised while framing or parsing the byte stream.
///
/// The `Display` text of the framing variants is sent verbatim to the peer
/// in an `ERROR :<text>` line before the connection is closed, so the
/// wording here is part of the wire behavior.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// More than 512 bytes accumulated without a message terminator.
    #[error("Message is too long")]
    MessageTooLong,

    /// A carriage return not followed by a line feed, or a message the
    /// tokenizer rejects outright.
    #[error("Malformed message")]
    MalformedMessage,

    /// An empty line or a line with a prefix but no command.
    #[error("No command specified")]
    MissingCommand,

    #[error("{0}")]
    Io(#[from] std::io::Error),
}
