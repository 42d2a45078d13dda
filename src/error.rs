//! Error handling for command dispatch.

use thiserror::Error;

/// Errors returned by command handlers.
///
/// Numeric command-level failures (unknown command, no such channel, bad
/// nickname, ...) are replied inline by the handlers and are not errors at
/// this level; the connection continues. The variants here are the cases
/// the dispatch wrapper in the server loop has to act on.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// A mandatory parameter was missing. The wrapper replies with a 461
    /// naming the command and the connection continues.
    #[error("not enough parameters for {command}")]
    NeedMoreParams { command: &'static str },

    /// The client asked to quit. An `ERROR` line has already been queued;
    /// the wrapper destroys the client, propagating this quit reason.
    #[error("client quit: {0}")]
    Quit(String),

    /// A fatal protocol violation (bad prefix, missing command). An
    /// `ERROR` line has already been queued; the wrapper destroys the
    /// client.
    #[error("malformed message: {0}")]
    Malformed(String),
}

/// Result type for command handlers.
pub type HandlerResult = Result<(), HandlerError>;
