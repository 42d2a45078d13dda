//! Wire-level protocol support for the irczt daemon.
//!
//! This crate owns everything that touches raw bytes: the line codec that
//! reassembles `\r\n`-terminated messages from a TCP stream, the zero-copy
//! [`Lexer`] that splits one message into prefix / command / parameters,
//! the owned [`Message`] type used for outbound traffic, the numeric
//! [`Response`] codes, nickname validation, and the escape formatter used
//! when untrusted bytes end up in log output.

pub mod escape;
pub mod lexer;
pub mod line;
pub mod message;
pub mod nick;
pub mod response;

mod error;

pub use error::ProtocolError;
pub use lexer::Lexer;
pub use line::{LineCodec, MAX_LINE_LEN};
pub use message::Message;
pub use response::Response;
