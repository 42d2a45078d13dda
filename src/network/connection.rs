//! Per-connection I/O task.
//!
//! Each accepted socket gets one task that owns the framed stream. Inbound
//! complete lines are forwarded to the server task as [`Event`]s; outbound
//! messages queued by the server are written here. The task ends when the
//! peer hangs up, the stream turns malformed, or the server drops the
//! session's sender, in which case the remaining queued messages are
//! flushed before the socket closes.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tracing::{debug, warn};

use irczt_proto::{LineCodec, Message, ProtocolError};

use crate::state::UserId;

/// Events flowing from connection tasks to the server task.
#[derive(Debug)]
pub enum Event {
    /// A complete message line arrived from this client.
    Line { uid: UserId, line: String },
    /// The connection is gone: EOF, protocol violation, or I/O failure.
    Hangup { uid: UserId },
}

/// Drive one client socket until either side is done with it.
pub async fn run(
    uid: UserId,
    stream: TcpStream,
    mut outgoing: mpsc::UnboundedReceiver<Message>,
    events: mpsc::UnboundedSender<Event>,
) {
    let mut framed = Framed::new(stream, LineCodec::new());
    loop {
        tokio::select! {
            frame = framed.next() => match frame {
                Some(Ok(line)) => {
                    if events.send(Event::Line { uid, line }).is_err() {
                        break;
                    }
                }
                Some(Err(err)) => {
                    match &err {
                        ProtocolError::MessageTooLong | ProtocolError::MalformedMessage => {
                            warn!(uid, error = %err, "protocol violation");
                            let _ = framed.send(Message::error(err.to_string())).await;
                        }
                        _ => debug!(uid, error = %err, "read error"),
                    }
                    let _ = events.send(Event::Hangup { uid });
                    break;
                }
                None => {
                    debug!(uid, "client disconnected");
                    let _ = events.send(Event::Hangup { uid });
                    break;
                }
            },
            msg = outgoing.recv() => match msg {
                Some(msg) => {
                    if framed.send(msg).await.is_err() {
                        let _ = events.send(Event::Hangup { uid });
                        break;
                    }
                }
                // The server dropped the session. Everything it queued has
                // been received and written; close the socket.
                None => break,
            },
        }
    }
}
