//! IRC command dispatch.
//!
//! [`dispatch`] tokenizes one complete message line and routes it to the
//! matching handler. Command words are matched case-sensitively. Numeric
//! command-level errors are replied inline here and in the handler modules;
//! only missing-parameter and connection-fatal conditions surface as
//! [`HandlerError`] for the server loop to act on.

mod channel;
mod connection;
mod messaging;
mod server_query;

pub(crate) use connection::send_welcome_burst;

use tracing::warn;

use irczt_proto::escape::escape_untrusted;
use irczt_proto::{Lexer, Message, Response};

use crate::error::{HandlerError, HandlerResult};
use crate::state::{ServerState, UserId};

/// Process one message line from the client identified by `uid`.
///
/// A leading `:` prefix is accepted only when it names the sender's own
/// nickname; anything else is a protocol violation that terminates the
/// connection, as is a line with no command at all.
pub fn dispatch(state: &mut ServerState, uid: UserId, line: &str) -> HandlerResult {
    let mut lex = Lexer::new(line);

    if line.starts_with(':') {
        let word = lex.read_word().unwrap_or(":");
        let prefix = &word[1..];
        let matches_nick = state
            .user(uid)
            .map(|u| u.nickname() == prefix)
            .unwrap_or(false);
        if !matches_nick {
            warn!(prefix = %escape_untrusted(prefix), "message prefix does not match the nickname");
            state.send_to(
                uid,
                Message::error("Message prefix does not match the nickname"),
            );
            return Err(HandlerError::Malformed("prefix mismatch".into()));
        }
    }

    let Some(command) = lex.read_word() else {
        state.send_to(uid, Message::error("No command specified"));
        return Err(HandlerError::Malformed("no command".into()));
    };

    let registered = state
        .user(uid)
        .map(|u| u.is_registered())
        .unwrap_or(false);
    if !registered && !matches!(command, "NICK" | "USER" | "QUIT") {
        state.reply(
            uid,
            Response::ERR_NOTREGISTERED,
            Vec::new(),
            "You have not registered",
        );
        return Ok(());
    }

    let result = match command {
        "NICK" => connection::nick(state, uid, &mut lex),
        "USER" => connection::user(state, uid, &mut lex),
        "QUIT" => connection::quit(state, uid, &mut lex),
        "LIST" => server_query::list(state, uid, &mut lex),
        "JOIN" => channel::join(state, uid, &mut lex),
        "PART" => channel::part(state, uid, &mut lex),
        "WHO" => server_query::who(state, uid, &mut lex),
        "TOPIC" => channel::topic(state, uid, &mut lex),
        "PRIVMSG" => messaging::privmsg(state, uid, &mut lex),
        unknown => {
            warn!(command = %escape_untrusted(unknown), "unknown command");
            state.reply(
                uid,
                Response::ERR_UNKNOWNCOMMAND,
                vec![unknown.to_string()],
                "Unknown command",
            );
            Ok(())
        }
    };

    if result.is_ok() {
        accept_end_of_message(&lex);
    }
    result
}

/// Log-only complaint about bytes left over after a handler consumed its
/// parameters.
fn accept_end_of_message(lex: &Lexer<'_>) {
    let rest = lex.rest();
    if !rest.trim_matches(' ').is_empty() {
        warn!(rest = %escape_untrusted(rest), "trailing bytes after command parameters");
    }
}

/// Read a mandatory parameter, converting absence into the 461 path.
fn require<'a>(lex: &mut Lexer<'a>, command: &'static str) -> Result<&'a str, HandlerError> {
    lex.read_param()
        .ok_or(HandlerError::NeedMoreParams { command })
}
