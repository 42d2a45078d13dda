//! Message routing: PRIVMSG.

use irczt_proto::{Lexer, Response};

use super::require;
use crate::error::HandlerResult;
use crate::state::{ServerState, UserId};

pub(super) fn privmsg(state: &mut ServerState, uid: UserId, lex: &mut Lexer<'_>) -> HandlerResult {
    let targets = require(lex, "PRIVMSG")?;
    let text = require(lex, "PRIVMSG")?;

    let mut items = Lexer::new(targets);
    while let Some(target) = items.read_list_item() {
        if state.channel(target).is_some() {
            state.channel_privmsg(uid, target, text);
        } else if let Some(owner) = state.nick_owner(target) {
            state.privmsg_user(uid, owner, target, text);
        } else {
            state.reply(
                uid,
                Response::ERR_NOSUCHNICK,
                vec![target.to_string()],
                "No such nick/channel",
            );
        }
    }
    Ok(())
}
