//! Server queries: LIST, WHO.

use irczt_proto::{Lexer, Response};

use super::require;
use crate::error::HandlerResult;
use crate::state::{Channel, ServerState, UserId};

pub(super) fn list(state: &mut ServerState, uid: UserId, lex: &mut Lexer<'_>) -> HandlerResult {
    let filter = lex.read_param().map(str::to_string);

    state.reply(
        uid,
        Response::RPL_LISTSTART,
        vec!["Channel".to_string()],
        "Users  Name",
    );
    match filter {
        // Named channels only; unknown names are skipped silently.
        Some(list) => {
            let mut items = Lexer::new(&list);
            while let Some(name) = items.read_list_item() {
                if let Some(channel) = state.channel(name) {
                    send_list_entry(state, uid, channel);
                }
            }
        }
        None => {
            for channel in state.channels() {
                send_list_entry(state, uid, channel);
            }
        }
    }
    state.reply(uid, Response::RPL_LISTEND, Vec::new(), "End of /LIST");
    Ok(())
}

fn send_list_entry(state: &ServerState, uid: UserId, channel: &Channel) {
    let topic = channel.topic.clone().unwrap_or_default();
    state.reply(
        uid,
        Response::RPL_LIST,
        vec![channel.name().to_string(), channel.member_count().to_string()],
        topic,
    );
}

pub(super) fn who(state: &mut ServerState, uid: UserId, lex: &mut Lexer<'_>) -> HandlerResult {
    let target = require(lex, "WHO")?;

    // Per-member lines only for a known channel target; the end marker is
    // sent unconditionally.
    if let Some(channel) = state.channel(target) {
        let host = state.server_name().to_string();
        for member in &channel.members {
            let Some(user) = state.user(*member) else {
                continue;
            };
            state.reply(
                uid,
                Response::RPL_WHOREPLY,
                vec![
                    target.to_string(),
                    user.username().to_string(),
                    "hidden".to_string(),
                    host.clone(),
                    user.nickname().to_string(),
                    "H".to_string(),
                ],
                format!("0 {}", user.realname()),
            );
        }
    }
    state.reply(
        uid,
        Response::RPL_ENDOFWHO,
        vec![target.to_string()],
        "End of /WHO list",
    );
    Ok(())
}
