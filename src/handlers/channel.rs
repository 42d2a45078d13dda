//! Channel membership and topic: JOIN, PART, TOPIC.

use irczt_proto::{Lexer, Response};

use super::require;
use crate::error::HandlerResult;
use crate::state::{ServerState, UserId};

pub(super) fn join(state: &mut ServerState, uid: UserId, lex: &mut Lexer<'_>) -> HandlerResult {
    let list = require(lex, "JOIN")?;
    let mut items = Lexer::new(list);
    while let Some(name) = items.read_list_item() {
        if state.channel(name).is_none() {
            state.reply(
                uid,
                Response::ERR_NOSUCHCHANNEL,
                vec![name.to_string()],
                "No such channel",
            );
            continue;
        }
        let already_member = state
            .user(uid)
            .map(|u| u.channels.contains(name))
            .unwrap_or(false);
        if already_member {
            continue;
        }
        state.join_channel(uid, name);
    }
    Ok(())
}

pub(super) fn part(state: &mut ServerState, uid: UserId, lex: &mut Lexer<'_>) -> HandlerResult {
    let list = require(lex, "PART")?.to_string();
    // The part message defaults to the departing user's own nickname.
    let message = match lex.read_param() {
        Some(m) => m.to_string(),
        None => state
            .user(uid)
            .map(|u| u.nickname().to_string())
            .unwrap_or_default(),
    };

    let mut items = Lexer::new(&list);
    while let Some(name) = items.read_list_item() {
        if state.channel(name).is_none() {
            state.reply(
                uid,
                Response::ERR_NOSUCHCHANNEL,
                vec![name.to_string()],
                "No such channel",
            );
            continue;
        }
        let is_member = state
            .user(uid)
            .map(|u| u.channels.contains(name))
            .unwrap_or(false);
        if !is_member {
            state.reply(
                uid,
                Response::ERR_NOTONCHANNEL,
                vec![name.to_string()],
                "You're not on that channel",
            );
            continue;
        }
        state.part_channel(uid, name, &message);
    }
    Ok(())
}

pub(super) fn topic(state: &mut ServerState, uid: UserId, lex: &mut Lexer<'_>) -> HandlerResult {
    let name = require(lex, "TOPIC")?;
    let topic = lex.read_param();

    if state.channel(name).is_none() {
        state.reply(
            uid,
            Response::ERR_NOSUCHCHANNEL,
            vec![name.to_string()],
            "No such channel",
        );
        return Ok(());
    }

    match topic {
        // An empty topic argument clears the topic; either way every member
        // hears about the new state.
        Some(text) => {
            let new = if text.is_empty() {
                None
            } else {
                Some(text.to_string())
            };
            state.set_topic(name, new);
        }
        None => state.send_topic_reply(uid, name),
    }
    Ok(())
}
