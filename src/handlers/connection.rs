//! Registration and connection lifecycle: NICK, USER, QUIT.

use tracing::info;

use irczt_proto::nick::is_valid_nick;
use irczt_proto::{Lexer, Message, Response};

use super::require;
use crate::error::{HandlerError, HandlerResult};
use crate::state::{ServerState, UserId};

/// Fixed source of the post-registration welcome private message.
pub const SENTINEL_NICK: &str = "irczt-connect";

pub(super) fn nick(state: &mut ServerState, uid: UserId, lex: &mut Lexer<'_>) -> HandlerResult {
    let nick = match lex.read_param() {
        Some(n) if !n.is_empty() => n,
        _ => {
            state.reply(
                uid,
                Response::ERR_NONICKNAMEGIVEN,
                Vec::new(),
                "No nickname given",
            );
            return Ok(());
        }
    };

    if !is_valid_nick(nick) {
        state.reply(
            uid,
            Response::ERR_ERRONEUSNICKNAME,
            vec![nick.to_string()],
            "Erroneous nickname",
        );
        return Ok(());
    }

    if let Some(owner) = state.nick_owner(nick) {
        if owner != uid {
            state.reply(
                uid,
                Response::ERR_NICKNAMEINUSE,
                vec![nick.to_string()],
                "Nickname is already in use",
            );
        }
        // Re-asserting the current nickname is accepted without effect.
        return Ok(());
    }

    let was_registered = state
        .user(uid)
        .map(|u| u.is_registered())
        .unwrap_or(false);
    state.set_nick(uid, nick);
    info!(nick = %nick, "nickname set");
    if !was_registered {
        maybe_complete_registration(state, uid);
    }
    Ok(())
}

pub(super) fn user(state: &mut ServerState, uid: UserId, lex: &mut Lexer<'_>) -> HandlerResult {
    if state
        .user(uid)
        .map(|u| u.has_username())
        .unwrap_or(false)
    {
        state.reply(
            uid,
            Response::ERR_ALREADYREGISTRED,
            Vec::new(),
            "You may not reregister",
        );
        return Ok(());
    }

    let username = require(lex, "USER")?.to_string();
    let _mode = require(lex, "USER")?;
    let _unused = require(lex, "USER")?;
    let realname = require(lex, "USER")?.to_string();

    state.set_user(uid, username, realname);
    maybe_complete_registration(state, uid);
    Ok(())
}

pub(super) fn quit(state: &mut ServerState, uid: UserId, lex: &mut Lexer<'_>) -> HandlerResult {
    let message = lex.read_param().unwrap_or("Client quit").to_string();
    state.send_to(uid, Message::error(message.clone()));
    Err(HandlerError::Quit(message))
}

fn maybe_complete_registration(state: &mut ServerState, uid: UserId) {
    let registered = state
        .user(uid)
        .map(|u| u.is_registered())
        .unwrap_or(false);
    if registered {
        info!(
            nick = state.user(uid).map(|u| u.nickname()).unwrap_or("*"),
            "client registered"
        );
        send_welcome_burst(state, uid);
    }
}

/// The registration completion burst: LUSERS line, MOTD, and a greeting
/// private message from the connect sentinel. Bots run through the same
/// path and discard the output.
pub(crate) fn send_welcome_burst(state: &ServerState, uid: UserId) {
    let host = state.server_name().to_string();
    let users = state.registered_count();
    state.reply(
        uid,
        Response::RPL_LUSERCLIENT,
        Vec::new(),
        format!("There are {users} users and 0 invisible on 1 servers"),
    );
    state.reply(
        uid,
        Response::RPL_MOTDSTART,
        Vec::new(),
        format!("- {host} Message of the Day -"),
    );
    state.reply(
        uid,
        Response::RPL_MOTD,
        Vec::new(),
        format!("- Welcome to the {host} IRC network!"),
    );
    state.reply(uid, Response::RPL_ENDOFMOTD, Vec::new(), "End of /MOTD command.");

    let Some(nick) = state.user(uid).map(|u| u.nickname().to_string()) else {
        return;
    };
    state.send_to(
        uid,
        Message::from_user(
            SENTINEL_NICK,
            "PRIVMSG",
            vec![nick],
            Some(format!("Welcome to {host}")),
        ),
    );
}
