//! Local bots: in-process pseudo-users that keep the channels lively.
//!
//! A bot is an ordinary session whose outbound link discards everything.
//! It joins and leaves channels and chatters through the same state
//! operations real clients use, so every member sees bot activity exactly
//! as it would see another client's.

use rand::Rng;
use tracing::{debug, info, warn};

use crate::config::BotsConfig;
use crate::state::{Link, ServerState, Session, UserId};

/// Behavior parameters for one bot, sampled from the config ranges once at
/// spawn.
#[derive(Debug, Clone)]
pub struct BotParams {
    /// How many channels the bot tries to stay joined to.
    pub channels_target: usize,
    /// Per-tick probability of leaving each joined channel.
    pub channels_leave_rate: f64,
    /// Per-tick probability of chattering into each joined channel.
    pub message_rate: f64,
    /// Half the upper bound on words per message.
    pub message_length: usize,
}

/// Upper bound on one composed chatter line.
const MESSAGE_CAP: usize = 1024;

impl ServerState {
    /// Spawn one bot: sample its parameters, register it (username and
    /// realname equal the nickname), and run its first tick.
    ///
    /// Returns `None` when the nickname is already taken.
    pub fn spawn_bot(&mut self, nick: &str, config: &BotsConfig) -> Option<UserId> {
        if self.nick_owner(nick).is_some() {
            warn!(nick = %nick, "bot nickname already in use; not spawning");
            return None;
        }
        let params = BotParams {
            channels_target: config.channels_target.sample(&mut self.rng),
            channels_leave_rate: config.channels_leave_rate.sample(&mut self.rng),
            message_rate: config.message_rate.sample(&mut self.rng),
            message_length: config.message_length.sample(&mut self.rng),
        };
        info!(nick = %nick, ?params, "spawning bot");

        let uid = self.add_bot(params);
        self.set_nick(uid, nick);
        self.set_user(uid, nick.to_string(), nick.to_string());
        crate::handlers::send_welcome_burst(self, uid);
        self.tick_bot(uid);
        Some(uid)
    }

    /// Run one tick for every bot, in spawn order.
    pub fn tick_bots(&mut self) {
        for uid in self.bot_ids() {
            self.tick_bot(uid);
        }
    }

    /// One bot tick: top up channel membership toward the target, maybe
    /// leave some channels, maybe chatter into the rest.
    pub fn tick_bot(&mut self, uid: UserId) {
        let params = match self.session(uid) {
            Some(Session {
                link: Link::Bot { params },
                ..
            }) => params.clone(),
            _ => return,
        };

        self.bot_join_phase(uid, &params);
        self.bot_part_phase(uid, &params);
        self.bot_message_phase(uid, &params);
    }

    /// Join unjoined channels with probability `need / unjoined_remaining`,
    /// which selects exactly `min(need, unjoined)` channels uniformly.
    fn bot_join_phase(&mut self, uid: UserId, params: &BotParams) {
        let joined = match self.user(uid) {
            Some(user) => user.channels.clone(),
            None => return,
        };
        let unjoined: Vec<String> = self
            .channels()
            .map(|c| c.name().to_string())
            .filter(|name| !joined.contains(name))
            .collect();

        let mut need = params.channels_target.saturating_sub(joined.len());
        let total = unjoined.len();
        for (i, name) in unjoined.iter().enumerate() {
            if need == 0 {
                break;
            }
            let p = (need as f64 / (total - i) as f64).min(1.0);
            if self.rng.gen_bool(p) {
                debug!(bot = uid, channel = %name, "bot joining");
                self.join_channel(uid, name);
                need -= 1;
            }
        }
    }

    /// Leave each joined channel with the bot's leave rate. The membership
    /// list is snapshotted first so removal cannot upset the iteration.
    fn bot_part_phase(&mut self, uid: UserId, params: &BotParams) {
        let (joined, nick) = match self.user(uid) {
            Some(user) => (
                user.channels.iter().cloned().collect::<Vec<_>>(),
                user.nickname().to_string(),
            ),
            None => return,
        };
        let rate = params.channels_leave_rate.clamp(0.0, 1.0);
        for name in joined {
            if self.rng.gen_bool(rate) {
                debug!(bot = uid, channel = %name, "bot leaving");
                self.part_channel(uid, &name, &nick);
            }
        }
    }

    /// Chatter into each joined channel with the bot's message rate.
    fn bot_message_phase(&mut self, uid: UserId, params: &BotParams) {
        let joined: Vec<String> = match self.user(uid) {
            Some(user) => user.channels.iter().cloned().collect(),
            None => return,
        };
        let rate = params.message_rate.clamp(0.0, 1.0);
        for name in joined {
            if self.rng.gen_bool(rate) {
                let text = self.compose_chatter(params.message_length);
                if !text.is_empty() {
                    self.channel_privmsg(uid, &name, &text);
                }
            }
        }
    }

    /// Compose a random message: a word count drawn uniformly from
    /// `[1, 2 * message_length - 1]`, words drawn from the bank, joined by
    /// single spaces, truncated to fit [`MESSAGE_CAP`].
    fn compose_chatter(&mut self, message_length: usize) -> String {
        if self.words.is_empty() {
            return String::new();
        }
        let upper = (2 * message_length.max(1)).saturating_sub(1).max(1);
        let count = self.rng.gen_range(1..=upper);

        let mut out = String::new();
        for _ in 0..count {
            let n = self.words.len();
            let word = &self.words[self.rng.gen_range(0..n)];
            let added = if out.is_empty() {
                word.len()
            } else {
                word.len() + 1
            };
            if out.len() + added > MESSAGE_CAP {
                break;
            }
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(word);
        }
        out
    }
}
