//! Server state: every session, channel, and index, plus the fan-out
//! operations that keep them consistent.
//!
//! All state lives in one place and is mutated only by the server task, so
//! every handler observes and produces a consistent graph: a user is in a
//! channel's member set exactly when the channel is in the user's channel
//! set, and the nickname index always mirrors the sessions' nick fields.
//!
//! Indexes are ordered maps throughout. Broadcast fan-out, NAMES listings,
//! and LIST output all follow that deterministic iteration order.

mod channel;
mod user;

pub use channel::Channel;
pub use user::User;

use std::collections::{BTreeMap, BTreeSet};
use std::net::SocketAddr;

use rand::rngs::StdRng;
use tokio::sync::mpsc;
use tracing::info;

use irczt_proto::{Message, Response};

use crate::bot::BotParams;

/// Stable identifier for one session, assigned at accept / spawn time.
pub type UserId = u64;

/// How a session's outbound traffic is delivered.
#[derive(Debug)]
pub enum Link {
    /// A real client: messages are queued to its connection task.
    Client {
        sender: mpsc::UnboundedSender<Message>,
        addr: SocketAddr,
    },
    /// A local bot: messages are discarded.
    Bot { params: BotParams },
}

impl Link {
    pub fn is_bot(&self) -> bool {
        matches!(self, Link::Bot { .. })
    }
}

/// One connected user (client or bot) and its delivery link.
#[derive(Debug)]
pub struct Session {
    pub user: User,
    pub link: Link,
}

/// The complete server state.
pub struct ServerState {
    server_name: String,
    sessions: BTreeMap<UserId, Session>,
    /// Nickname -> session, only for sessions that currently have one.
    nicks: BTreeMap<String, UserId>,
    channels: BTreeMap<String, Channel>,
    /// Bot sessions in spawn order; ticked in this order.
    bots: Vec<UserId>,
    next_id: UserId,
    pub(crate) rng: StdRng,
    pub(crate) words: Vec<String>,
}

impl ServerState {
    pub fn new(server_name: String, channels: &[String], words: Vec<String>, rng: StdRng) -> Self {
        let channels = channels
            .iter()
            .map(|name| (name.clone(), Channel::new(name.clone())))
            .collect();
        Self {
            server_name,
            sessions: BTreeMap::new(),
            nicks: BTreeMap::new(),
            channels,
            bots: Vec::new(),
            next_id: 1,
            rng,
            words,
        }
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    fn next_id(&mut self) -> UserId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Register a freshly accepted client connection.
    pub fn add_client(&mut self, sender: mpsc::UnboundedSender<Message>, addr: SocketAddr) -> UserId {
        let id = self.next_id();
        self.sessions.insert(
            id,
            Session {
                user: User::default(),
                link: Link::Client { sender, addr },
            },
        );
        id
    }

    /// Register a local bot session. The caller completes its registration.
    pub(crate) fn add_bot(&mut self, params: BotParams) -> UserId {
        let id = self.next_id();
        self.sessions.insert(
            id,
            Session {
                user: User::default(),
                link: Link::Bot { params },
            },
        );
        self.bots.push(id);
        id
    }

    pub fn contains(&self, uid: UserId) -> bool {
        self.sessions.contains_key(&uid)
    }

    pub fn session(&self, uid: UserId) -> Option<&Session> {
        self.sessions.get(&uid)
    }

    pub fn user(&self, uid: UserId) -> Option<&User> {
        self.sessions.get(&uid).map(|s| &s.user)
    }

    /// The session currently holding `nick`, if any.
    pub fn nick_owner(&self, nick: &str) -> Option<UserId> {
        self.nicks.get(nick).copied()
    }

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(name)
    }

    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    pub(crate) fn bot_ids(&self) -> Vec<UserId> {
        self.bots.clone()
    }

    /// Sessions that have completed registration, bots included.
    pub fn registered_count(&self) -> usize {
        self.sessions
            .values()
            .filter(|s| s.user.is_registered())
            .count()
    }

    /// Update a session's nickname and the nickname index together.
    ///
    /// The new key is inserted before the old one is removed, so a lookup
    /// never briefly misses the user. Setting the current nickname again is
    /// a no-op.
    pub fn set_nick(&mut self, uid: UserId, new: &str) {
        let old = self.sessions.get(&uid).and_then(|s| {
            s.user
                .has_nickname()
                .then(|| s.user.nickname().to_string())
        });
        if old.as_deref() == Some(new) {
            return;
        }
        self.nicks.insert(new.to_string(), uid);
        if let Some(old) = old {
            self.nicks.remove(&old);
        }
        if let Some(session) = self.sessions.get_mut(&uid) {
            session.user.set_nick(new.to_string());
        }
    }

    pub fn set_user(&mut self, uid: UserId, username: String, realname: String) {
        if let Some(session) = self.sessions.get_mut(&uid) {
            session.user.set_user(username, realname);
        }
    }

    /// Queue a message for one session. Bot links discard it.
    pub fn send_to(&self, uid: UserId, msg: Message) {
        if let Some(Session {
            link: Link::Client { sender, .. },
            ..
        }) = self.sessions.get(&uid)
        {
            // A closed receiver just means the connection is tearing down.
            let _ = sender.send(msg);
        }
    }

    /// Queue a numeric reply addressed to `uid`'s current nickname.
    pub fn reply(
        &self,
        uid: UserId,
        code: Response,
        middle: Vec<String>,
        trailing: impl Into<String>,
    ) {
        let Some(user) = self.user(uid) else { return };
        let mut params = vec![user.nickname().to_string()];
        params.extend(middle);
        self.send_to(
            uid,
            Message::numeric(&self.server_name, code, params, trailing),
        );
    }

    /// Add `uid` to a channel and run the join burst: the JOIN broadcast to
    /// every member (the joiner included), then topic, NAMES, and
    /// end-of-NAMES to the joiner. One NAMES reply is sent per member, in
    /// member-set order.
    pub fn join_channel(&mut self, uid: UserId, name: &str) {
        if !self.channels.contains_key(name) {
            return;
        }
        let nick = match self.user(uid) {
            Some(user) => user.nickname().to_string(),
            None => return,
        };
        if let Some(session) = self.sessions.get_mut(&uid) {
            session.user.channels.insert(name.to_string());
        }
        let members: Vec<UserId> = {
            let channel = self.channels.get_mut(name).expect("channel checked above");
            channel.members.insert(uid);
            channel.members.iter().copied().collect()
        };

        let join = Message::from_user(&nick, "JOIN", vec![name.to_string()], None);
        for member in &members {
            self.send_to(*member, join.clone());
        }

        self.send_topic_reply(uid, name);
        for member in &members {
            let member_nick = match self.user(*member) {
                Some(user) => user.nickname().to_string(),
                None => continue,
            };
            self.reply(
                uid,
                Response::RPL_NAMREPLY,
                vec!["=".to_string(), name.to_string()],
                member_nick,
            );
        }
        self.reply(
            uid,
            Response::RPL_ENDOFNAMES,
            vec![name.to_string()],
            "End of /NAMES list",
        );
    }

    /// Broadcast the PART to every member (the departing user included),
    /// then drop the membership on both sides.
    pub fn part_channel(&mut self, uid: UserId, name: &str, message: &str) {
        let nick = match self.user(uid) {
            Some(user) => user.nickname().to_string(),
            None => return,
        };
        let members: Vec<UserId> = match self.channels.get(name) {
            Some(channel) => channel.members.iter().copied().collect(),
            None => return,
        };
        let part = Message::from_user(
            &nick,
            "PART",
            vec![name.to_string()],
            Some(message.to_string()),
        );
        for member in &members {
            self.send_to(*member, part.clone());
        }
        if let Some(channel) = self.channels.get_mut(name) {
            channel.members.remove(&uid);
        }
        if let Some(session) = self.sessions.get_mut(&uid) {
            session.user.channels.remove(name);
        }
    }

    /// Replace (or clear) a channel's topic and tell every member.
    pub fn set_topic(&mut self, name: &str, topic: Option<String>) {
        let members: Vec<UserId> = match self.channels.get_mut(name) {
            Some(channel) => {
                channel.topic = topic;
                channel.members.iter().copied().collect()
            }
            None => return,
        };
        for member in members {
            self.send_topic_reply(member, name);
        }
    }

    /// Send the current topic (332) or its absence (331) to one session.
    pub fn send_topic_reply(&self, uid: UserId, name: &str) {
        let Some(channel) = self.channels.get(name) else {
            return;
        };
        match &channel.topic {
            Some(topic) => self.reply(
                uid,
                Response::RPL_TOPIC,
                vec![name.to_string()],
                topic.clone(),
            ),
            None => self.reply(
                uid,
                Response::RPL_NOTOPIC,
                vec![name.to_string()],
                "No topic is set",
            ),
        }
    }

    /// Fan a PRIVMSG out to every channel member except the sender.
    pub fn channel_privmsg(&self, sender: UserId, name: &str, text: &str) {
        let Some(channel) = self.channels.get(name) else {
            return;
        };
        let nick = match self.user(sender) {
            Some(user) => user.nickname().to_string(),
            None => return,
        };
        let msg = Message::from_user(
            &nick,
            "PRIVMSG",
            vec![name.to_string()],
            Some(text.to_string()),
        );
        for member in &channel.members {
            if *member != sender {
                self.send_to(*member, msg.clone());
            }
        }
    }

    /// Deliver a PRIVMSG to a single user.
    pub fn privmsg_user(&self, sender: UserId, target: UserId, target_nick: &str, text: &str) {
        let nick = match self.user(sender) {
            Some(user) => user.nickname().to_string(),
            None => return,
        };
        self.send_to(
            target,
            Message::from_user(
                &nick,
                "PRIVMSG",
                vec![target_nick.to_string()],
                Some(text.to_string()),
            ),
        );
    }

    /// Tear a session down: notify every user sharing at least one channel
    /// (once each, however many channels are shared), silently release the
    /// memberships, and drop the session and its nickname index entry.
    pub fn destroy_user(&mut self, uid: UserId, reason: &str) {
        let Some(session) = self.sessions.get(&uid) else {
            return;
        };
        let nick = session.user.nickname().to_string();
        let had_nick = session.user.has_nickname();
        let joined: Vec<String> = session.user.channels.iter().cloned().collect();

        let mut observers: BTreeSet<UserId> = BTreeSet::new();
        for name in &joined {
            if let Some(channel) = self.channels.get(name) {
                observers.extend(channel.members.iter().copied());
            }
        }
        observers.remove(&uid);

        let quit = Message::from_user(&nick, "QUIT", Vec::new(), Some(reason.to_string()));
        for observer in observers {
            self.send_to(observer, quit.clone());
        }

        for name in &joined {
            if let Some(channel) = self.channels.get_mut(name) {
                channel.members.remove(&uid);
            }
        }

        if had_nick {
            self.nicks.remove(&nick);
        }
        let session = self.sessions.remove(&uid);
        self.bots.retain(|b| *b != uid);

        if let Some(session) = session {
            info!(nick = %nick, bot = session.link.is_bot(), reason = %reason, "session destroyed");
        }
    }

    /// Orderly teardown: clients first, then bots, then the channels, which
    /// must all be empty once every user has released its memberships.
    pub fn shutdown(&mut self) {
        let clients: Vec<UserId> = self
            .sessions
            .iter()
            .filter(|(_, s)| !s.link.is_bot())
            .map(|(id, _)| *id)
            .collect();
        for uid in clients {
            self.destroy_user(uid, "Client quit");
        }
        for uid in self.bot_ids() {
            self.destroy_user(uid, "Client quit");
        }
        for channel in self.channels.values() {
            assert!(
                channel.members.is_empty(),
                "channel {} still has members at teardown",
                channel.name()
            );
        }
        self.channels.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn test_state(channels: &[&str]) -> ServerState {
        let channels: Vec<String> = channels.iter().map(|s| s.to_string()).collect();
        ServerState::new(
            "irc.test".into(),
            &channels,
            vec!["word".into()],
            StdRng::seed_from_u64(1),
        )
    }

    fn add_registered(state: &mut ServerState, nick: &str) -> (UserId, UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let uid = state.add_client(tx, "127.0.0.1:1".parse().unwrap());
        state.set_nick(uid, nick);
        state.set_user(uid, nick.to_string(), nick.to_string());
        (uid, rx)
    }

    fn drain(rx: &mut UnboundedReceiver<Message>) -> Vec<Message> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[test]
    fn membership_is_bidirectional() {
        let mut state = test_state(&["#a"]);
        let (alice, _rx) = add_registered(&mut state, "alice");

        state.join_channel(alice, "#a");
        assert!(state.channel("#a").unwrap().members.contains(&alice));
        assert!(state.user(alice).unwrap().channels.contains("#a"));

        state.part_channel(alice, "#a", "alice");
        assert!(!state.channel("#a").unwrap().members.contains(&alice));
        assert!(!state.user(alice).unwrap().channels.contains("#a"));
    }

    #[test]
    fn nick_index_tracks_changes() {
        let mut state = test_state(&[]);
        let (alice, _rx) = add_registered(&mut state, "alice");

        assert_eq!(state.nick_owner("alice"), Some(alice));
        state.set_nick(alice, "alicia");
        assert_eq!(state.nick_owner("alice"), None);
        assert_eq!(state.nick_owner("alicia"), Some(alice));
    }

    #[test]
    fn renaming_to_the_current_nick_keeps_the_index_entry() {
        let mut state = test_state(&[]);
        let (alice, _rx) = add_registered(&mut state, "alice");

        state.set_nick(alice, "alice");
        assert_eq!(state.nick_owner("alice"), Some(alice));
    }

    #[test]
    fn join_burst_reaches_existing_members() {
        let mut state = test_state(&["#a"]);
        let (alice, mut alice_rx) = add_registered(&mut state, "alice");
        let (bob, mut bob_rx) = add_registered(&mut state, "bob");

        state.join_channel(alice, "#a");
        drain(&mut alice_rx);

        state.join_channel(bob, "#a");
        let to_alice = drain(&mut alice_rx);
        assert_eq!(to_alice.len(), 1);
        assert_eq!(to_alice[0].to_string(), ":bob JOIN #a");

        let to_bob: Vec<String> = drain(&mut bob_rx).iter().map(|m| m.to_string()).collect();
        assert_eq!(
            to_bob,
            vec![
                ":bob JOIN #a",
                ":irc.test 331 bob #a :No topic is set",
                ":irc.test 353 bob = #a :alice",
                ":irc.test 353 bob = #a :bob",
                ":irc.test 366 bob #a :End of /NAMES list",
            ]
        );
    }

    #[test]
    fn privmsg_excludes_the_sender() {
        let mut state = test_state(&["#a"]);
        let (alice, mut alice_rx) = add_registered(&mut state, "alice");
        let (bob, mut bob_rx) = add_registered(&mut state, "bob");
        state.join_channel(alice, "#a");
        state.join_channel(bob, "#a");
        drain(&mut alice_rx);
        drain(&mut bob_rx);

        state.channel_privmsg(alice, "#a", "hi");
        assert!(drain(&mut alice_rx).is_empty());
        let to_bob = drain(&mut bob_rx);
        assert_eq!(to_bob.len(), 1);
        assert_eq!(to_bob[0].to_string(), ":alice PRIVMSG #a :hi");
    }

    #[test]
    fn quit_is_deduplicated_across_shared_channels() {
        let mut state = test_state(&["#a", "#b"]);
        let (alice, _alice_rx) = add_registered(&mut state, "alice");
        let (bob, mut bob_rx) = add_registered(&mut state, "bob");
        let (carol, mut carol_rx) = add_registered(&mut state, "carol");
        for uid in [alice, bob, carol] {
            state.join_channel(uid, "#a");
            state.join_channel(uid, "#b");
        }
        drain(&mut bob_rx);
        drain(&mut carol_rx);

        state.destroy_user(alice, "bye");

        for rx in [&mut bob_rx, &mut carol_rx] {
            let quits: Vec<String> = drain(rx).iter().map(|m| m.to_string()).collect();
            assert_eq!(quits, vec![":alice QUIT :bye"]);
        }
        assert!(!state.contains(alice));
        assert_eq!(state.nick_owner("alice"), None);
        assert!(!state.channel("#a").unwrap().members.contains(&alice));
        assert!(!state.channel("#b").unwrap().members.contains(&alice));
    }

    #[test]
    fn topic_change_is_announced_to_every_member() {
        let mut state = test_state(&["#a"]);
        let (alice, mut alice_rx) = add_registered(&mut state, "alice");
        let (bob, mut bob_rx) = add_registered(&mut state, "bob");
        state.join_channel(alice, "#a");
        state.join_channel(bob, "#a");
        drain(&mut alice_rx);
        drain(&mut bob_rx);

        state.set_topic("#a", Some("news".into()));
        assert_eq!(
            drain(&mut alice_rx)[0].to_string(),
            ":irc.test 332 alice #a :news"
        );
        assert_eq!(
            drain(&mut bob_rx)[0].to_string(),
            ":irc.test 332 bob #a :news"
        );

        state.set_topic("#a", None);
        assert_eq!(
            drain(&mut alice_rx)[0].to_string(),
            ":irc.test 331 alice #a :No topic is set"
        );
    }

    #[test]
    fn shutdown_empties_every_channel() {
        let mut state = test_state(&["#a", "#b"]);
        let (alice, _rx_a) = add_registered(&mut state, "alice");
        let (bob, _rx_b) = add_registered(&mut state, "bob");
        state.join_channel(alice, "#a");
        state.join_channel(bob, "#b");

        state.shutdown();
        assert_eq!(state.registered_count(), 0);
        assert!(state.channels().next().is_none());
    }
}
