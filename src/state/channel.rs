//! Channel state.

use std::collections::BTreeSet;

use super::UserId;

/// One chat channel: an immutable name, an optional topic, and the member
/// set.
///
/// Channels are created from the preset list at startup and destroyed only
/// during server teardown, after every user has released its membership.
/// The member set mirrors each member's own channel set; both sides are
/// maintained by `ServerState`.
#[derive(Debug)]
pub struct Channel {
    name: String,
    pub topic: Option<String>,
    pub members: BTreeSet<UserId>,
}

impl Channel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            topic: None,
            members: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}
