//! IRC numeric response codes, RFC 1459 / 2812 subset.

#![allow(non_camel_case_types)]

use std::fmt::{self, Display, Formatter};

/// Numeric reply sent by the server.
///
/// Only the numerics this daemon actually emits are listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Response {
    /// 251 - Luser client count
    RPL_LUSERCLIENT = 251,
    /// 315 - End of WHO
    RPL_ENDOFWHO = 315,
    /// 321 - List start
    RPL_LISTSTART = 321,
    /// 322 - List entry
    RPL_LIST = 322,
    /// 323 - List end
    RPL_LISTEND = 323,
    /// 331 - No topic set
    RPL_NOTOPIC = 331,
    /// 332 - Channel topic
    RPL_TOPIC = 332,
    /// 352 - WHO reply
    RPL_WHOREPLY = 352,
    /// 353 - NAMES reply
    RPL_NAMREPLY = 353,
    /// 366 - End of NAMES
    RPL_ENDOFNAMES = 366,
    /// 372 - MOTD line
    RPL_MOTD = 372,
    /// 375 - MOTD start
    RPL_MOTDSTART = 375,
    /// 376 - End of MOTD
    RPL_ENDOFMOTD = 376,
    /// 401 - No such nick/channel
    ERR_NOSUCHNICK = 401,
    /// 403 - No such channel
    ERR_NOSUCHCHANNEL = 403,
    /// 421 - Unknown command
    ERR_UNKNOWNCOMMAND = 421,
    /// 431 - No nickname given
    ERR_NONICKNAMEGIVEN = 431,
    /// 432 - Erroneous nickname
    ERR_ERRONEUSNICKNAME = 432,
    /// 433 - Nickname in use
    ERR_NICKNAMEINUSE = 433,
    /// 442 - Not on channel
    ERR_NOTONCHANNEL = 442,
    /// 451 - Not registered
    ERR_NOTREGISTERED = 451,
    /// 461 - Need more parameters
    ERR_NEEDMOREPARAMS = 461,
    /// 462 - Already registered
    ERR_ALREADYREGISTRED = 462,
}

impl Response {
    /// The three-digit code.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// True for the 400-599 error range.
    pub fn is_error(self) -> bool {
        (400..600).contains(&self.code())
    }
}

impl Display for Response {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_render_as_three_digits() {
        assert_eq!(Response::RPL_LUSERCLIENT.to_string(), "251");
        assert_eq!(Response::ERR_NOSUCHNICK.to_string(), "401");
    }

    #[test]
    fn error_range() {
        assert!(Response::ERR_NICKNAMEINUSE.is_error());
        assert!(!Response::RPL_TOPIC.is_error());
    }
}
