//! Admin password and admin sub-command parsing.

use std::fmt;

use super::command::split_word;
use crate::random;

const PASSWORD_LEN: usize = 16;

/// Process-lifetime admin secret. Never logged; `Debug` is redacted.
#[derive(Clone)]
pub struct AdminPassword(String);

impl AdminPassword {
    /// Fresh random password of printable ASCII without spaces.
    pub fn generate() -> Self {
        Self(random::printable_ascii(PASSWORD_LEN))
    }

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Case-sensitive comparison that does not stop at the first mismatch.
    pub fn matches(&self, candidate: &str) -> bool {
        let (a, b) = (self.0.as_bytes(), candidate.as_bytes());
        a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
    }

    /// The raw value, for the one-time startup announcement.
    pub fn reveal(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AdminPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AdminPassword(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand<'a> {
    Help,
    /// `suppressroll [disable|<prefix>]`.
    SuppressRoll(Option<&'a str>),
    Server(&'a str),
    Servers,
    Backend(&'a str),
    Register { name: &'a str, url: &'a str },
    Unregister(&'a str),
    /// Known sub-command with missing arguments.
    Usage(&'static str),
}

/// Parse the text after `admin <password>`. Empty or unknown input is `Help`.
pub fn parse(rest: &str) -> AdminCommand<'_> {
    let (sub, arg) = split_word(rest);
    let mut args = arg.split_whitespace();
    match sub.to_ascii_lowercase().as_str() {
        "suppressroll" => AdminCommand::SuppressRoll(args.next()),
        "server" => args.next().map_or(AdminCommand::Usage("server <url>"), AdminCommand::Server),
        "servers" => AdminCommand::Servers,
        "backend" => args
            .next()
            .map_or(AdminCommand::Usage("backend <url|mock>"), AdminCommand::Backend),
        "register" => match (args.next(), args.next()) {
            (Some(name), Some(url)) => AdminCommand::Register { name, url },
            _ => AdminCommand::Usage("register <name> <url>"),
        },
        "unregister" => args
            .next()
            .map_or(AdminCommand::Usage("unregister <name>"), AdminCommand::Unregister),
        _ => AdminCommand::Help,
    }
}
