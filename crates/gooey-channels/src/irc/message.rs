//! RFC 1459 line codec.
//!
//! Parses inbound lines into [`IrcMessage`] and renders the handful of
//! commands the bridge sends. IRCv3 message tags are accepted and skipped.

use std::fmt;

use gooey_types::event::IrcEvent;

/// One parsed IRC protocol line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrcMessage {
    /// Source of the message (`nick!user@host` or a server name).
    pub prefix: Option<String>,
    /// Command verb or three-digit numeric, as sent.
    pub command: String,
    /// Parameters; a `:trailing` parameter is the last entry.
    pub params: Vec<String>,
}

impl IrcMessage {
    /// Build an outbound message with no prefix.
    pub fn new(command: &str, params: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            prefix: None,
            command: command.to_owned(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse one line. Trailing CR/LF is ignored.
    ///
    /// Returns `None` for blank lines and lines without a command.
    pub fn parse(line: &str) -> Option<Self> {
        let mut rest = line.trim_end_matches(['\r', '\n']);

        // IRCv3 tags: "@k=v;k2 " -- not used by the bridge.
        if let Some(tagged) = rest.strip_prefix('@') {
            rest = tagged.split_once(' ')?.1.trim_start();
        }

        let prefix = match rest.strip_prefix(':') {
            Some(p) => {
                let (prefix, tail) = p.split_once(' ')?;
                rest = tail.trim_start();
                Some(prefix.to_owned())
            }
            None => None,
        };

        let (head, trailing) = match rest.split_once(" :") {
            Some((head, trailing)) => (head, Some(trailing)),
            None => match rest.strip_prefix(':') {
                Some(trailing) => ("", Some(trailing)),
                None => (rest, None),
            },
        };

        let mut words = head.split(' ').filter(|w| !w.is_empty());
        let command = words.next()?.to_ascii_uppercase();
        let mut params: Vec<String> = words.map(str::to_owned).collect();
        if let Some(t) = trailing {
            params.push(t.to_owned());
        }

        Some(Self {
            prefix,
            command,
            params,
        })
    }

    /// Nickname part of the prefix, if there is a prefix.
    pub fn source_nick(&self) -> Option<&str> {
        self.prefix.as_deref().map(nick_from_prefix)
    }

    /// Parameter `i`, or `""` when absent.
    pub fn param(&self, i: usize) -> &str {
        self.params.get(i).map(String::as_str).unwrap_or("")
    }

    /// Map this line onto a bridge event.
    ///
    /// Only the commands the bridge reacts to produce an event. `PRIVMSG`
    /// to a nickname (a private message) and CTCP requests (`/me` actions,
    /// `VERSION` and the like) yield `None`.
    pub fn to_event(&self) -> Option<IrcEvent> {
        let sender = || self.source_nick().unwrap_or("").to_owned();
        match self.command.as_str() {
            "001" => Some(IrcEvent::Registered {
                nick: self.param(0).to_owned(),
            }),
            "JOIN" if !self.params.is_empty() => Some(IrcEvent::Join {
                channel: self.param(0).to_owned(),
                sender: sender(),
            }),
            "PART" if !self.params.is_empty() => Some(IrcEvent::Part {
                channel: self.param(0).to_owned(),
                sender: sender(),
            }),
            "PRIVMSG"
                if self.params.len() >= 2
                    && is_channel_name(self.param(0))
                    && ctcp_request(self.param(1)).is_none() =>
            {
                Some(IrcEvent::Message {
                    channel: self.param(0).to_owned(),
                    sender: sender(),
                    text: self.param(1).to_owned(),
                })
            }
            "KICK" if self.params.len() >= 2 => Some(IrcEvent::Kick {
                channel: self.param(0).to_owned(),
                kicker: sender(),
                recipient: self.param(1).to_owned(),
                reason: self.param(2).to_owned(),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for IrcMessage {
    /// Wire form without the trailing CRLF. The last parameter is sent as
    /// `:trailing` when it is empty, has a space, or starts with `:`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, ":{prefix} ")?;
        }
        f.write_str(&self.command)?;
        if let Some((last, middle)) = self.params.split_last() {
            for p in middle {
                write!(f, " {p}")?;
            }
            if last.is_empty() || last.contains(' ') || last.starts_with(':') {
                write!(f, " :{last}")?;
            } else {
                write!(f, " {last}")?;
            }
        }
        Ok(())
    }
}

/// Extract the nickname from a `nick!user@host` prefix.
///
/// A bare server name or nickname is returned unchanged.
pub fn nick_from_prefix(prefix: &str) -> &str {
    let end = prefix.find(['!', '@']).unwrap_or(prefix.len());
    &prefix[..end]
}

/// Whether `target` names a channel rather than a user.
pub fn is_channel_name(target: &str) -> bool {
    target.starts_with(['#', '&', '+', '!'])
}

/// Split a CTCP payload (`\x01COMMAND args\x01`) into its command and
/// argument. `None` when `text` is ordinary chat.
///
/// The closing `\x01` is optional; some clients leave it off.
pub fn ctcp_request(text: &str) -> Option<(&str, &str)> {
    let body = text.strip_prefix('\x01')?;
    let body = body.strip_suffix('\x01').unwrap_or(body);
    Some(body.split_once(' ').unwrap_or((body, "")))
}

/// Compare nicknames the way IRC servers do (ASCII case-insensitive).
pub fn nick_eq(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// `NICK <nick>`
pub fn nick(nickname: &str) -> IrcMessage {
    IrcMessage::new("NICK", [nickname])
}

/// `USER <login> 0 * :<realname>`
pub fn user(login: &str, realname: &str) -> IrcMessage {
    IrcMessage::new("USER", [login, "0", "*", realname])
}

/// `JOIN <channel>`
pub fn join(channel: &str) -> IrcMessage {
    IrcMessage::new("JOIN", [channel])
}

/// `PONG :<token>`
pub fn pong(token: &str) -> IrcMessage {
    IrcMessage::new("PONG", [token])
}

/// `PING :<token>`
pub fn ping(token: &str) -> IrcMessage {
    IrcMessage::new("PING", [token])
}

/// `NOTICE <target> :\x01<command> <value>\x01`
pub fn ctcp_reply(target: &str, command: &str, value: &str) -> IrcMessage {
    IrcMessage::new("NOTICE", [target.to_owned(), format!("\x01{command} {value}\x01")])
}

/// `QUIT :<reason>`
pub fn quit(reason: &str) -> IrcMessage {
    IrcMessage::new("QUIT", [reason])
}
