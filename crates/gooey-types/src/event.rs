//! Inbound IRC events.
//!
//! The transport turns wire lines into [`IrcEvent`]s and the dispatcher
//! routes them to the membership tracker, the relay sink and the
//! connection supervisor.

use serde::{Deserialize, Serialize};

/// An event observed on the IRC side of the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IrcEvent {
    /// The server accepted our registration (`001`).
    Registered {
        /// The nickname the server assigned us.
        nick: String,
    },

    /// `sender` joined `channel`. Includes our own joins.
    Join {
        /// Channel that was joined.
        channel: String,
        /// Nickname of the user who joined.
        sender: String,
    },

    /// `sender` left `channel`.
    Part {
        /// Channel that was left.
        channel: String,
        /// Nickname of the user who left.
        sender: String,
    },

    /// A `PRIVMSG` addressed to a channel.
    Message {
        /// Channel the message was sent to.
        channel: String,
        /// Nickname of the author.
        sender: String,
        /// Message body.
        text: String,
    },

    /// `kicker` removed `recipient` from `channel`.
    Kick {
        /// Channel the kick happened in.
        channel: String,
        /// Nickname of the operator who kicked.
        kicker: String,
        /// Nickname of the user who was kicked.
        recipient: String,
        /// Free-form reason (may be empty).
        reason: String,
    },

    /// The live connection ended unexpectedly.
    Disconnect,
}

impl IrcEvent {
    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            IrcEvent::Registered { .. } => "registered",
            IrcEvent::Join { .. } => "join",
            IrcEvent::Part { .. } => "part",
            IrcEvent::Message { .. } => "message",
            IrcEvent::Kick { .. } => "kick",
            IrcEvent::Disconnect => "disconnect",
        }
    }
}
