//! IRC-to-webhook relay for gooey.
//!
//! Holds everything between the IRC socket and the webhook:
//!
//! ```text
//! IrcClient ──IrcEvent──> EventDispatcher ──┬──> MembershipTracker
//!     ^                                     ├──> RelaySink ──POST──> webhook
//!     │                                     └──> ConnectionSupervisor
//!     └──────── reconnect / JOIN ───────────────────────┘
//! ```
//!
//! The [`ConnectionSupervisor`] schedules its reconnect and rejoin work on a
//! [`RetryScheduler`], so every delay is driven by `tokio::time` and can be
//! tested with a paused clock.

pub mod dispatcher;
pub mod irc;
pub mod membership;
pub mod relay;
pub mod scheduler;
pub mod supervisor;
pub mod validate;

#[cfg(test)]
mod mock;

pub use dispatcher::EventDispatcher;
pub use irc::{IrcClient, IrcClientConfig, IrcTransport};
pub use membership::MembershipTracker;
pub use relay::RelaySink;
pub use scheduler::{RetryScheduler, TaskHandler, TaskId};
pub use supervisor::{ConnectionSupervisor, LinkState, RetryAction, SupervisorSnapshot};
pub use validate::validate_config;
