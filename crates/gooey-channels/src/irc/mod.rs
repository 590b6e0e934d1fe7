//! IRC side of the bridge.
//!
//! - [`message`] parses and renders protocol lines
//! - [`transport`] defines the [`IrcTransport`] seam the supervisor drives
//! - [`client`] implements it over TCP, optionally TLS

pub mod client;
pub mod message;
pub mod transport;

pub use client::{IrcClient, IrcClientConfig};
pub use message::IrcMessage;
pub use transport::IrcTransport;
