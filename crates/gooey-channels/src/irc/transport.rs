//! Transport trait the supervisor drives.
//!
//! [`IrcTransport`] is the seam between the connection lifecycle logic and
//! the wire. [`IrcClient`](super::client::IrcClient) implements it over
//! TCP/TLS; tests use an in-memory double.

use async_trait::async_trait;

use gooey_types::error::TransportError;

/// An IRC connection the bridge can (re)establish and steer.
///
/// Inbound traffic does not flow through this trait: implementations
/// publish [`IrcEvent`](gooey_types::event::IrcEvent)s on a channel handed
/// out at construction.
#[async_trait]
pub trait IrcTransport: Send + Sync {
    /// Our own nickname as configured.
    fn nickname(&self) -> &str;

    /// Whether a registered connection is currently live.
    fn is_connected(&self) -> bool;

    /// Channels the server has confirmed we are in right now.
    ///
    /// Cleared on disconnect. This is the live roster, not the set of
    /// channels we want to be in.
    fn channels(&self) -> Vec<String>;

    /// Open a connection and complete registration.
    async fn connect(&self) -> Result<(), TransportError>;

    /// Drop whatever is left of the old connection and connect again with
    /// the same settings.
    async fn reconnect(&self) -> Result<(), TransportError>;

    /// Send `JOIN <channel>`. Joining a channel we are already in is
    /// harmless; the server ignores it.
    async fn join_channel(&self, channel: &str) -> Result<(), TransportError>;

    /// Close the connection deliberately. No disconnect event is emitted.
    async fn disconnect(&self) -> Result<(), TransportError>;
}
