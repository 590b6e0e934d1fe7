//! Scripted in-memory transport for supervisor and dispatcher tests.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use gooey_types::error::TransportError;

use crate::irc::transport::IrcTransport;

/// Records every command and lets the test decide how the "server" reacts.
pub(crate) struct MockTransport {
    nick: String,
    connected: AtomicBool,
    roster: Mutex<BTreeSet<String>>,
    joins: Mutex<Vec<String>>,
    connects: AtomicUsize,
    reconnects: AtomicUsize,
    failing_reconnects: AtomicUsize,
    fail_connect: AtomicBool,
    disconnects: AtomicUsize,
    joins_confirmed: AtomicBool,
    reconnect_delay: Mutex<Option<Duration>>,
}

impl MockTransport {
    pub(crate) fn new(nick: &str) -> Self {
        Self {
            nick: nick.to_owned(),
            connected: AtomicBool::new(false),
            roster: Mutex::new(BTreeSet::new()),
            joins: Mutex::new(Vec::new()),
            connects: AtomicUsize::new(0),
            reconnects: AtomicUsize::new(0),
            failing_reconnects: AtomicUsize::new(0),
            fail_connect: AtomicBool::new(false),
            disconnects: AtomicUsize::new(0),
            joins_confirmed: AtomicBool::new(true),
            reconnect_delay: Mutex::new(None),
        }
    }

    /// A transport that is already connected.
    pub(crate) fn connected(nick: &str) -> Self {
        let t = Self::new(nick);
        t.connected.store(true, Ordering::SeqCst);
        t
    }

    /// Simulate the link dropping: offline and roster cleared.
    pub(crate) fn drop_link(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.roster.lock().clear();
    }

    /// Make the next `n` reconnect attempts fail.
    pub(crate) fn fail_next_reconnects(&self, n: usize) {
        self.failing_reconnects.store(n, Ordering::SeqCst);
    }

    /// Make the next `connect` fail.
    pub(crate) fn fail_next_connect(&self) {
        self.fail_connect.store(true, Ordering::SeqCst);
    }

    /// Make every reconnect take `delay` before it succeeds.
    pub(crate) fn set_reconnect_delay(&self, delay: Duration) {
        *self.reconnect_delay.lock() = Some(delay);
    }

    /// When false, JOIN commands are recorded but the server never puts us
    /// in the channel (as if we are banned).
    pub(crate) fn set_joins_confirmed(&self, confirmed: bool) {
        self.joins_confirmed.store(confirmed, Ordering::SeqCst);
    }

    pub(crate) fn add_to_roster(&self, channel: &str) {
        self.roster.lock().insert(channel.to_owned());
    }

    pub(crate) fn remove_from_roster(&self, channel: &str) {
        self.roster.lock().remove(channel);
    }

    /// Every JOIN issued so far, in order.
    pub(crate) fn joins(&self) -> Vec<String> {
        self.joins.lock().clone()
    }

    pub(crate) fn clear_joins(&self) {
        self.joins.lock().clear();
    }

    pub(crate) fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub(crate) fn reconnect_count(&self) -> usize {
        self.reconnects.load(Ordering::SeqCst)
    }

    pub(crate) fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IrcTransport for MockTransport {
    fn nickname(&self) -> &str {
        &self.nick
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn channels(&self) -> Vec<String> {
        self.roster.lock().iter().cloned().collect()
    }

    async fn connect(&self) -> Result<(), TransportError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect.swap(false, Ordering::SeqCst) {
            return Err(TransportError::ConnectionFailed("no route to host".into()));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn reconnect(&self) -> Result<(), TransportError> {
        self.reconnects.fetch_add(1, Ordering::SeqCst);
        let failing = self.failing_reconnects.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_reconnects.store(failing - 1, Ordering::SeqCst);
            return Err(TransportError::ConnectionFailed("connection refused".into()));
        }
        let delay = *self.reconnect_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn join_channel(&self, channel: &str) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        self.joins.lock().push(channel.to_owned());
        if self.joins_confirmed.load(Ordering::SeqCst) {
            self.add_to_roster(channel);
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.drop_link();
        Ok(())
    }
}
