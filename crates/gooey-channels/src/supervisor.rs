//! Connection supervisor.
//!
//! Owns the retry state machine that keeps the bridge connected and in its
//! channels:
//!
//! - a disconnect schedules one reconnect after `reconnect_first`; a failed
//!   reconnect reschedules itself after `reconnect_backoff`, forever
//! - a successful reconnect rejoins every channel in the
//!   [`MembershipTracker`]
//! - a kick of our own nick arms a per-channel rejoin watchdog that joins
//!   every `rejoin` period until the channel shows up in the live roster
//!
//! Retry work runs on a [`RetryScheduler`]; [`dispose`](ConnectionSupervisor::dispose)
//! discards whatever is still pending, stops a task that is mid-flight and
//! releases the transport.
//!
//! Channel names are compared ASCII case-insensitively, so a server that
//! echoes `#Terasology` for `#terasology` still matches the watchdog.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{Span, debug, info, info_span, warn};

use gooey_types::config::RetryConfig;
use gooey_types::error::GooeyError;

use crate::irc::message::nick_eq;
use crate::irc::transport::IrcTransport;
use crate::membership::MembershipTracker;
use crate::scheduler::{RetryScheduler, TaskHandler, TaskId};

/// Work the supervisor schedules for later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryAction {
    /// Reconnect if the link is still down.
    Reconnect,
    /// Rejoin a channel we were kicked from.
    Rejoin(String),
}

/// Connection state as the supervisor sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Registered and live.
    Connected,
    /// Down, nothing scheduled yet (or disposed).
    Disconnected,
    /// Down, a reconnect task is pending.
    AwaitingReconnect,
}

/// Point-in-time view of the supervisor, for tests and status logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorSnapshot {
    /// Current link state.
    pub link: LinkState,
    /// Whether a reconnect task is waiting to fire.
    pub reconnect_pending: bool,
    /// Channels with an armed rejoin watchdog, lowercased and sorted.
    pub watched_channels: Vec<String>,
    /// Total retry tasks waiting to fire.
    pub pending_tasks: usize,
}

struct SessionState {
    link: LinkState,
    reconnect_task: Option<TaskId>,
    /// Keyed by [`channel_key`].
    watchdogs: HashMap<String, TaskId>,
    /// Startup channels still waiting for a first successful connection.
    bootstrap: Vec<String>,
}

struct Shared {
    transport: Arc<dyn IrcTransport>,
    membership: MembershipTracker,
    scheduler: RetryScheduler<RetryAction>,
    retry: RetryConfig,
    state: Mutex<SessionState>,
    span: Span,
}

/// Drives reconnects and rejoins for one IRC session.
///
/// Cloning yields another handle to the same supervisor.
#[derive(Clone)]
pub struct ConnectionSupervisor {
    shared: Arc<Shared>,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl ConnectionSupervisor {
    /// Create a supervisor and start its retry worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        transport: Arc<dyn IrcTransport>,
        membership: MembershipTracker,
        retry: RetryConfig,
    ) -> Self {
        Self::with_span(transport, membership, retry, info_span!("supervisor"))
    }

    /// Like [`new`](Self::new), logging under `span`.
    pub fn with_span(
        transport: Arc<dyn IrcTransport>,
        membership: MembershipTracker,
        retry: RetryConfig,
        span: Span,
    ) -> Self {
        let link = if transport.is_connected() {
            LinkState::Connected
        } else {
            LinkState::Disconnected
        };
        let scheduler = RetryScheduler::with_span(span.clone());
        let shared = Arc::new(Shared {
            transport,
            membership,
            scheduler,
            retry,
            state: Mutex::new(SessionState {
                link,
                reconnect_task: None,
                watchdogs: HashMap::new(),
                bootstrap: Vec::new(),
            }),
            span,
        });
        let worker = shared.scheduler.start(shared.clone());
        Self {
            shared,
            worker: Arc::new(Mutex::new(Some(worker))),
        }
    }

    /// Make the first connection and join `channels`.
    ///
    /// A failed connect is handled like a disconnect: the normal reconnect
    /// schedule applies and `channels` are joined once it succeeds.
    pub async fn start(&self, channels: &[String]) {
        let s = &self.shared;
        match s.transport.connect().await {
            Ok(()) => {
                s.state.lock().link = LinkState::Connected;
                for channel in channels {
                    if let Err(e) = s.transport.join_channel(channel).await {
                        warn!(parent: &s.span, channel = %channel, error = %e, "initial join failed");
                    }
                }
            }
            Err(e) => {
                warn!(parent: &s.span, error = %e, "initial connect failed");
                s.state.lock().bootstrap = channels.to_vec();
                self.on_disconnect();
            }
        }
    }

    /// The connection is registered and live.
    pub fn on_connected(&self) {
        self.shared.state.lock().link = LinkState::Connected;
    }

    /// The connection dropped (or the initial connect failed).
    ///
    /// Schedules a reconnect unless one is already pending for this outage.
    pub fn on_disconnect(&self) {
        let s = &self.shared;
        if s.schedule_reconnect(s.retry.reconnect_first()) {
            info!(
                parent: &s.span,
                delay_secs = s.retry.reconnect_first_secs,
                "disconnected, reconnect scheduled"
            );
        } else {
            debug!(parent: &s.span, "disconnected, reconnect already pending");
        }
    }

    /// Someone was kicked. Arms a rejoin watchdog if it was us.
    pub fn on_kick(&self, channel: &str, kicker: &str, recipient: &str, reason: &str) {
        let s = &self.shared;
        if !nick_eq(recipient, s.transport.nickname()) {
            return;
        }
        info!(
            parent: &s.span,
            channel = %channel,
            kicker = %kicker,
            reason = %reason,
            "kicked from channel"
        );

        let key = channel_key(channel);
        let mut state = s.state.lock();
        if state
            .watchdogs
            .get(&key)
            .is_some_and(|id| s.scheduler.is_pending(*id))
        {
            debug!(parent: &s.span, channel = %channel, "rejoin watchdog already armed");
            return;
        }
        match s
            .scheduler
            .schedule(s.retry.rejoin(), RetryAction::Rejoin(channel.to_owned()))
        {
            Ok(id) => {
                state.watchdogs.insert(key, id);
                info!(
                    parent: &s.span,
                    channel = %channel,
                    delay_secs = s.retry.rejoin_secs,
                    "rejoin scheduled"
                );
            }
            Err(e) => s.log_not_scheduled(&e, "rejoin"),
        }
    }

    /// We joined `channel`. Stops its watchdog when configured to.
    pub fn on_self_join(&self, channel: &str) {
        let s = &self.shared;
        if !s.retry.cancel_watchdog_on_rejoin {
            return;
        }
        let removed = s.state.lock().watchdogs.remove(&channel_key(channel));
        if let Some(id) = removed {
            s.scheduler.cancel(id);
            info!(parent: &s.span, channel = %channel, "rejoined, watchdog stopped");
        }
    }

    /// Current state.
    pub fn state(&self) -> SupervisorSnapshot {
        let s = &self.shared;
        let state = s.state.lock();
        let mut watched: Vec<String> = state.watchdogs.keys().cloned().collect();
        watched.sort();
        SupervisorSnapshot {
            link: state.link,
            reconnect_pending: state
                .reconnect_task
                .is_some_and(|id| s.scheduler.is_pending(id)),
            watched_channels: watched,
            pending_tasks: s.scheduler.pending(),
        }
    }

    /// Discard all pending retry tasks without running them, stop a task
    /// that is already running, then close the transport. Further events
    /// are ignored.
    pub async fn dispose(&self) {
        let s = &self.shared;
        s.scheduler.dispose();
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            // A reconnect in flight must not reopen the socket after the
            // transport is closed below.
            worker.abort();
            match worker.await {
                Err(e) if !e.is_cancelled() => {
                    warn!(parent: &s.span, error = %e, "retry worker failed");
                }
                _ => {}
            }
        }
        {
            let mut state = s.state.lock();
            state.reconnect_task = None;
            state.watchdogs.clear();
            state.bootstrap.clear();
            state.link = LinkState::Disconnected;
        }
        if let Err(e) = s.transport.disconnect().await {
            warn!(parent: &s.span, error = %e, "error while closing transport");
        }
        info!(parent: &s.span, "supervisor disposed");
    }
}

impl Shared {
    /// Returns `false` if a reconnect is already pending or the scheduler
    /// is closed.
    fn schedule_reconnect(&self, delay: std::time::Duration) -> bool {
        let mut state = self.state.lock();
        if state
            .reconnect_task
            .is_some_and(|id| self.scheduler.is_pending(id))
        {
            return false;
        }
        match self.scheduler.schedule(delay, RetryAction::Reconnect) {
            Ok(id) => {
                state.reconnect_task = Some(id);
                state.link = LinkState::AwaitingReconnect;
                true
            }
            Err(e) => {
                self.log_not_scheduled(&e, "reconnect");
                false
            }
        }
    }

    fn log_not_scheduled(&self, err: &GooeyError, what: &str) {
        if matches!(err, GooeyError::SchedulerClosed) {
            debug!(parent: &self.span, task = what, "not scheduled, supervisor disposed");
        } else {
            warn!(parent: &self.span, task = what, error = %err, "retry task not scheduled");
        }
    }

    async fn reconnect(&self, id: TaskId) {
        {
            let mut state = self.state.lock();
            if state.reconnect_task == Some(id) {
                state.reconnect_task = None;
            }
        }

        if self.transport.is_connected() {
            debug!(parent: &self.span, "reconnect task fired but the link is up");
            self.state.lock().link = LinkState::Connected;
            return;
        }

        info!(parent: &self.span, "reconnecting");
        match self.transport.reconnect().await {
            Ok(()) => {
                let mut channels = self.membership.joined_channels();
                let bootstrap = std::mem::take(&mut self.state.lock().bootstrap);
                for channel in bootstrap {
                    if !channels.contains(&channel) {
                        channels.push(channel);
                    }
                }
                for channel in &channels {
                    if let Err(e) = self.transport.join_channel(channel).await {
                        warn!(parent: &self.span, channel = %channel, error = %e, "rejoin after reconnect failed");
                    }
                }
                self.state.lock().link = LinkState::Connected;
                info!(parent: &self.span, channels = channels.len(), "reconnected");
            }
            Err(e) => {
                let delay = self.retry.reconnect_backoff();
                warn!(
                    parent: &self.span,
                    error = %e,
                    delay_secs = delay.as_secs(),
                    "reconnect failed, will retry"
                );
                self.schedule_reconnect(delay);
            }
        }
    }

    async fn rejoin(&self, id: TaskId, channel: String) {
        let key = channel_key(&channel);
        let in_channel = self
            .transport
            .channels()
            .iter()
            .any(|c| c.eq_ignore_ascii_case(&channel));
        if in_channel {
            debug!(parent: &self.span, channel = %channel, "already in channel, watchdog done");
            let mut state = self.state.lock();
            if state.watchdogs.get(&key) == Some(&id) {
                state.watchdogs.remove(&key);
            }
            return;
        }

        info!(parent: &self.span, channel = %channel, "rejoining channel");
        if let Err(e) = self.transport.join_channel(&channel).await {
            warn!(parent: &self.span, channel = %channel, error = %e, "rejoin failed");
        }

        // Re-arm unless our join was confirmed while we were sending it.
        let mut state = self.state.lock();
        if state.watchdogs.get(&key) != Some(&id) {
            return;
        }
        match self
            .scheduler
            .schedule(self.retry.rejoin(), RetryAction::Rejoin(channel))
        {
            Ok(next) => {
                state.watchdogs.insert(key, next);
            }
            Err(_) => {
                state.watchdogs.remove(&key);
            }
        }
    }
}

/// Watchdog map key: IRC channel names are case-insensitive.
fn channel_key(channel: &str) -> String {
    channel.to_ascii_lowercase()
}

#[async_trait]
impl TaskHandler<RetryAction> for Shared {
    async fn run_task(&self, id: TaskId, action: RetryAction) {
        match action {
            RetryAction::Reconnect => self.reconnect(id).await,
            RetryAction::Rejoin(channel) => self.rejoin(id, channel).await,
        }
    }
}
