//! Membership tracker.
//!
//! Holds the set of IRC channels the bot intends to stay in. A channel is
//! added the first time the bot sees its own JOIN there and is never
//! removed: after a reconnect the supervisor rejoins every channel in the
//! set.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{Span, info, info_span};

/// Thread-safe set of channels to (re)join.
///
/// Cloning is cheap and every clone shares the same set, so the dispatcher
/// (transport side) and the supervisor (scheduler side) can each hold one.
#[derive(Debug, Clone)]
pub struct MembershipTracker {
    channels: Arc<RwLock<BTreeSet<String>>>,
    span: Span,
}

impl Default for MembershipTracker {
    fn default() -> Self {
        Self::with_span(info_span!("membership"))
    }
}

impl MembershipTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty tracker that logs under `span`.
    pub fn with_span(span: Span) -> Self {
        Self {
            channels: Arc::default(),
            span,
        }
    }

    /// Record that the bot joined `channel`.
    ///
    /// Returns `true` if the channel was not tracked before. Repeated joins
    /// are no-ops and are logged only on the first addition.
    pub fn on_self_join(&self, channel: &str) -> bool {
        let added = self.channels.write().insert(channel.to_owned());
        if added {
            info!(parent: &self.span, channel = %channel, "added channel to the list of channels to join");
        }
        added
    }

    /// Snapshot of the tracked channels, in sorted order.
    pub fn joined_channels(&self) -> Vec<String> {
        self.channels.read().iter().cloned().collect()
    }

    /// Whether `channel` is tracked.
    pub fn contains(&self, channel: &str) -> bool {
        self.channels.read().contains(channel)
    }

    /// Whether every channel in `channels` is tracked.
    pub fn contains_all<'a>(&self, channels: impl IntoIterator<Item = &'a str>) -> bool {
        channels.into_iter().all(|ch| self.contains(ch))
    }
}
