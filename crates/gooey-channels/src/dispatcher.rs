//! Event dispatcher.
//!
//! Consumes the transport's event stream and routes each event:
//!
//! ```text
//! IrcEvent ──> Join (self)  ──> MembershipTracker + supervisor watchdog
//!          ──> Join / Part  ──> RelaySink (when show_joins_parts)
//!          ──> Message      ──> RelaySink
//!          ──> Kick         ──> ConnectionSupervisor
//!          ──> Disconnect   ──> ConnectionSupervisor
//! ```

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Span, debug, info, info_span};

use gooey_types::event::IrcEvent;

use crate::membership::MembershipTracker;
use crate::relay::RelaySink;
use crate::supervisor::ConnectionSupervisor;

/// Routes inbound IRC events to their consumers.
pub struct EventDispatcher {
    nickname: String,
    show_joins_parts: bool,
    membership: MembershipTracker,
    relay: RelaySink,
    supervisor: ConnectionSupervisor,
    span: Span,
}

impl EventDispatcher {
    /// Create a dispatcher for the bot called `nickname`.
    pub fn new(
        nickname: impl Into<String>,
        show_joins_parts: bool,
        membership: MembershipTracker,
        relay: RelaySink,
        supervisor: ConnectionSupervisor,
    ) -> Self {
        Self {
            nickname: nickname.into(),
            show_joins_parts,
            membership,
            relay,
            supervisor,
            span: info_span!("dispatcher"),
        }
    }

    /// Log under `span` instead of the default.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Handle events until the stream closes or `cancel` fires.
    ///
    /// Events are handled one at a time; a slow webhook delays the next
    /// event, bounded by the HTTP client's timeout.
    pub async fn run(&self, mut events: mpsc::Receiver<IrcEvent>, cancel: CancellationToken) {
        info!(parent: &self.span, "dispatcher started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(parent: &self.span, "dispatcher shutting down");
                    break;
                }
                event = events.recv() => match event {
                    Some(event) => self.dispatch(event).await,
                    None => {
                        info!(parent: &self.span, "event stream closed");
                        break;
                    }
                }
            }
        }
    }

    /// Handle a single event.
    pub async fn dispatch(&self, event: IrcEvent) {
        debug!(parent: &self.span, kind = event.kind(), "event");
        match event {
            IrcEvent::Registered { nick } => {
                info!(parent: &self.span, nick = %nick, "registered with server");
                self.supervisor.on_connected();
            }
            IrcEvent::Join { channel, sender } => {
                // Exact match: a server-side case change of our nick would
                // not count as a self-join.
                if sender == self.nickname {
                    self.membership.on_self_join(&channel);
                    self.supervisor.on_self_join(&channel);
                }
                if self.show_joins_parts {
                    self.relay
                        .relay(&sender, &format!("{sender} has joined {channel}"))
                        .await;
                }
            }
            IrcEvent::Part { channel, sender } => {
                if self.show_joins_parts {
                    self.relay
                        .relay(&sender, &format!("{sender} has left {channel}"))
                        .await;
                }
            }
            IrcEvent::Message { sender, text, .. } => {
                self.relay.relay(&sender, &text).await;
            }
            IrcEvent::Kick {
                channel,
                kicker,
                recipient,
                reason,
            } => {
                self.supervisor
                    .on_kick(&channel, &kicker, &recipient, &reason);
            }
            IrcEvent::Disconnect => self.supervisor.on_disconnect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use url::Url;

    use gooey_platform::http::{HttpClient, HttpError, HttpResponse};
    use gooey_types::config::RetryConfig;

    use super::*;
    use crate::mock::MockTransport;
    use crate::supervisor::LinkState;

    const NICK: &str = "slack-gooey";

    #[derive(Default)]
    struct CapturingHttp {
        bodies: Mutex<Vec<serde_json::Value>>,
    }

    impl CapturingHttp {
        fn posted(&self) -> Vec<(String, String)> {
            self.bodies
                .lock()
                .iter()
                .map(|b| {
                    (
                        b["username"].as_str().unwrap_or_default().to_owned(),
                        b["text"].as_str().unwrap_or_default().to_owned(),
                    )
                })
                .collect()
        }
    }

    #[async_trait]
    impl HttpClient for CapturingHttp {
        async fn request(
            &self,
            _method: &str,
            _url: &str,
            _headers: &HashMap<String, String>,
            body: Option<&[u8]>,
        ) -> Result<HttpResponse, HttpError> {
            let json: serde_json::Value = serde_json::from_slice(body.unwrap_or_default())?;
            self.bodies.lock().push(json);
            Ok(HttpResponse {
                status: 200,
                headers: HashMap::new(),
                body: b"ok".to_vec(),
            })
        }
    }

    struct Harness {
        dispatcher: EventDispatcher,
        http: Arc<CapturingHttp>,
        transport: Arc<MockTransport>,
        membership: MembershipTracker,
        supervisor: ConnectionSupervisor,
    }

    fn harness(show_joins_parts: bool) -> Harness {
        let http = Arc::new(CapturingHttp::default());
        let transport = Arc::new(MockTransport::connected(NICK));
        let membership = MembershipTracker::new();
        let supervisor =
            ConnectionSupervisor::new(transport.clone(), membership.clone(), RetryConfig::default());
        let relay = RelaySink::new(
            http.clone(),
            Url::parse("https://hooks.example.com/services/x").unwrap(),
        );
        let dispatcher = EventDispatcher::new(
            NICK,
            show_joins_parts,
            membership.clone(),
            relay,
            supervisor.clone(),
        );
        Harness {
            dispatcher,
            http,
            transport,
            membership,
            supervisor,
        }
    }

    fn join(channel: &str, sender: &str) -> IrcEvent {
        IrcEvent::Join {
            channel: channel.into(),
            sender: sender.into(),
        }
    }

    #[tokio::test]
    async fn channel_messages_are_relayed_under_sender_name() {
        let h = harness(false);
        h.dispatcher
            .dispatch(IrcEvent::Message {
                channel: "#terasology".into(),
                sender: "alice".into(),
                text: "hello".into(),
            })
            .await;
        assert_eq!(h.http.posted(), vec![("alice".into(), "hello".into())]);
    }

    #[tokio::test]
    async fn joins_and_parts_relayed_only_when_enabled() {
        let h = harness(false);
        h.dispatcher.dispatch(join("#t", "alice")).await;
        h.dispatcher
            .dispatch(IrcEvent::Part {
                channel: "#t".into(),
                sender: "alice".into(),
            })
            .await;
        assert!(h.http.posted().is_empty());

        let h = harness(true);
        h.dispatcher.dispatch(join("#t", "alice")).await;
        h.dispatcher
            .dispatch(IrcEvent::Part {
                channel: "#t".into(),
                sender: "alice".into(),
            })
            .await;
        assert_eq!(
            h.http.posted(),
            vec![
                ("alice".into(), "alice has joined #t".into()),
                ("alice".into(), "alice has left #t".into()),
            ]
        );
    }

    #[tokio::test]
    async fn self_join_is_tracked_once() {
        let h = harness(false);
        h.dispatcher.dispatch(join("#t", NICK)).await;
        h.dispatcher.dispatch(join("#t", NICK)).await;
        h.dispatcher.dispatch(join("#other", "alice")).await;
        assert_eq!(h.membership.joined_channels(), vec!["#t"]);
    }

    #[tokio::test]
    async fn self_join_match_is_case_sensitive() {
        let h = harness(false);
        h.dispatcher.dispatch(join("#t", "Slack-Gooey")).await;
        assert!(h.membership.joined_channels().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn kick_and_rejoin_round_trip() {
        let h = harness(false);
        h.dispatcher
            .dispatch(IrcEvent::Kick {
                channel: "#t".into(),
                kicker: "op".into(),
                recipient: NICK.into(),
                reason: "flood".into(),
            })
            .await;
        assert_eq!(h.supervisor.state().watched_channels, vec!["#t"]);

        h.dispatcher.dispatch(join("#t", NICK)).await;
        assert!(h.supervisor.state().watched_channels.is_empty());
        assert_eq!(h.supervisor.state().pending_tasks, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_event_schedules_reconnect() {
        let h = harness(false);
        h.transport.drop_link();
        h.dispatcher.dispatch(IrcEvent::Disconnect).await;
        let snap = h.supervisor.state();
        assert_eq!(snap.link, LinkState::AwaitingReconnect);
        assert!(snap.reconnect_pending);
    }

    #[tokio::test]
    async fn run_stops_when_stream_closes() {
        let h = harness(false);
        let (tx, rx) = mpsc::channel(8);
        tx.send(IrcEvent::Message {
            channel: "#t".into(),
            sender: "alice".into(),
            text: "one".into(),
        })
        .await
        .unwrap();
        drop(tx);

        tokio::time::timeout(
            Duration::from_secs(5),
            h.dispatcher.run(rx, CancellationToken::new()),
        )
        .await
        .expect("dispatcher should stop when the stream closes");
        assert_eq!(h.http.posted().len(), 1);
    }

    #[tokio::test]
    async fn run_stops_on_cancel() {
        let h = harness(false);
        let (_tx, rx) = mpsc::channel::<IrcEvent>(8);
        let cancel = CancellationToken::new();
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), h.dispatcher.run(rx, cancel))
            .await
            .expect("dispatcher should stop on cancel");
    }
}
