//! TCP/TLS IRC client.
//!
//! [`IrcClient`] implements [`IrcTransport`] over a plain or TLS socket.
//! Each connection gets a reader task that answers `PING`, keeps the live
//! channel roster, pings a silent link itself and publishes
//! [`IrcEvent`]s. The event channel outlives individual connections, so the
//! dispatcher keeps one receiver across reconnects.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Split};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_util::sync::CancellationToken;
use tracing::{Span, debug, info, info_span, trace, warn};

use gooey_types::config::GooeyConfig;
use gooey_types::error::TransportError;
use gooey_types::event::IrcEvent;

use super::message::{self, IrcMessage, ctcp_request, nick_eq};
use super::transport::IrcTransport;
use crate::validate::sanitize_channel_name;

/// How long to wait for the TCP connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// How long the server has to send `001` after `NICK`/`USER`.
const REGISTRATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Silence after which we send our own `PING`.
const KEEPALIVE_AFTER: Duration = Duration::from_secs(120);

/// Silence after which the link is declared dead.
const DEAD_LINK_AFTER: Duration = Duration::from_secs(240);

/// Capacity of the event channel.
const EVENT_BUFFER: usize = 256;

/// Answer to a CTCP `VERSION` request.
const CTCP_VERSION: &str = "1.0";

type BoxReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxWriter = Box<dyn AsyncWrite + Send + Unpin>;
type SharedWriter = Arc<Mutex<BoxWriter>>;
type LineReader = Split<BufReader<BoxReader>>;

/// Connection settings for [`IrcClient`].
#[derive(Debug, Clone)]
pub struct IrcClientConfig {
    /// Server hostname.
    pub server: String,
    /// Server port.
    pub port: u16,
    /// Wrap the socket in TLS.
    pub use_tls: bool,
    /// Nickname; also used as login and real name.
    pub nickname: String,
    /// Log every inbound line at debug level.
    pub verbose: bool,
}

impl From<&GooeyConfig> for IrcClientConfig {
    fn from(config: &GooeyConfig) -> Self {
        Self {
            server: config.server.clone(),
            port: config.port,
            use_tls: config.use_tls,
            nickname: config.nickname.clone(),
            verbose: config.verbose,
        }
    }
}

/// Connection state shared with the reader task.
#[derive(Default)]
struct Link {
    connected: AtomicBool,
    roster: parking_lot::Mutex<BTreeSet<String>>,
}

impl Link {
    fn mark_down(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.roster.lock().clear();
    }
}

struct Connection {
    writer: SharedWriter,
    cancel: CancellationToken,
    reader: JoinHandle<()>,
}

/// IRC client over TCP, optionally TLS.
pub struct IrcClient {
    config: IrcClientConfig,
    events: mpsc::Sender<IrcEvent>,
    link: Arc<Link>,
    conn: Mutex<Option<Connection>>,
    span: Span,
}

impl IrcClient {
    /// Create a disconnected client and the receiver for its events.
    pub fn new(config: IrcClientConfig) -> (Self, mpsc::Receiver<IrcEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let span = info_span!("irc", server = %config.server, port = config.port);
        let client = Self {
            config,
            events: tx,
            link: Arc::default(),
            conn: Mutex::new(None),
            span,
        };
        (client, rx)
    }

    async fn open_stream(&self) -> Result<(BoxReader, BoxWriter), TransportError> {
        let server = self.config.server.as_str();
        let port = self.config.port;

        let tcp = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect((server, port)))
            .await
            .map_err(|_| {
                TransportError::Timeout(format!(
                    "connecting to {server}:{port} took longer than {}s",
                    CONNECT_TIMEOUT.as_secs()
                ))
            })?
            .map_err(|e| TransportError::ConnectionFailed(format!("{server}:{port}: {e}")))?;

        if !self.config.use_tls {
            let (r, w) = tcp.into_split();
            return Ok((Box::new(r), Box::new(w)));
        }

        let name = ServerName::try_from(server.to_owned()).map_err(|e| {
            TransportError::ConnectionFailed(format!("invalid TLS server name {server:?}: {e}"))
        })?;
        let tls = tls_connector()
            .connect(name, tcp)
            .await
            .map_err(|e| TransportError::ConnectionFailed(format!("TLS handshake failed: {e}")))?;
        let (r, w) = tokio::io::split(tls);
        Ok((Box::new(r), Box::new(w)))
    }

    /// Register over an open stream and start the reader task.
    async fn establish(&self, reader: BoxReader, writer: BoxWriter) -> Result<(), TransportError> {
        let writer: SharedWriter = Arc::new(Mutex::new(writer));
        let mut lines = BufReader::new(reader).split(b'\n');

        let nick = tokio::time::timeout(REGISTRATION_TIMEOUT, self.register(&mut lines, &writer))
            .await
            .map_err(|_| {
                TransportError::Timeout(format!(
                    "no welcome from server within {}s",
                    REGISTRATION_TIMEOUT.as_secs()
                ))
            })??;

        self.link.roster.lock().clear();
        self.link.connected.store(true, Ordering::SeqCst);
        info!(parent: &self.span, nick = %nick, "registered");
        let _ = self.events.send(IrcEvent::Registered { nick }).await;

        let cancel = CancellationToken::new();
        let task = ReaderTask {
            writer: writer.clone(),
            link: self.link.clone(),
            events: self.events.clone(),
            cancel: cancel.clone(),
            nickname: self.config.nickname.clone(),
            server: self.config.server.clone(),
            verbose: self.config.verbose,
            span: self.span.clone(),
        };
        let reader = tokio::spawn(task.run(lines));

        *self.conn.lock().await = Some(Connection {
            writer,
            cancel,
            reader,
        });
        Ok(())
    }

    async fn register(
        &self,
        lines: &mut LineReader,
        writer: &SharedWriter,
    ) -> Result<String, TransportError> {
        let nick = self.config.nickname.as_str();
        write_message(writer, &message::nick(nick)).await?;
        write_message(writer, &message::user(nick, nick)).await?;

        loop {
            let line = next_line(lines)
                .await
                .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?
                .ok_or_else(|| {
                    TransportError::ConnectionFailed(
                        "server closed the connection during registration".into(),
                    )
                })?;
            if self.config.verbose {
                debug!(parent: &self.span, line = %line, "<<");
            }
            let Some(msg) = IrcMessage::parse(&line) else {
                continue;
            };
            match msg.command.as_str() {
                "001" => return Ok(msg.param(0).to_owned()),
                "PING" => write_message(writer, &message::pong(msg.param(0))).await?,
                // ERR_ERRONEUSNICKNAME, ERR_NICKNAMEINUSE, ERR_NICKCOLLISION
                "432" | "433" | "436" => {
                    return Err(TransportError::RegistrationFailed(format!(
                        "nickname {nick:?} rejected: {}",
                        msg.params.last().map(String::as_str).unwrap_or("")
                    )));
                }
                "ERROR" => {
                    return Err(TransportError::RegistrationFailed(msg.param(0).to_owned()));
                }
                _ => {}
            }
        }
    }

    /// Stop the current connection without emitting a disconnect event.
    async fn teardown(&self, quit: bool) {
        let Some(conn) = self.conn.lock().await.take() else {
            self.link.mark_down();
            return;
        };
        conn.cancel.cancel();
        if quit {
            if let Err(e) = write_message(&conn.writer, &message::quit("Leaving")).await {
                debug!(parent: &self.span, error = %e, "QUIT not sent");
            }
        }
        if let Err(e) = conn.writer.lock().await.shutdown().await {
            debug!(parent: &self.span, error = %e, "socket shutdown failed");
        }
        conn.reader.abort();
        self.link.mark_down();
    }
}

#[async_trait]
impl IrcTransport for IrcClient {
    fn nickname(&self) -> &str {
        &self.config.nickname
    }

    fn is_connected(&self) -> bool {
        self.link.connected.load(Ordering::SeqCst)
    }

    fn channels(&self) -> Vec<String> {
        self.link.roster.lock().iter().cloned().collect()
    }

    async fn connect(&self) -> Result<(), TransportError> {
        self.teardown(false).await;
        info!(parent: &self.span, tls = self.config.use_tls, "connecting");
        let (reader, writer) = self.open_stream().await?;
        self.establish(reader, writer).await
    }

    async fn reconnect(&self) -> Result<(), TransportError> {
        self.connect().await
    }

    async fn join_channel(&self, channel: &str) -> Result<(), TransportError> {
        sanitize_channel_name(channel).map_err(TransportError::Protocol)?;
        let conn = self.conn.lock().await;
        let Some(conn) = conn.as_ref().filter(|_| self.is_connected()) else {
            return Err(TransportError::NotConnected);
        };
        debug!(parent: &self.span, channel = %channel, "joining");
        write_message(&conn.writer, &message::join(channel)).await
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        info!(parent: &self.span, "disconnecting");
        self.teardown(true).await;
        Ok(())
    }
}

/// Per-connection inbound loop. The line reader is passed to
/// [`run`](Self::run) rather than stored, so `&ReaderTask` stays `Sync`
/// across the awaits in `handle_line`.
struct ReaderTask {
    writer: SharedWriter,
    link: Arc<Link>,
    events: mpsc::Sender<IrcEvent>,
    cancel: CancellationToken,
    nickname: String,
    server: String,
    verbose: bool,
    span: Span,
}

impl ReaderTask {
    async fn run(self, mut lines: LineReader) {
        let mut last_seen = Instant::now();
        let mut probing = false;

        let reason = loop {
            let deadline = last_seen + if probing { DEAD_LINK_AFTER } else { KEEPALIVE_AFTER };
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return,
                line = next_line(&mut lines) => match line {
                    Ok(Some(line)) => {
                        last_seen = Instant::now();
                        probing = false;
                        if let Err(e) = self.handle_line(&line).await {
                            break e.to_string();
                        }
                    }
                    Ok(None) => break "connection closed by server".to_owned(),
                    Err(e) => break format!("read failed: {e}"),
                },
                _ = tokio::time::sleep_until(deadline) => {
                    if probing {
                        break format!("no traffic for {}s", DEAD_LINK_AFTER.as_secs());
                    }
                    trace!(parent: &self.span, "link idle, sending keepalive");
                    if let Err(e) = write_message(&self.writer, &message::ping(&self.server)).await {
                        break e.to_string();
                    }
                    probing = true;
                }
            }
        };

        if self.cancel.is_cancelled() {
            return;
        }
        self.link.mark_down();
        warn!(parent: &self.span, reason = %reason, "connection lost");
        let _ = self.events.send(IrcEvent::Disconnect).await;
    }

    fn is_me(&self, nick: Option<&str>) -> bool {
        nick.is_some_and(|n| nick_eq(n, &self.nickname))
    }

    async fn handle_line(&self, line: &str) -> Result<(), TransportError> {
        if self.verbose {
            debug!(parent: &self.span, line = %line, "<<");
        }
        let Some(msg) = IrcMessage::parse(line) else {
            return Ok(());
        };

        match msg.command.as_str() {
            "PING" => write_message(&self.writer, &message::pong(msg.param(0))).await?,
            "PRIVMSG" => self.answer_ctcp(&msg).await?,
            "JOIN" if self.is_me(msg.source_nick()) => {
                self.link.roster.lock().insert(msg.param(0).to_owned());
            }
            "PART" if self.is_me(msg.source_nick()) => {
                self.link.roster.lock().remove(msg.param(0));
            }
            "KICK" if self.is_me(Some(msg.param(1))) => {
                self.link.roster.lock().remove(msg.param(0));
            }
            "ERROR" => warn!(parent: &self.span, message = %msg.param(0), "server error"),
            _ => {}
        }

        if let Some(event) = msg.to_event() {
            if self.events.send(event).await.is_err() {
                trace!(parent: &self.span, "event receiver dropped");
            }
        }
        Ok(())
    }

    /// Reply to CTCP `VERSION`, `FINGER` and `PING` with a `NOTICE`.
    /// Other CTCP requests, `ACTION` included, get no answer.
    async fn answer_ctcp(&self, msg: &IrcMessage) -> Result<(), TransportError> {
        let (Some(from), Some((command, arg))) = (msg.source_nick(), ctcp_request(msg.param(1)))
        else {
            return Ok(());
        };
        let value = match command.to_ascii_uppercase().as_str() {
            "VERSION" => CTCP_VERSION.to_owned(),
            "FINGER" => self.nickname.clone(),
            "PING" => arg.to_owned(),
            _ => return Ok(()),
        };
        debug!(parent: &self.span, from = %from, command = %command, "answering CTCP request");
        write_message(&self.writer, &message::ctcp_reply(from, command, &value)).await
    }
}

/// Read one line, without the line terminator. `None` on EOF.
///
/// Invalid UTF-8 is replaced rather than rejected; IRC does not mandate an
/// encoding.
async fn next_line(lines: &mut LineReader) -> std::io::Result<Option<String>> {
    Ok(lines.next_segment().await?.map(|raw| {
        String::from_utf8_lossy(&raw)
            .trim_end_matches('\r')
            .to_owned()
    }))
}

async fn write_message(writer: &SharedWriter, msg: &IrcMessage) -> Result<(), TransportError> {
    let line = format!("{msg}\r\n");
    let mut w = writer.lock().await;
    w.write_all(line.as_bytes())
        .await
        .map_err(|e| TransportError::SendFailed(e.to_string()))?;
    w.flush()
        .await
        .map_err(|e| TransportError::SendFailed(e.to_string()))
}

fn tls_connector() -> TlsConnector {
    // Fails only if a provider is already installed, which is fine.
    let _ = rustls::crypto::ring::default_provider().install_default();
    let roots = rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncBufReadExt, DuplexStream, ReadHalf, WriteHalf};
    use tokio::net::TcpListener;

    use super::*;

    const NICK: &str = "slack-gooey";

    fn config(server: &str, port: u16) -> IrcClientConfig {
        IrcClientConfig {
            server: server.into(),
            port,
            use_tls: false,
            nickname: NICK.into(),
            verbose: true,
        }
    }

    /// Server end of an in-memory connection.
    struct FakeServer {
        lines: tokio::io::Lines<BufReader<ReadHalf<DuplexStream>>>,
        out: WriteHalf<DuplexStream>,
    }

    impl FakeServer {
        async fn send(&mut self, line: &str) {
            self.out.write_all(format!("{line}\r\n").as_bytes()).await.unwrap();
        }

        async fn expect(&mut self) -> String {
            self.lines.next_line().await.unwrap().expect("client closed")
        }
    }

    fn pipe() -> (BoxReader, BoxWriter, FakeServer) {
        let (client_io, server_io) = tokio::io::duplex(64 * 1024);
        let (cr, cw) = tokio::io::split(client_io);
        let (sr, sw) = tokio::io::split(server_io);
        let server = FakeServer {
            lines: BufReader::new(sr).lines(),
            out: sw,
        };
        (Box::new(cr), Box::new(cw), server)
    }

    async fn registered() -> (IrcClient, mpsc::Receiver<IrcEvent>, FakeServer) {
        let (client, mut rx) = IrcClient::new(config("irc.test", 6667));
        let (r, w, mut server) = pipe();
        server.send(":irc.test 001 slack-gooey :Welcome").await;
        client.establish(r, w).await.unwrap();
        assert_eq!(server.expect().await, "NICK slack-gooey");
        assert_eq!(server.expect().await, "USER slack-gooey 0 * slack-gooey");
        assert_eq!(
            rx.recv().await,
            Some(IrcEvent::Registered { nick: NICK.into() })
        );
        (client, rx, server)
    }

    #[tokio::test]
    async fn registration_marks_connected() {
        let (client, _rx, _server) = registered().await;
        assert!(client.is_connected());
        assert!(client.channels().is_empty());
    }

    #[tokio::test]
    async fn ping_during_registration_is_answered() {
        let (client, _rx) = IrcClient::new(config("irc.test", 6667));
        let (r, w, mut server) = pipe();
        server.send("PING :handshake").await;
        server.send(":irc.test 001 slack-gooey :Welcome").await;
        client.establish(r, w).await.unwrap();
        server.expect().await;
        server.expect().await;
        assert_eq!(server.expect().await, "PONG handshake");
    }

    #[tokio::test]
    async fn nickname_in_use_fails_registration() {
        let (client, _rx) = IrcClient::new(config("irc.test", 6667));
        let (r, w, mut server) = pipe();
        server
            .send(":irc.test 433 * slack-gooey :Nickname is already in use")
            .await;
        let err = client.establish(r, w).await.unwrap_err();
        assert!(matches!(err, TransportError::RegistrationFailed(_)));
        assert!(!client.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn silent_server_times_out_registration() {
        let (client, _rx) = IrcClient::new(config("irc.test", 6667));
        let (r, w, _server) = pipe();
        let err = client.establish(r, w).await.unwrap_err();
        assert!(matches!(err, TransportError::Timeout(_)));
    }

    #[tokio::test]
    async fn ping_is_answered() {
        let (_client, _rx, mut server) = registered().await;
        server.send("PING :irc.test").await;
        assert_eq!(server.expect().await, "PONG irc.test");
    }

    #[tokio::test]
    async fn roster_follows_confirmed_joins_parts_and_kicks() {
        let (client, mut rx, mut server) = registered().await;

        client.join_channel("#t").await.unwrap();
        assert_eq!(server.expect().await, "JOIN #t");
        assert!(client.channels().is_empty());

        server.send(":slack-gooey!u@h JOIN #t").await;
        assert_eq!(
            rx.recv().await,
            Some(IrcEvent::Join { channel: "#t".into(), sender: NICK.into() })
        );
        assert_eq!(client.channels(), vec!["#t"]);

        server.send(":alice!a@h JOIN #t").await;
        rx.recv().await;
        assert_eq!(client.channels(), vec!["#t"]);

        server.send(":op!o@h KICK #t slack-gooey :bye").await;
        assert!(matches!(rx.recv().await, Some(IrcEvent::Kick { .. })));
        assert!(client.channels().is_empty());

        server.send(":slack-gooey!u@h JOIN #u").await;
        rx.recv().await;
        server.send(":slack-gooey!u@h PART #u").await;
        rx.recv().await;
        assert!(client.channels().is_empty());
    }

    #[tokio::test]
    async fn messages_become_events() {
        let (_client, mut rx, mut server) = registered().await;
        server.send(":alice!a@h PRIVMSG slack-gooey :private").await;
        server.send(":alice!a@h PRIVMSG #t :public").await;
        assert_eq!(
            rx.recv().await,
            Some(IrcEvent::Message {
                channel: "#t".into(),
                sender: "alice".into(),
                text: "public".into()
            })
        );
    }

    #[tokio::test]
    async fn ctcp_version_finger_and_ping_are_answered() {
        let (_client, _rx, mut server) = registered().await;

        server.send(":alice!a@h PRIVMSG #t :\x01VERSION\x01").await;
        assert_eq!(server.expect().await, "NOTICE alice :\x01VERSION 1.0\x01");

        server.send(":bob!b@h PRIVMSG slack-gooey :\x01FINGER\x01").await;
        assert_eq!(server.expect().await, "NOTICE bob :\x01FINGER slack-gooey\x01");

        server.send(":bob!b@h PRIVMSG slack-gooey :\x01PING 1700000000\x01").await;
        assert_eq!(server.expect().await, "NOTICE bob :\x01PING 1700000000\x01");
    }

    #[tokio::test]
    async fn ctcp_action_is_neither_relayed_nor_answered() {
        let (_client, mut rx, mut server) = registered().await;
        server.send(":alice!a@h PRIVMSG #t :\x01ACTION waves\x01").await;
        server.send(":alice!a@h PRIVMSG #t :after").await;
        assert_eq!(
            rx.recv().await,
            Some(IrcEvent::Message {
                channel: "#t".into(),
                sender: "alice".into(),
                text: "after".into()
            })
        );

        // Nothing was written back for the ACTION: the next outbound line
        // is the PONG for this PING.
        server.send("PING :check").await;
        assert_eq!(server.expect().await, "PONG check");
    }

    #[test]
    fn reader_task_future_is_send() {
        fn assert_send<T: Send>(_: &T) {}

        let (r, w, _server) = pipe();
        let (tx, _rx) = mpsc::channel(1);
        let task = ReaderTask {
            writer: Arc::new(Mutex::new(w)),
            link: Arc::default(),
            events: tx,
            cancel: CancellationToken::new(),
            nickname: NICK.into(),
            server: "irc.test".into(),
            verbose: false,
            span: Span::none(),
        };
        let fut = task.run(BufReader::new(r).split(b'\n'));
        assert_send(&fut);
    }

    #[tokio::test]
    async fn server_eof_emits_exactly_one_disconnect() {
        let (client, mut rx, server) = registered().await;
        drop(server);

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap();
        assert_eq!(event, Some(IrcEvent::Disconnect));
        assert!(!client.is_connected());
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn deliberate_disconnect_emits_nothing() {
        let (client, mut rx, mut server) = registered().await;
        client.disconnect().await.unwrap();
        assert_eq!(server.expect().await, "QUIT Leaving");
        assert!(!client.is_connected());

        let next = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
        assert!(next.is_err(), "unexpected event {next:?}");
    }

    #[tokio::test]
    async fn join_requires_connection() {
        let (client, _rx) = IrcClient::new(config("irc.test", 6667));
        let err = client.join_channel("#t").await.unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));
    }

    #[tokio::test]
    async fn join_rejects_injection() {
        let (client, _rx, _server) = registered().await;
        let err = client.join_channel("#t\r\nQUIT").await.unwrap_err();
        assert!(matches!(err, TransportError::Protocol(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn silent_link_is_pinged_then_declared_dead() {
        let (client, mut rx, mut server) = registered().await;

        assert_eq!(server.expect().await, "PING irc.test");
        assert_eq!(rx.recv().await, Some(IrcEvent::Disconnect));
        assert!(!client.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn answered_keepalive_keeps_link_up() {
        let (client, _rx, mut server) = registered().await;

        assert_eq!(server.expect().await, "PING irc.test");
        server.send(":irc.test PONG irc.test :irc.test").await;
        tokio::time::advance(Duration::from_secs(200)).await;
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn connect_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (sock, _) = listener.accept().await.unwrap();
            let (r, mut w) = sock.into_split();
            let mut lines = BufReader::new(r).lines();
            let nick = lines.next_line().await.unwrap().unwrap();
            let user = lines.next_line().await.unwrap().unwrap();
            w.write_all(b":srv 001 slack-gooey :hi\r\n").await.unwrap();
            let join = lines.next_line().await.unwrap().unwrap();
            (nick, user, join)
        });

        let (client, mut rx) = IrcClient::new(config("127.0.0.1", port));
        client.connect().await.unwrap();
        assert!(matches!(rx.recv().await, Some(IrcEvent::Registered { .. })));
        client.join_channel("#terasology").await.unwrap();

        let (nick, user, join) = server.await.unwrap();
        assert_eq!(nick, "NICK slack-gooey");
        assert!(user.starts_with("USER slack-gooey"));
        assert_eq!(join, "JOIN #terasology");
    }

    #[tokio::test]
    async fn connect_to_closed_port_fails() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let (client, _rx) = IrcClient::new(config("127.0.0.1", port));
        let err = client.connect().await.unwrap_err();
        assert!(matches!(err, TransportError::ConnectionFailed(_)));
        assert!(!client.is_connected());
    }
}
