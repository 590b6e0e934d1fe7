//! Bridge startup and shutdown.
//!
//! # Lifecycle
//!
//! ```text
//! 1. Load config, apply CLI overrides, read SLACK_TOKEN, validate
//! 2. Build the relay sink (fails on a bad webhook URL)
//! 3. Build the IRC client, supervisor and dispatcher
//! 4. Spawn the dispatcher on the client's event stream
//! 5. Connect and join the initial channels (failure -> reconnect schedule)
//! 6. Wait for Ctrl+C, then dispose the supervisor and release the transport
//! ```

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use gooey_channels::irc::transport::IrcTransport;
use gooey_channels::{
    ConnectionSupervisor, EventDispatcher, IrcClient, IrcClientConfig, MembershipTracker,
    RelaySink, validate_config,
};
use gooey_platform::config_loader;
use gooey_platform::env::Environment;
use gooey_platform::fs::FileSystem;
use gooey_platform::{NativePlatform, Platform};
use gooey_types::SecretString;
use gooey_types::config::{GooeyConfig, TOKEN_ENV_VAR};
use gooey_types::error::Result;

/// Settings given on the command line. `None`/`false` leaves the file value.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub server: Option<String>,
    pub port: Option<u16>,
    pub tls: bool,
    pub nick: Option<String>,
    pub channels: Vec<String>,
    pub show_joins_parts: bool,
    pub verbose: bool,
}

impl Overrides {
    fn apply(&self, config: &mut GooeyConfig) {
        if let Some(server) = &self.server {
            config.server.clone_from(server);
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(nick) = &self.nick {
            config.nickname.clone_from(nick);
        }
        if !self.channels.is_empty() {
            config.channels.clone_from(&self.channels);
        }
        config.use_tls |= self.tls;
        config.show_joins_parts |= self.show_joins_parts;
        config.verbose |= self.verbose;
    }
}

/// Build the effective configuration: defaults, then the config file,
/// then CLI flags, then the token from the environment. The result is
/// validated.
pub async fn resolve_config(
    config_path: Option<&Path>,
    overrides: &Overrides,
    fs: &dyn FileSystem,
    env: &dyn Environment,
) -> Result<GooeyConfig> {
    let mut config = config_loader::load_config(config_path, fs, env).await?;
    overrides.apply(&mut config);
    if let Some(token) = env.get_var(TOKEN_ENV_VAR) {
        config.webhook.token = SecretString::new(token);
    }
    validate_config(&config)?;
    Ok(config)
}

/// Run the bridge until Ctrl+C.
pub async fn run(config: GooeyConfig, platform: &NativePlatform) -> anyhow::Result<()> {
    let relay = RelaySink::from_config(platform.http(), &config.webhook)?;

    let (client, events) = IrcClient::new(IrcClientConfig::from(&config));
    let transport: Arc<dyn IrcTransport> = Arc::new(client);
    let membership = MembershipTracker::new();
    let supervisor =
        ConnectionSupervisor::new(transport, membership.clone(), config.retry.clone());
    let dispatcher = EventDispatcher::new(
        config.nickname.clone(),
        config.show_joins_parts,
        membership,
        relay,
        supervisor.clone(),
    );

    info!(
        server = %config.server,
        port = config.port,
        tls = config.use_tls,
        nick = %config.nickname,
        channels = ?config.channels,
        "starting bridge"
    );

    let cancel = CancellationToken::new();
    let dispatch_cancel = cancel.clone();
    let dispatch_handle = tokio::spawn(async move {
        dispatcher.run(events, dispatch_cancel).await;
    });

    supervisor.start(&config.channels).await;

    info!("bridge running, press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    cancel.cancel();
    supervisor.dispose().await;
    if let Err(e) = dispatch_handle.await {
        warn!(error = %e, "dispatcher task ended abnormally");
    }

    info!("bridge stopped");
    Ok(())
}
