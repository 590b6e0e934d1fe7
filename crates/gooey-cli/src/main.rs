//! `gooey` -- relays IRC channel traffic to a Slack-style incoming webhook.
//!
//! ```text
//! SLACK_TOKEN=... gooey
//! SLACK_TOKEN=... gooey --server irc.libera.chat --port 6697 --tls --channel '#terasology'
//! SLACK_TOKEN=... gooey --config /path/to/config.json --show-joins-parts -v
//! ```

use std::path::PathBuf;

use clap::Parser;

use gooey_platform::NativePlatform;
use gooey_platform::env::NativeEnvironment;
use gooey_platform::fs::NativeFileSystem;
use gooey_types::error::GooeyError;

mod bridge;

/// IRC to webhook bridge.
#[derive(Parser, Debug)]
#[command(name = "gooey", about = "Relay IRC channels to a Slack webhook", version)]
struct Cli {
    /// Config file path (overrides auto-discovery).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// IRC server hostname.
    #[arg(long)]
    server: Option<String>,

    /// IRC server port.
    #[arg(long)]
    port: Option<u16>,

    /// Connect with TLS.
    #[arg(long)]
    tls: bool,

    /// Bot nickname.
    #[arg(long)]
    nick: Option<String>,

    /// Channel to join on startup. Repeat for several channels.
    #[arg(long = "channel", value_name = "CHANNEL")]
    channels: Vec<String>,

    /// Relay join and part notices.
    #[arg(long)]
    show_joins_parts: bool,

    /// Enable verbose (debug-level) logging, including raw IRC traffic.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn overrides(&self) -> bridge::Overrides {
        bridge::Overrides {
            server: self.server.clone(),
            port: self.port,
            tls: self.tls,
            nick: self.nick.clone(),
            channels: self.channels.clone(),
            show_joins_parts: self.show_joins_parts,
            verbose: self.verbose,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    let resolved = bridge::resolve_config(
        cli.config.as_deref(),
        &cli.overrides(),
        &NativeFileSystem,
        &NativeEnvironment,
    )
    .await;
    let config = match resolved {
        Ok(config) => config,
        Err(e @ GooeyError::MissingToken { .. }) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    let platform = NativePlatform::new(config.webhook.timeout())?;
    bridge::run(config, &platform).await
}
