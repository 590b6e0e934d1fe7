//! Bridge configuration schema.
//!
//! Every field has a default so that an empty JSON object (or no config
//! file at all) yields the stock bridge: `slack-gooey` on
//! `chat.freenode.net`, sitting in `#terasology`. Keys accept both
//! snake_case and camelCase.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{GooeyError, Result};
use crate::secret::SecretString;

/// Environment variable that carries the webhook token.
pub const TOKEN_ENV_VAR: &str = "SLACK_TOKEN";

/// Default webhook URL prefix; the token is appended verbatim.
pub const DEFAULT_WEBHOOK_BASE: &str = "https://hooks.slack.com/services/T03G8SB1X/B08C02P6F/";

/// Root configuration for the bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GooeyConfig {
    /// Bot nickname. Also used as login and real name.
    #[serde(default = "default_nickname", alias = "name")]
    pub nickname: String,

    /// IRC server hostname.
    #[serde(default = "default_server")]
    pub server: String,

    /// IRC server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Whether to wrap the IRC connection in TLS.
    #[serde(default, alias = "useTls")]
    pub use_tls: bool,

    /// Channels to join after the first successful connect.
    #[serde(default = "default_channels")]
    pub channels: Vec<String>,

    /// Relay join/part notices as chat messages.
    #[serde(default, alias = "showJoinsParts")]
    pub show_joins_parts: bool,

    /// Log raw IRC traffic at debug level.
    #[serde(default)]
    pub verbose: bool,

    /// Outbound webhook settings.
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Reconnect and rejoin timing.
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_nickname() -> String {
    "slack-gooey".into()
}

fn default_server() -> String {
    "chat.freenode.net".into()
}

fn default_port() -> u16 {
    6667
}

fn default_channels() -> Vec<String> {
    vec!["#terasology".into()]
}

impl Default for GooeyConfig {
    fn default() -> Self {
        Self {
            nickname: default_nickname(),
            server: default_server(),
            port: default_port(),
            use_tls: false,
            channels: default_channels(),
            show_joins_parts: false,
            verbose: false,
            webhook: WebhookConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

/// Webhook endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// URL prefix the token is appended to.
    #[serde(default = "default_webhook_base", alias = "baseUrl")]
    pub base_url: String,

    /// Webhook token. Normally supplied through [`TOKEN_ENV_VAR`].
    #[serde(default)]
    pub token: SecretString,

    /// Request timeout in seconds for each relay POST.
    #[serde(default = "default_timeout_secs", alias = "timeoutSecs")]
    pub timeout_secs: u64,
}

fn default_webhook_base() -> String {
    DEFAULT_WEBHOOK_BASE.into()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            base_url: default_webhook_base(),
            token: SecretString::default(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl WebhookConfig {
    /// Build the full webhook URL (`base_url` + token).
    ///
    /// Fails with [`GooeyError::MissingToken`] when no token is set and
    /// [`GooeyError::InvalidWebhookUrl`] when the result is not an
    /// `http(s)` URL. Error messages never contain the token.
    pub fn url(&self) -> Result<Url> {
        if self.token.is_empty() {
            return Err(GooeyError::MissingToken {
                var: TOKEN_ENV_VAR.into(),
            });
        }
        let redacted = format!("{}{}", self.base_url, self.token);
        let full = format!("{}{}", self.base_url, self.token.expose());
        let url = Url::parse(&full).map_err(|e| GooeyError::InvalidWebhookUrl {
            url: redacted.clone(),
            reason: e.to_string(),
        })?;
        match url.scheme() {
            "https" | "http" => Ok(url),
            other => Err(GooeyError::InvalidWebhookUrl {
                url: redacted,
                reason: format!("unsupported scheme {other:?}"),
            }),
        }
    }

    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Delays driving the connection supervisor's retry tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Delay before the first reconnect attempt after a disconnect.
    #[serde(default = "default_reconnect_first_secs", alias = "reconnectFirstSecs")]
    pub reconnect_first_secs: u64,

    /// Delay between subsequent reconnect attempts after a failure.
    #[serde(default = "default_reconnect_backoff_secs", alias = "reconnectBackoffSecs")]
    pub reconnect_backoff_secs: u64,

    /// Cooldown between rejoin attempts after a kick.
    #[serde(default = "default_rejoin_secs", alias = "rejoinSecs")]
    pub rejoin_secs: u64,

    /// Stop a channel's rejoin watchdog as soon as our own join is seen.
    #[serde(default = "default_true", alias = "cancelWatchdogOnRejoin")]
    pub cancel_watchdog_on_rejoin: bool,
}

fn default_reconnect_first_secs() -> u64 {
    60
}

fn default_reconnect_backoff_secs() -> u64 {
    15 * 60
}

fn default_rejoin_secs() -> u64 {
    10 * 60
}

fn default_true() -> bool {
    true
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            reconnect_first_secs: default_reconnect_first_secs(),
            reconnect_backoff_secs: default_reconnect_backoff_secs(),
            rejoin_secs: default_rejoin_secs(),
            cancel_watchdog_on_rejoin: default_true(),
        }
    }
}

impl RetryConfig {
    /// Delay before the first reconnect attempt.
    pub fn reconnect_first(&self) -> Duration {
        Duration::from_secs(self.reconnect_first_secs)
    }

    /// Delay before each reconnect attempt after a failed one.
    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_secs(self.reconnect_backoff_secs)
    }

    /// Rejoin watchdog period.
    pub fn rejoin(&self) -> Duration {
        Duration::from_secs(self.rejoin_secs)
    }
}
