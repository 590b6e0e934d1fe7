//! Relay sink: forwards chat lines to the webhook.
//!
//! One POST per message, body `{"username": ..., "text": ...}`. Failures
//! are logged and the message is dropped; nothing is retried and nothing
//! propagates to the caller.

use std::sync::Arc;

use serde::Serialize;
use tracing::{Span, debug, info, info_span, warn};
use url::Url;

use gooey_platform::http::{HttpClient, HttpResponse};
use gooey_types::config::WebhookConfig;
use gooey_types::error::{RelayError, Result};

/// JSON body accepted by the webhook.
#[derive(Debug, Serialize)]
pub struct WebhookPayload<'a> {
    /// Display name the message is posted under.
    pub username: &'a str,
    /// Message text.
    pub text: &'a str,
}

/// Posts messages to a fixed webhook URL.
#[derive(Clone)]
pub struct RelaySink {
    http: Arc<dyn HttpClient>,
    url: Url,
    span: Span,
}

impl RelaySink {
    /// Create a sink for an already-validated URL.
    pub fn new(http: Arc<dyn HttpClient>, url: Url) -> Self {
        Self::with_span(http, url, info_span!("relay"))
    }

    /// Like [`new`](Self::new), logging under `span`.
    pub fn with_span(http: Arc<dyn HttpClient>, url: Url, span: Span) -> Self {
        Self { http, url, span }
    }

    /// Build the sink from webhook settings.
    ///
    /// Fails if the token is missing or the URL does not parse.
    pub fn from_config(http: Arc<dyn HttpClient>, config: &WebhookConfig) -> Result<Self> {
        Ok(Self::new(http, config.url()?))
    }

    /// Forward one message. Always returns normally.
    pub async fn relay(&self, sender: &str, text: &str) {
        match self.post(sender, text).await {
            Ok(response) => {
                for line in response.text_lossy().lines() {
                    info!(parent: &self.span, line = %line, "webhook response");
                }
                if !response.is_success() {
                    let err = RelayError::Status {
                        status: response.status,
                    };
                    warn!(parent: &self.span, sender = %sender, error = %err, "webhook rejected message");
                }
            }
            Err(e) => {
                warn!(parent: &self.span, sender = %sender, error = %e, "failed to relay message");
            }
        }
    }

    async fn post(&self, sender: &str, text: &str) -> std::result::Result<HttpResponse, RelayError> {
        let body = serde_json::to_vec(&WebhookPayload {
            username: sender,
            text,
        })?;
        debug!(parent: &self.span, sender = %sender, bytes = body.len(), "posting to webhook");
        self.http
            .post_json(self.url.as_str(), &body)
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))
    }
}

impl std::fmt::Debug for RelaySink {
    // The URL embeds the token.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelaySink")
            .field("host", &self.url.host_str())
            .finish_non_exhaustive()
    }
}
