//! Error types for the gooey bridge.
//!
//! [`GooeyError`] is the top-level error. [`TransportError`] covers the IRC
//! side and [`RelayError`] the webhook side. All three are non-exhaustive.

use thiserror::Error;

/// Top-level error type for the bridge.
///
/// Transport failures are recoverable (the supervisor retries them); the
/// configuration variants are fatal at startup.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GooeyError {
    // ── Recoverable ──────────────────────────────────────────────────

    /// An IRC transport operation failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The retry scheduler has been disposed and accepts no more tasks.
    #[error("retry scheduler is closed")]
    SchedulerClosed,

    /// A retry delay too large to turn into a deadline.
    #[error("retry delay of {secs}s is out of range")]
    DelayOutOfRange {
        /// The requested delay in seconds.
        secs: u64,
    },

    // ── Fatal ────────────────────────────────────────────────────────

    /// Configuration is malformed or semantically invalid.
    #[error("invalid config: {reason}")]
    ConfigInvalid {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// The webhook token was not supplied.
    #[error("The environment variable {var} must be defined first!")]
    MissingToken {
        /// Name of the environment variable that should hold the token.
        var: String,
    },

    /// The webhook URL built from the base URL and token is not usable.
    #[error("invalid webhook url {url:?}: {reason}")]
    InvalidWebhookUrl {
        /// The URL (with the token redacted).
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// IRC transport error.
///
/// Returned by every `IrcTransport` operation in `gooey-channels`. None of
/// these are fatal to the process.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TransportError {
    /// Could not open the TCP/TLS connection.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The server refused or never completed registration.
    #[error("registration failed: {0}")]
    RegistrationFailed(String),

    /// The operation needs a live connection and there is none.
    #[error("not connected")]
    NotConnected,

    /// Writing a command to the server failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// The server sent something we could not make sense of.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// An operation exceeded its deadline.
    #[error("timed out: {0}")]
    Timeout(String),

    /// Catch-all for errors that do not fit other variants.
    #[error("{0}")]
    Other(String),
}

/// Webhook delivery error.
///
/// Only ever logged: the relay sink swallows these so that a failed
/// delivery never reaches the IRC event loop.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RelayError {
    /// The HTTP request could not be completed.
    #[error("webhook request failed: {0}")]
    Transport(String),

    /// The webhook answered with a non-2xx status.
    #[error("webhook returned status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The payload could not be encoded.
    #[error("payload encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, GooeyError>;
