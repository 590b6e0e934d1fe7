//! # gooey-types
//!
//! Core type definitions for the gooey IRC-to-webhook bridge.
//!
//! Every other gooey crate depends on this one. It contains:
//!
//! - **[`error`]** -- [`GooeyError`], [`TransportError`] and [`RelayError`]
//! - **[`config`]** -- the bridge configuration schema and webhook URL construction
//! - **[`event`]** -- inbound IRC events consumed by the dispatcher
//! - **[`secret`]** -- [`SecretString`] for the webhook token

pub mod config;
pub mod error;
pub mod event;
pub mod secret;

pub use error::{GooeyError, RelayError, Result, TransportError};
pub use secret::SecretString;
