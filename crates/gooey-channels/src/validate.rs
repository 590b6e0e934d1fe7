//! Startup validation of the bridge configuration.
//!
//! Everything here runs once, before the first connection attempt. A
//! failure is fatal: the binary prints it and exits.

use gooey_types::config::{GooeyConfig, TOKEN_ENV_VAR};
use gooey_types::error::{GooeyError, Result};

/// Longest accepted delay or timeout: one week.
pub const MAX_DELAY_SECS: u64 = 7 * 24 * 60 * 60;

/// Characters that would let a config value smuggle extra IRC commands.
const INJECTION_CHARS: &[char] = &['\n', '\r', '\0'];

/// Validate the bridge configuration.
///
/// Checks:
/// - `server` is non-empty and free of protocol-injection characters
/// - `nickname` is non-empty, has no spaces and no injection characters
/// - channel names start with `#` or `&` and contain no spaces, commas or
///   control characters
/// - retry delays and the webhook timeout are between one second and
///   [`MAX_DELAY_SECS`]
/// - the webhook token is present (fails with [`GooeyError::MissingToken`])
pub fn validate_config(config: &GooeyConfig) -> Result<()> {
    if config.webhook.token.is_empty() {
        return Err(GooeyError::MissingToken {
            var: TOKEN_ENV_VAR.into(),
        });
    }

    if config.server.trim().is_empty() {
        return Err(invalid("server is required"));
    }
    sanitize_irc_argument(&config.server).map_err(|e| invalid(format!("invalid server: {e}")))?;

    if config.nickname.is_empty() {
        return Err(invalid("nickname is required"));
    }
    sanitize_irc_argument(&config.nickname)
        .map_err(|e| invalid(format!("invalid nickname: {e}")))?;
    if config.nickname.contains(' ') {
        return Err(invalid(format!(
            "invalid nickname: {:?} contains a space",
            config.nickname
        )));
    }

    for ch in &config.channels {
        sanitize_channel_name(ch).map_err(|e| invalid(format!("invalid channel name: {e}")))?;
    }

    let retry = &config.retry;
    for (name, secs) in [
        ("reconnect_first_secs", retry.reconnect_first_secs),
        ("reconnect_backoff_secs", retry.reconnect_backoff_secs),
        ("rejoin_secs", retry.rejoin_secs),
        ("webhook.timeout_secs", config.webhook.timeout_secs),
    ] {
        if secs == 0 {
            return Err(invalid(format!("{name} must be greater than zero")));
        }
        if secs > MAX_DELAY_SECS {
            return Err(invalid(format!(
                "{name} must be at most {MAX_DELAY_SECS} seconds, got {secs}"
            )));
        }
    }

    Ok(())
}

fn invalid(reason: impl Into<String>) -> GooeyError {
    GooeyError::ConfigInvalid {
        reason: reason.into(),
    }
}

/// Check an IRC channel name.
///
/// The name must begin with `#` or `&`; the remainder must not contain
/// spaces, commas, BEL or other control characters.
pub fn sanitize_channel_name(name: &str) -> std::result::Result<&str, String> {
    let mut chars = name.chars();
    match chars.next() {
        None => return Err("empty channel name".into()),
        Some('#' | '&') => {}
        Some(_) => {
            return Err(format!(
                "channel name must start with '#' or '&', got {name:?}"
            ));
        }
    }

    if let Some(bad) = chars.find(|c| *c == ' ' || *c == ',' || c.is_control()) {
        return Err(format!(
            "channel name {name:?} contains forbidden character {bad:?}"
        ));
    }

    Ok(name)
}

/// Check a string argument for safe use in IRC commands.
///
/// Rejects empty values and values containing CR, LF or NUL, any of which
/// would end the command early and let the rest be read as a new one.
pub fn sanitize_irc_argument(arg: &str) -> std::result::Result<&str, String> {
    if arg.is_empty() {
        return Err("empty argument".into());
    }

    if let Some(bad) = arg.chars().find(|c| INJECTION_CHARS.contains(c)) {
        return Err(format!("argument contains forbidden character {bad:?}"));
    }

    Ok(arg)
}
