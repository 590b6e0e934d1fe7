//! Configuration file discovery and loading.
//!
//! The discovery order is:
//! 1. An explicit path (the `--config` flag).
//! 2. `GOOEY_CONFIG` environment variable.
//! 3. `~/.gooey/config.json`
//! 4. If none found, an empty JSON object, i.e. all defaults.
//!
//! JSON keys are normalized from camelCase to snake_case before the value
//! is deserialized into [`GooeyConfig`].

use std::path::{Path, PathBuf};

use serde_json::Value;

use gooey_types::config::GooeyConfig;
use gooey_types::error::{GooeyError, Result};

use crate::env::Environment;
use crate::fs::FileSystem;

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "GOOEY_CONFIG";

/// Discover the config file path.
///
/// An explicit path or `GOOEY_CONFIG` is returned as-is (the caller
/// reports it if missing). The home-directory fallback is only returned
/// when the file exists.
pub fn discover_config_path(
    explicit: Option<&Path>,
    env: &dyn Environment,
    home_dir: Option<PathBuf>,
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Some(env_path) = env.get_var(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(env_path));
    }

    let candidate = home_dir?.join(".gooey").join("config.json");
    candidate.exists().then_some(candidate)
}

/// Load raw JSON configuration using the discovery algorithm.
///
/// Returns the parsed and key-normalized JSON value, or an empty object
/// when no config file is found.
pub async fn load_config_raw(
    explicit: Option<&Path>,
    fs: &dyn FileSystem,
    env: &dyn Environment,
) -> Result<Value> {
    let Some(path) = discover_config_path(explicit, env, fs.home_dir()) else {
        tracing::info!("no config file found, using defaults");
        return Ok(Value::Object(serde_json::Map::new()));
    };

    if !fs.exists(&path).await {
        return Err(GooeyError::ConfigInvalid {
            reason: format!("config file {} does not exist", path.display()),
        });
    }

    tracing::debug!(path = %path.display(), "loading config file");
    let contents = fs.read_to_string(&path).await?;
    let value: Value = serde_json::from_str(&contents).map_err(|e| GooeyError::ConfigInvalid {
        reason: format!("failed to parse {}: {e}", path.display()),
    })?;

    Ok(normalize_keys(value))
}

/// Load and deserialize the bridge configuration.
pub async fn load_config(
    explicit: Option<&Path>,
    fs: &dyn FileSystem,
    env: &dyn Environment,
) -> Result<GooeyConfig> {
    let raw = load_config_raw(explicit, fs, env).await?;
    Ok(serde_json::from_value(raw)?)
}

/// Convert camelCase JSON keys to snake_case recursively.
pub fn normalize_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, val)| (camel_to_snake(&key), normalize_keys(val)))
                .collect(),
        ),
        Value::Array(arr) => Value::Array(arr.into_iter().map(normalize_keys).collect()),
        other => other,
    }
}

/// Convert a single camelCase string to snake_case.
///
/// A run of uppercase letters (an acronym) stays together; an underscore
/// goes before its last letter only when a lowercase letter follows.
///
/// # Examples
/// ```
/// # use gooey_platform::config_loader::camel_to_snake;
/// assert_eq!(camel_to_snake("showJoinsParts"), "show_joins_parts");
/// assert_eq!(camel_to_snake("useTLS"), "use_tls");
/// assert_eq!(camel_to_snake("already_snake"), "already_snake");
/// ```
pub fn camel_to_snake(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut result = String::with_capacity(name.len() + 4);

    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next = chars.get(i + 1).copied();
            if prev.is_lowercase() || (prev.is_uppercase() && next.is_some_and(char::is_lowercase))
            {
                result.push('_');
            }
        }
        result.push(ch.to_ascii_lowercase());
    }
    result
}
