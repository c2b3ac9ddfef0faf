use std::{env, time::Duration};

use log::*;

/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Reads a boolean flag from the environment variable `name`.
pub fn env_flag(name: &str, default: bool) -> bool {
    parse_boolean_flag(env::var(name).ok(), default)
}

/// Reads a duration, in whole seconds, from the environment variable `name`. Unset or invalid values fall back to
/// `default`, and invalid values are logged.
pub fn env_duration_secs(name: &str, default: Duration) -> Duration {
    match env::var(name) {
        Ok(s) => s.trim().parse::<u64>().map(Duration::from_secs).unwrap_or_else(|e| {
            warn!("🪛️ Invalid value for {name} ({s}). {e}. Using the default of {}s instead.", default.as_secs());
            default
        }),
        Err(_) => default,
    }
}

/// Reads an optional, non-empty string from the environment.
pub fn env_string(name: &str) -> Option<String> {
    env::var(name).ok().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
