use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use super::{ConfigError, ServerConfig};

/// Overlay environment variables onto `config`.
///
/// Unset and blank variables leave the existing value untouched.
pub(super) fn apply_env(mut config: ServerConfig) -> Result<ServerConfig, ConfigError> {
    if let Some(host) = read("TTS_BRIDGE_HOST") {
        config.host = parse_value("TTS_BRIDGE_HOST", &host)?;
    }
    if let Some(port) = read("TTS_BRIDGE_PORT") {
        config.port = parse_value("TTS_BRIDGE_PORT", &port)?;
    }
    if let Some(pid) = read("TTS_BRIDGE_PARENT_PID") {
        config.parent_pid = Some(parse_value("TTS_BRIDGE_PARENT_PID", &pid)?);
    }
    if let Some(secs) = read("TTS_BRIDGE_PARENT_POLL_SECONDS") {
        config.parent_poll_interval = parse_seconds("TTS_BRIDGE_PARENT_POLL_SECONDS", &secs)?;
    }
    if let Some(secs) = read("TTS_BRIDGE_SHUTDOWN_GRACE_SECONDS") {
        config.shutdown_grace = parse_seconds("TTS_BRIDGE_SHUTDOWN_GRACE_SECONDS", &secs)?;
    }
    if let Some(secs) = read("TTS_BRIDGE_SYNTHESIS_TIMEOUT_SECONDS") {
        config.synthesis_timeout = parse_seconds("TTS_BRIDGE_SYNTHESIS_TIMEOUT_SECONDS", &secs)?;
    }
    if let Some(url) = read("FISH_AUDIO_BASE_URL") {
        config.provider.base_url = url;
    }
    if let Some(secs) = read("FISH_AUDIO_CONNECT_TIMEOUT_SECONDS") {
        config.provider.connect_timeout =
            parse_seconds("FISH_AUDIO_CONNECT_TIMEOUT_SECONDS", &secs)?;
    }
    Ok(config)
}

fn read(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_value<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse::<T>().map_err(|e| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn parse_seconds(key: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    parse_value::<u64>(key, raw).map(Duration::from_secs)
}
