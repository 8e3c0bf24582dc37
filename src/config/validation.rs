use url::Url;

use super::{ConfigError, ServerConfig};

/// Validate a fully merged configuration.
///
/// # Errors
/// - The host is not a loopback address
/// - Any interval or timeout is zero
/// - The provider base URL does not parse or is not http(s)
pub(super) fn validate(config: &ServerConfig) -> Result<(), ConfigError> {
    if !config.host.is_loopback() {
        return Err(ConfigError::NonLoopbackHost(config.host));
    }

    let durations = [
        ("parent_poll_interval", config.parent_poll_interval),
        ("shutdown_grace", config.shutdown_grace),
        ("synthesis_timeout", config.synthesis_timeout),
        ("provider.connect_timeout", config.provider.connect_timeout),
    ];
    for (name, value) in durations {
        if value.is_zero() {
            return Err(ConfigError::ZeroDuration(name));
        }
    }

    validate_base_url(&config.provider.base_url)
}

fn validate_base_url(raw: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidBaseUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme {other:?}"),
        }),
    }
}
