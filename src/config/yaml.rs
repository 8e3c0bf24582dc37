use serde::Deserialize;
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use super::{ConfigError, ServerConfig};

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present in
/// the file override environment variables.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "127.0.0.1"
///   port: 5678
///   parent_pid: 4242
///
/// lifecycle:
///   parent_poll_seconds: 5
///   shutdown_grace_seconds: 50
///
/// provider:
///   base_url: "https://api.fish.audio"
///   synthesis_timeout_seconds: 45
///   connect_timeout_seconds: 10
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub lifecycle: Option<LifecycleYaml>,
    pub provider: Option<ProviderYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub parent_pid: Option<u32>,
}

/// Lifecycle configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LifecycleYaml {
    pub parent_poll_seconds: Option<u64>,
    pub shutdown_grace_seconds: Option<u64>,
}

/// Fish Audio configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProviderYaml {
    pub base_url: Option<String>,
    pub synthesis_timeout_seconds: Option<u64>,
    pub connect_timeout_seconds: Option<u64>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The YAML is malformed
    /// - Fields have invalid types
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: YamlConfig = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Overlay the values present in this file onto `config`.
    pub fn apply(self, mut config: ServerConfig) -> Result<ServerConfig, ConfigError> {
        if let Some(server) = self.server {
            if let Some(host) = server.host {
                config.host = host
                    .parse::<IpAddr>()
                    .map_err(|e| ConfigError::InvalidValue {
                        key: "server.host",
                        value: host.clone(),
                        reason: e.to_string(),
                    })?;
            }
            if let Some(port) = server.port {
                config.port = port;
            }
            if let Some(pid) = server.parent_pid {
                config.parent_pid = Some(pid);
            }
        }

        if let Some(lifecycle) = self.lifecycle {
            if let Some(secs) = lifecycle.parent_poll_seconds {
                config.parent_poll_interval = Duration::from_secs(secs);
            }
            if let Some(secs) = lifecycle.shutdown_grace_seconds {
                config.shutdown_grace = Duration::from_secs(secs);
            }
        }

        if let Some(provider) = self.provider {
            if let Some(url) = provider.base_url {
                config.provider.base_url = url;
            }
            if let Some(secs) = provider.synthesis_timeout_seconds {
                config.synthesis_timeout = Duration::from_secs(secs);
            }
            if let Some(secs) = provider.connect_timeout_seconds {
                config.provider.connect_timeout = Duration::from_secs(secs);
            }
        }

        Ok(config)
    }
}
