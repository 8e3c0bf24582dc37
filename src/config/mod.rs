//! Configuration module for the TTS bridge
//!
//! Settings come from several sources. Priority: command line > YAML >
//! ENV vars > .env values > defaults. The `.env` file is loaded into the
//! process environment by `main` before anything here runs.
//!
//! # Modules
//! - `env`: Environment variable loading
//! - `yaml`: YAML configuration file loading
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use tts_bridge::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variables underneath
//! let config_path = PathBuf::from("bridge.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

mod env;
mod validation;
mod yaml;

pub use yaml::YamlConfig;

use crate::core::lifecycle::DEFAULT_PARENT_POLL_INTERVAL;
use crate::core::tts::FishAudioConfig;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 5678;

/// Default per-request synthesis deadline.
pub const DEFAULT_SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(45);

/// Default time allowed for in-flight requests to finish after shutdown
/// begins. Longer than the synthesis deadline so a running request can
/// always complete.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(50);

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid port number: {0}")]
    InvalidPort(String),

    #[error("Host must be a loopback address, got {0}")]
    NonLoopbackHost(IpAddr),

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("Invalid provider base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

/// Server configuration
///
/// Contains everything needed to run the bridge:
/// - Listener settings (loopback host, port)
/// - Parent process watch settings
/// - Synthesis deadline and shutdown drain window
/// - Fish Audio endpoint settings
///
/// The Fish Audio API key is not part of the configuration; it arrives with
/// each request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    // Server settings
    pub host: IpAddr,
    pub port: u16,

    // Lifecycle settings
    pub parent_pid: Option<u32>,
    pub parent_poll_interval: Duration,
    pub shutdown_grace: Duration,

    // Synthesis settings
    pub synthesis_timeout: Duration,
    pub provider: FishAudioConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            parent_pid: None,
            parent_poll_interval: DEFAULT_PARENT_POLL_INTERVAL,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            synthesis_timeout: DEFAULT_SYNTHESIS_TIMEOUT,
            provider: FishAudioConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables over the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = env::apply_env(Self::default())?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    ///
    /// Environment variables are applied first and the YAML values override
    /// them, so a key present in the file always wins.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let yaml_config = YamlConfig::from_file(path)?;
        let config = env::apply_env(Self::default())?;
        let config = yaml_config.apply(config)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Apply the positional command-line arguments, which override every
    /// other source.
    pub fn apply_cli_args(&mut self, port: Option<u16>, parent_pid: Option<u32>) {
        if let Some(port) = port {
            self.port = port;
        }
        if let Some(pid) = parent_pid {
            self.parent_pid = Some(pid);
        }
    }

    /// Get the server address as a string
    pub fn address(&self) -> String {
        self.socket_addr().to_string()
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Parse the positional port argument.
pub fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    raw.trim()
        .parse::<u16>()
        .map_err(|_| ConfigError::InvalidPort(raw.to_string()))
}

/// Parse the positional parent process id. Zero and garbage yield `None`.
pub fn parse_parent_pid(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|pid| *pid > 0)
}
