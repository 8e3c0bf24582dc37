//! Runtime preflight for the `tts-bridge check` CLI command.
//!
//! The host application runs this before launching the server to find out
//! whether the bridge can work on this machine. A JSON report is printed to
//! stdout and the exit status is 0 only if every check passed.
//!
//! ```text
//! $ tts-bridge check
//! {
//!   "success": true,
//!   "version": "1.0.0",
//!   "passed": ["tls_crypto_provider", "configuration", "provider_client", "loopback_bind"],
//!   "failed": []
//! }
//! ```

use std::net::{Ipv4Addr, SocketAddr};

use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{debug, warn};

use crate::config::{ConfigError, ServerConfig};
use crate::core::tts::FishAudioTts;

#[derive(Debug, Clone, Serialize)]
pub struct PreflightReport {
    pub success: bool,
    pub version: &'static str,
    pub passed: Vec<&'static str>,
    pub failed: Vec<FailedCheck>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedCheck {
    pub check: &'static str,
    pub error: String,
}

impl PreflightReport {
    fn new() -> Self {
        Self {
            success: true,
            version: env!("CARGO_PKG_VERSION"),
            passed: Vec::new(),
            failed: Vec::new(),
        }
    }

    fn record(&mut self, check: &'static str, outcome: Result<(), String>) {
        match outcome {
            Ok(()) => {
                debug!(check, "Preflight check passed");
                self.passed.push(check);
            }
            Err(error) => {
                warn!(check, %error, "Preflight check failed");
                self.success = false;
                self.failed.push(FailedCheck { check, error });
            }
        }
    }
}

/// Run every preflight check against an already-loaded configuration.
///
/// Later checks that need a valid configuration are skipped (and reported
/// as failed) when the configuration itself did not load.
pub async fn run(config: Result<&ServerConfig, &ConfigError>) -> PreflightReport {
    let mut report = PreflightReport::new();

    report.record("tls_crypto_provider", check_crypto_provider());

    match config {
        Ok(config) => {
            report.record("configuration", Ok(()));
            report.record(
                "provider_client",
                FishAudioTts::new(&config.provider)
                    .map(drop)
                    .map_err(|e| e.to_string()),
            );
        }
        Err(e) => {
            report.record("configuration", Err(e.to_string()));
            report.record(
                "provider_client",
                Err("skipped: configuration did not load".to_string()),
            );
        }
    }

    report.record("loopback_bind", check_loopback_bind().await);
    report
}

fn check_crypto_provider() -> Result<(), String> {
    match rustls::crypto::CryptoProvider::get_default() {
        Some(_) => Ok(()),
        None => Err("no default TLS crypto provider is installed".to_string()),
    }
}

async fn check_loopback_bind() -> Result<(), String> {
    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, 0));
    TcpListener::bind(addr)
        .await
        .map(drop)
        .map_err(|e| format!("cannot bind a loopback socket: {e}"))
}
