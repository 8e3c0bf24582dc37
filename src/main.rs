use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tts_bridge::{
    ServerConfig, check,
    config::{parse_parent_pid, parse_port},
    server::{self, announce},
};

/// Local text-to-speech bridge for Fish Audio
#[derive(Parser, Debug)]
#[command(name = "tts-bridge")]
#[command(version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Port to listen on (default 5678)
    port: Option<String>,

    /// Process id of the host application; the server exits when it does
    parent_pid: Option<String>,

    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Verify the runtime environment and print a JSON report
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    // Logs go to stderr; stdout is reserved for the readiness line
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Initialize crypto provider for TLS connections
    // This must be done before any TLS connections are attempted
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("A default TLS crypto provider was already installed");
    }

    let cli = Cli::parse();

    // Load configuration from file or environment
    let config = match cli.config.as_deref() {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            ServerConfig::from_file(path)
        }
        None => ServerConfig::from_env(),
    };

    if let Some(Commands::Check) = cli.command {
        let report = check::run(config.as_ref()).await;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(if report.success {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    info!("Starting Fish Audio TTS Server...");

    let mut config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {e}");
            announce::error(&e.to_string());
            return Ok(ExitCode::FAILURE);
        }
    };

    let port = match cli.port.as_deref().map(parse_port).transpose() {
        Ok(port) => port,
        Err(e) => {
            announce::error(&e.to_string());
            return Ok(ExitCode::FAILURE);
        }
    };

    let parent_pid = cli.parent_pid.as_deref().and_then(|raw| {
        let pid = parse_parent_pid(raw);
        if pid.is_none() {
            warn!("Invalid parent PID: {raw}");
        }
        pid
    });

    config.apply_cli_args(port, parent_pid);
    info!("Using port {}", config.port);
    if let Some(pid) = config.parent_pid {
        info!("Parent process ID: {pid}");
    }

    match server::run(config).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            error!("Server error: {e}");
            announce::error(&e.to_string());
            Ok(ExitCode::FAILURE)
        }
    }
}
