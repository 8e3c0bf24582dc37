//! Loopback HTTP server: bind, announce, accept, drain.
//!
//! Each accepted connection is served on its own task, so a slow synthesis
//! never delays other clients. Shutdown (command, parent exit or signal)
//! closes the listener first, then gives in-flight requests up to the
//! configured grace period to finish.

pub mod announce;
mod signal;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::body::Incoming;
use hyper::{Request, service::service_fn};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tower::Service;
use tracing::{debug, info, warn};

pub use signal::shutdown_signal;

use crate::config::ServerConfig;
use crate::core::lifecycle::{
    ParentWatch, ProcessProbe, ServerLifecycle, ShutdownReason, SystemProbe,
};
use crate::core::tts::{FishAudioTts, SpeechProvider};
use crate::errors::{AppError, AppResult};
use crate::routes;
use crate::state::AppState;

/// Pause after a failed `accept` so a persistent error (such as running out
/// of file descriptors) does not spin.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// A server whose listener is bound but which is not serving yet.
pub struct BoundServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    state: Arc<AppState>,
    probe: Arc<dyn ProcessProbe>,
}

impl BoundServer {
    /// Binds the configured address.
    ///
    /// # Errors
    ///
    /// [`AppError::Bind`] if the address is unavailable.
    pub async fn bind(config: ServerConfig, provider: Arc<dyn SpeechProvider>) -> AppResult<Self> {
        let addr = config.socket_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| AppError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;

        let lifecycle = Arc::new(ServerLifecycle::new());
        let state = AppState::new(config, provider, lifecycle);

        Ok(Self {
            listener,
            local_addr,
            state,
            probe: Arc::new(SystemProbe),
        })
    }

    /// Replaces the process probe used by the parent watch.
    pub fn with_process_probe(mut self, probe: Arc<dyn ProcessProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Address actually bound (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn lifecycle(&self) -> Arc<ServerLifecycle> {
        Arc::clone(&self.state.lifecycle)
    }

    /// Serves until a shutdown is requested, then drains and returns.
    pub async fn serve(self) -> AppResult<()> {
        let Self {
            listener,
            local_addr,
            state,
            probe,
        } = self;
        let lifecycle = Arc::clone(&state.lifecycle);

        if lifecycle.mark_ready() {
            announce::ready(local_addr.port());
            info!(%local_addr, "Fish Audio TTS server listening");

            if let Some(pid) = state.config.parent_pid {
                ParentWatch::new(pid, state.config.parent_poll_interval)
                    .spawn(probe, Arc::clone(&lifecycle));
            }
        }

        let app = routes::create_app(Arc::clone(&state));
        let builder = Builder::new(TokioExecutor::new());
        let graceful = GracefulShutdown::new();

        loop {
            tokio::select! {
                biased;
                _ = lifecycle.cancelled() => break,
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            warn!(error = %e, "Failed to accept connection");
                            tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                            continue;
                        }
                    };

                    let tower_service = app.clone();
                    let hyper_service = service_fn(move |request: Request<Incoming>| {
                        tower_service.clone().call(request)
                    });

                    let connection = builder
                        .serve_connection_with_upgrades(TokioIo::new(stream), hyper_service)
                        .into_owned();
                    let connection = graceful.watch(connection);

                    tokio::spawn(async move {
                        if let Err(e) = connection.await {
                            warn!(%peer, error = %e, "Client connection closed with error");
                        }
                    });
                }
            }
        }

        drop(listener);
        let grace = state.config.shutdown_grace;
        debug!(grace_secs = grace.as_secs(), "Listener closed, draining in-flight requests");

        if tokio::time::timeout(grace, graceful.shutdown()).await.is_err() {
            warn!(
                grace_secs = grace.as_secs(),
                "Shutdown grace period elapsed with requests still in flight"
            );
        }

        lifecycle.mark_stopped();
        announce::stopped();
        info!("Fish Audio TTS server stopped");
        Ok(())
    }
}

/// Runs the bridge with the Fish Audio provider until shutdown.
///
/// SIGINT and SIGTERM start the same drain as the shutdown command.
pub async fn run(config: ServerConfig) -> AppResult<()> {
    let provider = FishAudioTts::new(&config.provider)?;
    let server = BoundServer::bind(config, Arc::new(provider)).await?;

    let lifecycle = server.lifecycle();
    tokio::spawn(async move {
        tokio::select! {
            name = shutdown_signal() => {
                lifecycle.begin_shutdown(ShutdownReason::Signal(name));
            }
            _ = lifecycle.cancelled() => {}
        }
    });

    server.serve().await
}
