//! Periodic parent-process liveness check.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::process_probe::ProcessProbe;
use super::{ServerLifecycle, ShutdownReason};

/// Default interval between parent liveness checks.
pub const DEFAULT_PARENT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Watches the host process and shuts the server down once it is gone.
///
/// Probe errors are logged and the watch keeps going; only a definite
/// "not alive" answer triggers a shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentWatch {
    parent_pid: u32,
    poll_interval: Duration,
}

impl ParentWatch {
    pub fn new(parent_pid: u32, poll_interval: Duration) -> Self {
        Self {
            parent_pid,
            poll_interval,
        }
    }

    #[inline]
    pub fn parent_pid(&self) -> u32 {
        self.parent_pid
    }

    #[inline]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn spawn(
        self,
        probe: Arc<dyn ProcessProbe>,
        lifecycle: Arc<ServerLifecycle>,
    ) -> JoinHandle<()> {
        tokio::spawn(self.run(probe, lifecycle))
    }

    /// Polls until the parent exits or the server begins shutting down for
    /// another reason.
    pub async fn run(self, probe: Arc<dyn ProcessProbe>, lifecycle: Arc<ServerLifecycle>) {
        let pid = self.parent_pid;
        info!(pid, interval_secs = self.poll_interval.as_secs(), "Monitoring parent process");

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = lifecycle.cancelled() => {
                    debug!(pid, "Parent watch stopped");
                    return;
                }
                _ = ticker.tick() => {}
            }

            match probe.is_alive(pid) {
                Ok(true) => {}
                Ok(false) => {
                    info!(pid, "Parent process has exited, shutting down server");
                    lifecycle.begin_shutdown(ShutdownReason::ParentExited { pid });
                    return;
                }
                Err(e) => warn!(pid, error = %e, "Error monitoring parent process"),
            }
        }
    }
}
