//! Server lifecycle state shared by the accept loop, request handlers and
//! the parent-process watch.
//!
//! ```text
//! Starting -> Ready -> ShuttingDown -> Stopped
//!     \______________/
//! ```
//!
//! `begin_shutdown` may be called concurrently from any number of tasks;
//! exactly one caller wins the transition and all others are no-ops.

mod parent_watch;
mod process_probe;

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::info;

pub use parent_watch::{DEFAULT_PARENT_POLL_INTERVAL, ParentWatch};
pub use process_probe::{ProbeError, ProcessProbe, SystemProbe, is_process_alive};

// =============================================================================
// Lifecycle State
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LifecycleState {
    Starting = 0,
    Ready = 1,
    ShuttingDown = 2,
    Stopped = 3,
}

impl LifecycleState {
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::ShuttingDown => "shutting_down",
            Self::Stopped => "stopped",
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Starting,
            1 => Self::Ready,
            2 => Self::ShuttingDown,
            _ => Self::Stopped,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What triggered a shutdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The host sent `{"command": "shutdown"}`.
    Command,
    /// The watched parent process is gone.
    ParentExited { pid: u32 },
    /// An OS signal, by name.
    Signal(&'static str),
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command => f.write_str("shutdown command received"),
            Self::ParentExited { pid } => write!(f, "parent process {pid} exited"),
            Self::Signal(name) => write!(f, "{name} received"),
        }
    }
}

// =============================================================================
// Server Lifecycle
// =============================================================================

#[derive(Debug)]
pub struct ServerLifecycle {
    state: AtomicU8,
    shutdown: CancellationToken,
    reason: OnceLock<ShutdownReason>,
}

impl Default for ServerLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerLifecycle {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(LifecycleState::Starting as u8),
            shutdown: CancellationToken::new(),
            reason: OnceLock::new(),
        }
    }

    #[inline]
    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Moves `Starting -> Ready`. Returns `false` if a shutdown already began.
    pub fn mark_ready(&self) -> bool {
        self.state
            .compare_exchange(
                LifecycleState::Starting as u8,
                LifecycleState::Ready as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Starts shutting down. Returns `true` only for the caller that made the
    /// transition; the shutdown token is cancelled exactly once.
    pub fn begin_shutdown(&self, reason: ShutdownReason) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            match LifecycleState::from_u8(current) {
                LifecycleState::ShuttingDown | LifecycleState::Stopped => return false,
                LifecycleState::Starting | LifecycleState::Ready => {}
            }
            match self.state.compare_exchange(
                current,
                LifecycleState::ShuttingDown as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        info!(reason = %reason, "Server shutting down");
        let _ = self.reason.set(reason);
        self.shutdown.cancel();
        true
    }

    /// Requests a shutdown from a separate task so the caller (typically the
    /// handler answering the shutdown command) is never blocked by it.
    pub fn schedule_shutdown(self: &Arc<Self>, reason: ShutdownReason) -> JoinHandle<bool> {
        let lifecycle = Arc::clone(self);
        tokio::spawn(async move { lifecycle.begin_shutdown(reason) })
    }

    /// Final transition once the accept loop has drained.
    pub fn mark_stopped(&self) {
        self.state
            .store(LifecycleState::Stopped as u8, Ordering::Release);
        self.shutdown.cancel();
    }

    #[inline]
    pub fn is_shutting_down(&self) -> bool {
        matches!(
            self.state(),
            LifecycleState::ShuttingDown | LifecycleState::Stopped
        )
    }

    pub fn shutdown_reason(&self) -> Option<&ShutdownReason> {
        self.reason.get()
    }

    /// Resolves once a shutdown has begun.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.shutdown.cancelled()
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}
