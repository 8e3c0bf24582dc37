//! Process liveness checks.
//!
//! On Unix a null signal is sent to the pid: success or `EPERM` means the
//! process exists, `ESRCH` means it does not. Elsewhere the process table is
//! queried through `sysinfo`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("process id {0} is not valid on this platform")]
    InvalidPid(u32),

    #[error("failed to query process {pid}: {message}")]
    Query { pid: u32, message: String },
}

/// Answers whether a process id refers to a live process.
pub trait ProcessProbe: Send + Sync {
    fn is_alive(&self, pid: u32) -> Result<bool, ProbeError>;
}

/// Probe backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

impl ProcessProbe for SystemProbe {
    fn is_alive(&self, pid: u32) -> Result<bool, ProbeError> {
        probe_process(pid)
    }
}

/// Convenience wrapper treating probe failures as "alive".
pub fn is_process_alive(pid: u32) -> bool {
    SystemProbe.is_alive(pid).unwrap_or(true)
}

#[cfg(unix)]
fn probe_process(pid: u32) -> Result<bool, ProbeError> {
    use nix::errno::Errno;
    use nix::sys::signal;
    use nix::unistd::Pid;

    let raw = i32::try_from(pid).map_err(|_| ProbeError::InvalidPid(pid))?;
    if raw <= 0 {
        return Err(ProbeError::InvalidPid(pid));
    }

    match signal::kill(Pid::from_raw(raw), None) {
        Ok(()) => Ok(true),
        Err(Errno::ESRCH) => Ok(false),
        // Exists but owned by another user.
        Err(Errno::EPERM) => Ok(true),
        Err(errno) => Err(ProbeError::Query {
            pid,
            message: errno.to_string(),
        }),
    }
}

#[cfg(not(unix))]
fn probe_process(pid: u32) -> Result<bool, ProbeError> {
    use sysinfo::{Pid, ProcessesToUpdate, System};

    if pid == 0 {
        return Err(ProbeError::InvalidPid(pid));
    }

    let target = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[target]), true);
    Ok(system.process(target).is_some())
}
