use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::fmt;
use tracing::debug;

/// Logical control signals the supervisor emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// Suspend execution (SIGSTOP, not catchable).
    Pause,
    /// Continue execution (SIGCONT).
    Resume,
}

impl SignalKind {
    pub fn signal(&self) -> Signal {
        match self {
            SignalKind::Pause => Signal::SIGSTOP,
            SignalKind::Resume => Signal::SIGCONT,
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.signal().as_str())
    }
}

/// Fire-and-forget signal delivery to individual processes.
pub trait ProcessSignaler {
    fn send(&self, pid: Pid, kind: SignalKind);
}

/// Signal delivery via kill(2).
///
/// Sending to a PID that has already exited is a silent no-op; the race
/// between enumeration and delivery is expected.
pub struct KillSignaler;

impl KillSignaler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for KillSignaler {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSignaler for KillSignaler {
    fn send(&self, pid: Pid, kind: SignalKind) {
        match kill(pid, kind.signal()) {
            Ok(()) => debug!("Sent {} to {}", kind, pid),
            Err(Errno::ESRCH) => debug!("Process {} already gone, skipped {}", pid, kind),
            Err(e) => debug!("Failed to send {} to {}: {}", kind, pid, e),
        }
    }
}
