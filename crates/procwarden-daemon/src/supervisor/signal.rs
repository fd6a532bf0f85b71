//! Signal delivery to supervised process groups.

use std::fmt;

use tokio::sync::oneshot;

/// Lifecycle signal for a supervised process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessSignal {
    /// Suspend execution (SIGSTOP).
    Suspend,
    /// Continue a suspended process (SIGCONT).
    Resume,
    /// Non-catchable termination (SIGKILL).
    Kill,
}

impl fmt::Display for ProcessSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessSignal::Suspend => write!(f, "SIGSTOP"),
            ProcessSignal::Resume => write!(f, "SIGCONT"),
            ProcessSignal::Kill => write!(f, "SIGKILL"),
        }
    }
}

/// Why a signal could not be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DeliveryError {
    /// The process group no longer exists.
    Gone,
    /// The platform cannot deliver this signal.
    Unsupported,
    Os(String),
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryError::Gone => write!(f, "process is no longer running"),
            DeliveryError::Unsupported => write!(f, "signal not supported on this platform"),
            DeliveryError::Os(reason) => write!(f, "{}", reason),
        }
    }
}

/// A signal request handed to the exit-watch that owns the child.
pub(crate) struct ControlRequest {
    pub signal: ProcessSignal,
    pub reply: oneshot::Sender<Result<(), DeliveryError>>,
}

/// Send a signal to the process group led by `pid`.
#[cfg(unix)]
pub(crate) fn deliver(pid: u32, signal: ProcessSignal) -> Result<(), DeliveryError> {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let nix_signal = match signal {
        ProcessSignal::Suspend => Signal::SIGSTOP,
        ProcessSignal::Resume => Signal::SIGCONT,
        ProcessSignal::Kill => Signal::SIGKILL,
    };

    let pgid = i32::try_from(pid).map_err(|e| DeliveryError::Os(e.to_string()))?;
    match killpg(Pid::from_raw(pgid), nix_signal) {
        Ok(()) => Ok(()),
        Err(Errno::ESRCH) => Err(DeliveryError::Gone),
        Err(e) => Err(DeliveryError::Os(e.to_string())),
    }
}

#[cfg(not(unix))]
pub(crate) fn deliver(_pid: u32, _signal: ProcessSignal) -> Result<(), DeliveryError> {
    Err(DeliveryError::Unsupported)
}
