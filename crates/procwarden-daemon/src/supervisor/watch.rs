//! Exit-watch: the single owner and reaper of a supervised child.

use tokio::process::Child;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::signal::{ControlRequest, DeliveryError, ProcessSignal};
use super::{ProcessId, ProcessTable};
use crate::types::ExitInfo;

/// Blocks until one process instance exits, delivering signals to it meanwhile.
///
/// Signals are only sent from here, before the child has been reaped, so a
/// recycled pid is never signalled.
pub struct ExitWatch {
    id: ProcessId,
    pid: u32,
    child: Child,
    control: mpsc::Receiver<ControlRequest>,
    table: ProcessTable,
}

impl ExitWatch {
    pub(crate) fn new(
        id: ProcessId,
        pid: u32,
        child: Child,
        control: mpsc::Receiver<ControlRequest>,
        table: ProcessTable,
    ) -> Self {
        Self {
            id,
            pid,
            child,
            control,
            table,
        }
    }

    /// Identity of the watched process instance.
    pub fn process_id(&self) -> ProcessId {
        self.id
    }

    /// Wait for the process to exit naturally or be terminated.
    ///
    /// Must be driven exactly once, on its own task, right after spawn.
    pub async fn await_exit(mut self) -> ExitInfo {
        let status = loop {
            let request = tokio::select! {
                status = self.child.wait() => break status,
                Some(request) = self.control.recv() => request,
            };
            self.apply(request);
        };

        // Retire the handle before reporting, so later signals see it as gone.
        self.table.lock().remove(&self.id);
        self.control.close();
        while let Ok(request) = self.control.try_recv() {
            let _ = request.reply.send(Err(DeliveryError::Gone));
        }

        match status {
            Ok(status) => {
                let info = ExitInfo::from_status(status);
                debug!("Process {} (pid {}) exited: {:?}", self.id, self.pid, info.cause);
                info
            }
            Err(e) => {
                warn!("Failed to wait on process {} (pid {}): {}", self.id, self.pid, e);
                ExitInfo::unknown()
            }
        }
    }

    fn apply(&mut self, request: ControlRequest) {
        let result = self.signal(request.signal);
        if let Err(e) = &result {
            debug!("{} to process {} (pid {}) failed: {}", request.signal, self.id, self.pid, e);
        }
        let _ = request.reply.send(result);
    }

    #[cfg(unix)]
    fn signal(&mut self, signal: ProcessSignal) -> Result<(), DeliveryError> {
        super::signal::deliver(self.pid, signal)
    }

    #[cfg(not(unix))]
    fn signal(&mut self, signal: ProcessSignal) -> Result<(), DeliveryError> {
        match signal {
            ProcessSignal::Kill => self
                .child
                .start_kill()
                .map_err(|e| DeliveryError::Os(e.to_string())),
            _ => super::signal::deliver(self.pid, signal),
        }
    }
}
