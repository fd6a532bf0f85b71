//! Exit events flowing from exit-watches back into the manager.

use std::sync::Weak;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::ManagerInner;
use crate::error::DaemonError;
use crate::supervisor::{ExitWatch, ProcessId};
use crate::types::{DaemonStatus, ExitInfo};

/// "Process instance `process` of daemon `key` has exited."
#[derive(Debug, Clone)]
pub(crate) struct ExitEvent {
    pub key: String,
    pub process: ProcessId,
    pub exit: ExitInfo,
}

/// Drive `watch` on its own task and report the exit as an event.
pub(crate) fn spawn_watch(key: String, watch: ExitWatch, events: mpsc::UnboundedSender<ExitEvent>) {
    tokio::spawn(async move {
        let process = watch.process_id();
        let exit = watch.await_exit().await;
        if events.send(ExitEvent { key, process, exit }).is_err() {
            debug!("Manager gone, dropping exit event for process {}", process);
        }
    });
}

/// Receive exit events until the manager is dropped. Each event is applied on
/// its own task so a retrying key never delays others.
pub(crate) async fn run_exit_loop(
    inner: Weak<ManagerInner>,
    mut events: mpsc::UnboundedReceiver<ExitEvent>,
) {
    while let Some(event) = events.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        tokio::spawn(async move { inner.record_exit(event).await });
    }
    debug!("Exit event loop stopped");
}

impl ManagerInner {
    /// Apply an exit event, retrying store failures with capped exponential
    /// backoff until it is recorded or found stale.
    pub(crate) async fn record_exit(&self, event: ExitEvent) {
        let mut delay = self.config.exit_retry_initial();
        let max_delay = self.config.exit_retry_max();
        let mut attempt: u32 = 1;

        loop {
            match self.try_record_exit(&event).await {
                Ok(()) => return,
                Err(e) => {
                    warn!(
                        key = %event.key,
                        process = %event.process,
                        attempt,
                        "Failed to record exit, retrying in {:?}: {}",
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(max_delay);
                    attempt = attempt.saturating_add(1);
                }
            }
        }
    }

    async fn try_record_exit(&self, event: &ExitEvent) -> Result<(), DaemonError> {
        let mut slot = self.locks.lock(&event.key).await;

        let current = slot
            .process
            .as_ref()
            .filter(|live| live.handle.id() == event.process)
            .map(|live| (live.kill_requested, live.unrecorded));
        let Some((kill_requested, unrecorded)) = current else {
            debug!(
                key = %event.key,
                process = %event.process,
                "Ignoring exit of a process that is no longer on record"
            );
            self.locks.release(&event.key, slot);
            return Ok(());
        };

        if unrecorded {
            // The record never saw this instance start.
            debug!(key = %event.key, process = %event.process, "Unrecorded process exited");
            slot.process = None;
            self.locks.release(&event.key, slot);
            return Ok(());
        }

        let mut daemon = match self.store.get(&event.key).await {
            Ok(daemon) => daemon,
            Err(DaemonError::NotFound(_)) => {
                warn!(key = %event.key, "Exited daemon has no record");
                slot.process = None;
                self.locks.release(&event.key, slot);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        if kill_requested {
            daemon.mark_finished(DaemonStatus::Killed, ExitInfo::killed());
        } else {
            daemon.mark_finished(DaemonStatus::Exited, event.exit.clone());
        }
        self.store.put(&daemon).await?;

        slot.process = None;
        self.locks.release(&event.key, slot);

        info!(
            key = %event.key,
            process = %event.process,
            status = %daemon.status(),
            "Recorded process exit: {:?}",
            event.exit.cause
        );
        Ok(())
    }
}
