//! Process supervisor.
//!
//! Spawns daemon processes, signals them and reaps them. Every spawned child
//! is owned by its [`ExitWatch`]; the supervisor only holds a control channel
//! to it, keyed by the instance's [`ProcessId`].

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use procwarden_config::SupervisorConfig;
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::error::DaemonError;

mod signal;
mod watch;

pub use signal::ProcessSignal;
pub use watch::ExitWatch;

use signal::{ControlRequest, DeliveryError};

/// Pending signal requests per process.
const CONTROL_CAPACITY: usize = 8;

/// Supervisor-assigned identity of one process instance. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId(u64);

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque handle to a live process instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessHandle {
    id: ProcessId,
    pid: u32,
}

impl ProcessHandle {
    pub fn id(&self) -> ProcessId {
        self.id
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }
}

/// A freshly spawned process: the handle for signalling and the watch that
/// must be driven to observe its exit.
pub struct SpawnedProcess {
    pub handle: ProcessHandle,
    pub watch: ExitWatch,
}

pub(crate) struct ProcessEntry {
    pid: u32,
    control: mpsc::Sender<ControlRequest>,
}

pub(crate) type ProcessTable = Arc<Mutex<HashMap<ProcessId, ProcessEntry>>>;

/// Owns every live process on behalf of the manager.
pub struct ProcessSupervisor {
    config: SupervisorConfig,
    table: ProcessTable,
    next_id: AtomicU64,
}

impl ProcessSupervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        Self {
            config,
            table: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Launch `command`, optionally inside `working_directory`.
    ///
    /// The returned watch must be driven exactly once, or the child is never
    /// reaped.
    pub fn spawn(
        &self,
        command: &str,
        working_directory: Option<&Path>,
    ) -> Result<SpawnedProcess, DaemonError> {
        let spawn_error = |reason: String| DaemonError::Spawn {
            command: command.to_string(),
            reason,
        };

        let mut cmd = if self.config.use_shell {
            let mut cmd = Command::new(&self.config.shell);
            cmd.arg("-c").arg(command);
            cmd
        } else {
            let mut parts = command.split_whitespace();
            let program = parts
                .next()
                .ok_or_else(|| spawn_error("empty command".to_string()))?;
            let mut cmd = Command::new(program);
            cmd.args(parts);
            cmd
        };

        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false);

        #[cfg(unix)]
        cmd.process_group(0);

        if let Some(dir) = working_directory {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn().map_err(|e| spawn_error(e.to_string()))?;
        let pid = child
            .id()
            .ok_or_else(|| spawn_error("process exited before its pid was known".to_string()))?;

        let id = ProcessId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (control, requests) = mpsc::channel(CONTROL_CAPACITY);
        self.table.lock().insert(id, ProcessEntry { pid, control });

        info!("Spawned process {} (pid {}): {}", id, pid, command);

        Ok(SpawnedProcess {
            handle: ProcessHandle { id, pid },
            watch: ExitWatch::new(id, pid, child, requests, Arc::clone(&self.table)),
        })
    }

    /// Suspend the process without terminating it.
    pub async fn pause(&self, handle: &ProcessHandle) -> Result<(), DaemonError> {
        self.control(handle, ProcessSignal::Suspend)
            .await
            .map_err(|e| signal_error(handle, e))
    }

    /// Continue a suspended process.
    pub async fn resume(&self, handle: &ProcessHandle) -> Result<(), DaemonError> {
        self.control(handle, ProcessSignal::Resume)
            .await
            .map_err(|e| signal_error(handle, e))
    }

    /// Forcibly end the process. Terminating a process that has already
    /// exited succeeds.
    pub async fn terminate(&self, handle: &ProcessHandle) -> Result<(), DaemonError> {
        match self.control(handle, ProcessSignal::Kill).await {
            Ok(()) | Err(DeliveryError::Gone) => Ok(()),
            Err(e) => Err(signal_error(handle, e)),
        }
    }

    /// Whether the instance's exit has not been observed yet.
    pub fn is_live(&self, handle: &ProcessHandle) -> bool {
        self.table.lock().contains_key(&handle.id)
    }

    /// Number of process instances not yet reaped.
    pub fn live_count(&self) -> usize {
        self.table.lock().len()
    }

    async fn control(
        &self,
        handle: &ProcessHandle,
        signal: ProcessSignal,
    ) -> Result<(), DeliveryError> {
        let sender = {
            let table = self.table.lock();
            match table.get(&handle.id) {
                Some(entry) if entry.pid == handle.pid => entry.control.clone(),
                _ => return Err(DeliveryError::Gone),
            }
        };

        let (reply, response) = oneshot::channel();
        sender
            .send(ControlRequest { signal, reply })
            .await
            .map_err(|_| DeliveryError::Gone)?;

        let result = response.await.unwrap_or(Err(DeliveryError::Gone));
        if result.is_ok() {
            debug!("Delivered {} to process {} (pid {})", signal, handle.id, handle.pid);
        }
        result
    }
}

fn signal_error(handle: &ProcessHandle, err: DeliveryError) -> DaemonError {
    DaemonError::Signal {
        pid: handle.pid,
        reason: err.to_string(),
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
