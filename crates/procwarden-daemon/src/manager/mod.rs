//! Daemon manager.
//!
//! The authoritative state machine. Every mutating operation holds the key's
//! lock from the status read until the resulting record has been stored, so
//! two operations on one key never act on the same stale status.
//!
//! ```text
//! NotStarted --start--> Running --stop--> Paused --continue--> Running
//! Running | Paused --kill--> Killed
//! Running | Paused --(process exits)--> Exited
//! Killed | Exited --start--> Running      (restartable policy only)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use procwarden_config::{ManagerConfig, RestartPolicy};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::DaemonError;
use crate::store::DaemonStore;
use crate::supervisor::ProcessSupervisor;
use crate::types::{Daemon, DaemonDefinition, DaemonStatus, ExitInfo};

mod exit;
mod slot;

use exit::ExitEvent;
use slot::{KeyLocks, LiveProcess, SlotGuard};

pub(crate) struct ManagerInner {
    store: Arc<dyn DaemonStore>,
    supervisor: ProcessSupervisor,
    config: ManagerConfig,
    locks: KeyLocks,
    exits: mpsc::UnboundedSender<ExitEvent>,
}

/// Lifecycle manager for a collection of daemons. Cheap to clone.
#[derive(Clone)]
pub struct DaemonManager {
    inner: Arc<ManagerInner>,
}

impl DaemonManager {
    /// Open a manager over `store`, reconciling records left Running or
    /// Paused by a previous manager before serving any operation.
    ///
    /// Must be called within a Tokio runtime.
    pub async fn open(
        store: Arc<dyn DaemonStore>,
        supervisor: ProcessSupervisor,
        config: ManagerConfig,
    ) -> Result<Self, DaemonError> {
        reconcile(store.as_ref()).await?;

        let (exits, events) = mpsc::unbounded_channel();
        let inner = Arc::new(ManagerInner {
            store,
            supervisor,
            config,
            locks: KeyLocks::default(),
            exits,
        });
        tokio::spawn(exit::run_exit_loop(Arc::downgrade(&inner), events));

        Ok(Self { inner })
    }

    /// Register a new daemon as NotStarted. An absent or blank key is
    /// replaced by a generated one.
    pub async fn create(
        &self,
        key: Option<String>,
        command: String,
        working_directory: Option<PathBuf>,
    ) -> Result<Daemon, DaemonError> {
        let key = key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let definition = DaemonDefinition::new(key, command, working_directory);
        definition.validate()?;

        let key = definition.key.clone();
        let slot = self.inner.locks.lock(&key).await;

        let result = self.insert(definition).await;
        self.inner.locks.release(&key, slot);
        result
    }

    async fn insert(&self, definition: DaemonDefinition) -> Result<Daemon, DaemonError> {
        if self.inner.store.exists(&definition.key).await? {
            return Err(DaemonError::KeyNotUnique(definition.key));
        }

        let daemon = Daemon::new(definition);
        self.inner.store.put(&daemon).await?;
        info!(key = %daemon.key(), "Created daemon: {}", daemon.definition().command);
        Ok(daemon)
    }

    /// Look up one daemon.
    pub async fn get(&self, key: &str) -> Result<Daemon, DaemonError> {
        self.inner.store.get(key).await
    }

    /// All daemons in creation order.
    pub async fn list(&self) -> Result<Vec<Daemon>, DaemonError> {
        self.inner.store.list().await
    }

    /// Spawn the daemon's process and record it as Running.
    pub async fn start(&self, key: &str) -> Result<Daemon, DaemonError> {
        let (mut slot, mut daemon) = self.load(key).await?;

        let status = daemon.status();
        let refused = status.is_live()
            || slot.process.is_some()
            || (status.is_terminal() && self.inner.config.restart_policy == RestartPolicy::Once);
        if refused {
            self.inner.locks.release(key, slot);
            return Err(DaemonError::AlreadyStarted(key.to_string()));
        }

        let definition = daemon.definition().clone();
        let spawned = match self
            .inner
            .supervisor
            .spawn(&definition.command, definition.working_directory.as_deref())
        {
            Ok(spawned) => spawned,
            Err(e) => {
                error!(key = %key, "Failed to start daemon: {}", e);
                self.inner.locks.release(key, slot);
                return Err(e);
            }
        };
        let handle = spawned.handle;
        exit::spawn_watch(key.to_string(), spawned.watch, self.inner.exits.clone());

        daemon.mark_running(handle.pid());
        if let Err(e) = self.inner.store.put(&daemon).await {
            // The record never names this instance. If it cannot be terminated it
            // stays in the slot so that `kill` can still reach it.
            if let Err(kill_err) = self.inner.supervisor.terminate(&handle).await {
                error!(key = %key, pid = handle.pid(), "Failed to roll back start: {}", kill_err);
                slot.process = Some(LiveProcess::unrecorded(handle));
            }
            self.inner.locks.release(key, slot);
            return Err(e);
        }

        info!(key = %key, pid = handle.pid(), "Daemon started");
        slot.process = Some(LiveProcess::new(handle));
        self.inner.locks.release(key, slot);
        Ok(daemon)
    }

    /// Suspend a Running daemon.
    pub async fn stop(&self, key: &str) -> Result<Daemon, DaemonError> {
        self.suspend_or_resume(key, DaemonStatus::Running).await
    }

    /// Resume a Paused daemon.
    pub async fn continue_daemon(&self, key: &str) -> Result<Daemon, DaemonError> {
        self.suspend_or_resume(key, DaemonStatus::Paused).await
    }

    async fn suspend_or_resume(
        &self,
        key: &str,
        required: DaemonStatus,
    ) -> Result<Daemon, DaemonError> {
        let (slot, mut daemon) = self.load(key).await?;

        let handle = slot
            .process
            .as_ref()
            .filter(|live| daemon.status() == required && !live.kill_requested)
            .map(|live| live.handle.clone());
        let Some(handle) = handle else {
            self.inner.locks.release(key, slot);
            return Err(DaemonError::NotStarted(key.to_string()));
        };

        let supervisor = &self.inner.supervisor;
        let pausing = required == DaemonStatus::Running;
        let applied = if pausing {
            supervisor.pause(&handle).await
        } else {
            supervisor.resume(&handle).await
        };
        if let Err(e) = applied {
            error!(key = %key, pid = handle.pid(), "Failed to signal daemon: {}", e);
            self.inner.locks.release(key, slot);
            return Err(e);
        }

        if pausing {
            daemon.mark_paused();
        } else {
            daemon.mark_resumed();
        }

        if let Err(e) = self.inner.store.put(&daemon).await {
            let reverted = if pausing {
                supervisor.resume(&handle).await
            } else {
                supervisor.pause(&handle).await
            };
            if let Err(revert_err) = reverted {
                error!(key = %key, pid = handle.pid(), "Failed to revert signal: {}", revert_err);
            }
            self.inner.locks.release(key, slot);
            return Err(e);
        }

        info!(key = %key, pid = handle.pid(), "Daemon {}", daemon.status());
        self.inner.locks.release(key, slot);
        Ok(daemon)
    }

    /// Terminate a Running or Paused daemon, or a process whose start could
    /// not be recorded, and record it as Killed.
    pub async fn kill(&self, key: &str) -> Result<Daemon, DaemonError> {
        let (mut slot, mut daemon) = self.load(key).await?;

        let handle = slot
            .process
            .as_ref()
            .filter(|live| live.unrecorded || daemon.status().is_live())
            .map(|live| live.handle.clone());
        let Some(handle) = handle else {
            self.inner.locks.release(key, slot);
            return Err(DaemonError::NotStarted(key.to_string()));
        };

        if let Err(e) = self.inner.supervisor.terminate(&handle).await {
            error!(key = %key, pid = handle.pid(), "Failed to kill daemon: {}", e);
            self.inner.locks.release(key, slot);
            return Err(e);
        }

        daemon.mark_finished(DaemonStatus::Killed, ExitInfo::killed());
        if let Err(e) = self.inner.store.put(&daemon).await {
            // The process is gone either way; its exit-watch records Killed.
            warn!(key = %key, pid = handle.pid(), "Killed daemon but could not record it: {}", e);
            if let Some(live) = slot.process.as_mut() {
                live.kill_requested = true;
            }
            self.inner.locks.release(key, slot);
            return Err(e);
        }

        info!(key = %key, pid = handle.pid(), "Daemon killed");
        slot.process = None;
        self.inner.locks.release(key, slot);
        Ok(daemon)
    }

    /// Stop managing. Live daemons are killed when `terminate_on_shutdown` is
    /// set, otherwise left running for the next manager to reconcile.
    pub async fn shutdown(&self) -> Result<(), DaemonError> {
        if !self.inner.config.terminate_on_shutdown {
            info!("Leaving daemons running on shutdown");
            return Ok(());
        }

        let mut killed = 0usize;
        // `kill` also reaches processes whose start was never recorded.
        for daemon in self.list().await? {
            match self.kill(daemon.key()).await {
                Ok(_) => killed += 1,
                Err(DaemonError::NotStarted(_)) => {}
                Err(e) => error!(key = %daemon.key(), "Failed to kill daemon on shutdown: {}", e),
            }
        }

        info!("Manager shut down, killed {} daemon(s)", killed);
        Ok(())
    }

    /// Number of spawned processes whose exit has not been observed yet.
    pub fn live_processes(&self) -> usize {
        self.inner.supervisor.live_count()
    }

    /// Lock `key` and read its record. An unknown key releases the lock and
    /// fails with `NotFound`.
    async fn load(&self, key: &str) -> Result<(SlotGuard, Daemon), DaemonError> {
        let slot = self.inner.locks.lock(key).await;
        match self.inner.store.get(key).await {
            Ok(daemon) => Ok((slot, daemon)),
            Err(e) => {
                self.inner.locks.release(key, slot);
                Err(e)
            }
        }
    }
}

/// Rewrite records left Running or Paused as Exited with an unknown cause.
/// Their processes belong to a previous manager and cannot be controlled.
async fn reconcile(store: &dyn DaemonStore) -> Result<usize, DaemonError> {
    let mut reconciled = 0;
    for mut daemon in store.list().await? {
        if !daemon.status().is_live() {
            continue;
        }
        warn!(
            key = %daemon.key(),
            pid = ?daemon.pid(),
            "Daemon was {} when the previous manager stopped, marking exited",
            daemon.status()
        );
        daemon.mark_finished(DaemonStatus::Exited, ExitInfo::unknown());
        store.put(&daemon).await?;
        reconciled += 1;
    }
    Ok(reconciled)
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
