use async_trait::async_trait;
use tokio::sync::RwLock;

use super::DaemonStore;
use crate::error::DaemonError;
use crate::types::Daemon;

/// In-memory daemon store for tests and ephemeral managers. Not durable.
pub struct MemoryDaemonStore {
    daemons: RwLock<Vec<Daemon>>,
}

impl MemoryDaemonStore {
    /// Create a new memory store.
    pub fn new() -> Self {
        Self {
            daemons: RwLock::new(Vec::new()),
        }
    }
}

impl Default for MemoryDaemonStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DaemonStore for MemoryDaemonStore {
    async fn put(&self, daemon: &Daemon) -> Result<(), DaemonError> {
        let mut daemons = self.daemons.write().await;
        match daemons.iter_mut().find(|d| d.key() == daemon.key()) {
            Some(existing) => *existing = daemon.clone(),
            None => daemons.push(daemon.clone()),
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Daemon, DaemonError> {
        let daemons = self.daemons.read().await;
        daemons
            .iter()
            .find(|d| d.key() == key)
            .cloned()
            .ok_or_else(|| DaemonError::NotFound(key.to_string()))
    }

    async fn list(&self) -> Result<Vec<Daemon>, DaemonError> {
        Ok(self.daemons.read().await.clone())
    }

    async fn exists(&self, key: &str) -> Result<bool, DaemonError> {
        Ok(self.daemons.read().await.iter().any(|d| d.key() == key))
    }
}
