//! Daemon record store.
//!
//! The store is the single source of durable truth. Every `put` must be
//! durable before it returns, so a crash right after a successful operation
//! never loses the recorded status.

use async_trait::async_trait;

use crate::error::DaemonError;
use crate::types::Daemon;

mod memory;
mod schema;
mod sqlite;

pub use memory::MemoryDaemonStore;
pub use sqlite::SqliteDaemonStore;

/// Persistence for daemon records, keyed by daemon key.
#[async_trait]
pub trait DaemonStore: Send + Sync {
    /// Insert or overwrite a record.
    async fn put(&self, daemon: &Daemon) -> Result<(), DaemonError>;

    /// Load a record, failing with `NotFound` for an unknown key.
    async fn get(&self, key: &str) -> Result<Daemon, DaemonError>;

    /// All records in insertion order.
    async fn list(&self) -> Result<Vec<Daemon>, DaemonError>;

    /// Whether a record exists for the key.
    async fn exists(&self, key: &str) -> Result<bool, DaemonError>;
}
