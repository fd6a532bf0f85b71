//! # procwarden Daemon
//!
//! Lifecycle management for a named collection of externally spawned OS
//! processes ("daemons").
//!
//! ## Components
//!
//! - [`store`]: durable record of every daemon definition and its last-known status
//! - [`supervisor`]: spawns, signals and reaps OS processes, one exit-watch per process
//! - [`manager`]: the state machine; serializes operations per key and keeps the
//!   store consistent with live process status
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use procwarden_daemon::{DaemonManager, ProcessSupervisor, SqliteDaemonStore};
//!
//! let store = Arc::new(SqliteDaemonStore::open("daemons.db").await?);
//! let supervisor = ProcessSupervisor::new(Default::default());
//! let manager = DaemonManager::open(store, supervisor, Default::default()).await?;
//!
//! let daemon = manager.create(Some("web".into()), "run-server".into(), None).await?;
//! manager.start(daemon.key()).await?;
//! ```

pub mod error;
pub mod manager;
pub mod store;
pub mod supervisor;
pub mod types;

// Re-exports
pub use error::DaemonError;
pub use manager::DaemonManager;
pub use store::{DaemonStore, MemoryDaemonStore, SqliteDaemonStore};
pub use supervisor::{ExitWatch, ProcessHandle, ProcessId, ProcessSupervisor, SpawnedProcess};
pub use types::{Daemon, DaemonDefinition, DaemonStatus, ExitCause, ExitInfo};
