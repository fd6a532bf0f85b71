//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub manager: ManagerConfig,

    #[serde(default)]
    pub supervisor: SupervisorConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Daemon record store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path of the SQLite database holding daemon records.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// Base directory for procwarden state (`~/.procwarden`).
pub fn procwarden_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".procwarden"))
        .unwrap_or_else(|| PathBuf::from(".procwarden"))
}

fn default_store_path() -> PathBuf {
    procwarden_dir().join("daemons.db")
}

/// Whether a daemon that has been killed or has exited may be started again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartPolicy {
    /// Start is accepted from NotStarted, Killed and Exited.
    #[default]
    Restartable,
    /// Start is accepted only from NotStarted.
    Once,
}

/// Daemon manager configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    #[serde(default)]
    pub restart_policy: RestartPolicy,

    /// Kill every live daemon when the manager shuts down gracefully.
    #[serde(default = "default_terminate_on_shutdown")]
    pub terminate_on_shutdown: bool,

    /// First backoff delay when recording an exit fails (milliseconds).
    #[serde(default = "default_exit_retry_initial_ms")]
    pub exit_retry_initial_ms: u64,

    /// Upper bound for the exit recording backoff (milliseconds).
    #[serde(default = "default_exit_retry_max_ms")]
    pub exit_retry_max_ms: u64,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            restart_policy: RestartPolicy::default(),
            terminate_on_shutdown: default_terminate_on_shutdown(),
            exit_retry_initial_ms: default_exit_retry_initial_ms(),
            exit_retry_max_ms: default_exit_retry_max_ms(),
        }
    }
}

impl ManagerConfig {
    /// Get the initial exit retry delay as a Duration.
    pub fn exit_retry_initial(&self) -> Duration {
        Duration::from_millis(self.exit_retry_initial_ms)
    }

    /// Get the maximum exit retry delay as a Duration.
    pub fn exit_retry_max(&self) -> Duration {
        Duration::from_millis(self.exit_retry_max_ms)
    }
}

fn default_terminate_on_shutdown() -> bool {
    true
}

fn default_exit_retry_initial_ms() -> u64 {
    100
}

fn default_exit_retry_max_ms() -> u64 {
    5000
}

/// Process supervisor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Run commands through `shell -c` instead of splitting them on whitespace.
    #[serde(default)]
    pub use_shell: bool,

    #[serde(default = "default_shell")]
    pub shell: String,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            use_shell: false,
            shell: default_shell(),
        }
    }
}

fn default_shell() -> String {
    "/bin/sh".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily-rotated log files. Console only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
