//! Daemon records.

use std::fmt;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DaemonError;

/// Longest caller-supplied key accepted by [`DaemonDefinition::validate`].
pub const MAX_KEY_LEN: usize = 128;

/// Signal number recorded when a daemon is killed.
pub const SIGKILL: i32 = 9;

/// Immutable part of a daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonDefinition {
    pub key: String,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<PathBuf>,
}

impl DaemonDefinition {
    pub fn new(
        key: impl Into<String>,
        command: impl Into<String>,
        working_directory: Option<PathBuf>,
    ) -> Self {
        Self {
            key: key.into(),
            command: command.into(),
            working_directory,
        }
    }

    /// Reject definitions that could never be stored or spawned.
    pub fn validate(&self) -> Result<(), DaemonError> {
        if self.command.trim().is_empty() {
            return Err(DaemonError::InvalidDefinition(
                "command cannot be empty".to_string(),
            ));
        }

        if self.key.is_empty() {
            return Err(DaemonError::InvalidDefinition(
                "key cannot be empty".to_string(),
            ));
        }

        if self.key.len() > MAX_KEY_LEN {
            return Err(DaemonError::InvalidDefinition(format!(
                "key is longer than {} bytes",
                MAX_KEY_LEN
            )));
        }

        let valid = self
            .key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
        if !valid {
            return Err(DaemonError::InvalidDefinition(format!(
                "key '{}' may only contain ASCII letters, digits, '-', '_' and '.'",
                self.key
            )));
        }

        if let Some(dir) = &self.working_directory {
            if dir.as_os_str().is_empty() {
                return Err(DaemonError::InvalidDefinition(
                    "working directory cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Lifecycle status of a daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DaemonStatus {
    NotStarted,
    Running,
    Paused,
    Killed,
    Exited,
}

impl DaemonStatus {
    /// Running or Paused: a live process exists.
    pub fn is_live(self) -> bool {
        matches!(self, DaemonStatus::Running | DaemonStatus::Paused)
    }

    /// Killed or Exited.
    pub fn is_terminal(self) -> bool {
        matches!(self, DaemonStatus::Killed | DaemonStatus::Exited)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DaemonStatus::NotStarted => "not_started",
            DaemonStatus::Running => "running",
            DaemonStatus::Paused => "paused",
            DaemonStatus::Killed => "killed",
            DaemonStatus::Exited => "exited",
        }
    }
}

impl fmt::Display for DaemonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DaemonStatus {
    type Err = DaemonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(DaemonStatus::NotStarted),
            "running" => Ok(DaemonStatus::Running),
            "paused" => Ok(DaemonStatus::Paused),
            "killed" => Ok(DaemonStatus::Killed),
            "exited" => Ok(DaemonStatus::Exited),
            other => Err(DaemonError::Storage(format!("Unknown status '{}'", other))),
        }
    }
}

/// How a process terminated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cause", rename_all = "snake_case")]
pub enum ExitCause {
    /// Exited with a status code.
    Code { code: i32 },
    /// Terminated by a signal.
    Signal { signal: i32 },
    /// Exit observed without a status, or reconciled after a manager restart.
    Unknown,
}

/// Exit information recorded once a process terminates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitInfo {
    #[serde(flatten)]
    pub cause: ExitCause,
    pub at: DateTime<Utc>,
}

impl ExitInfo {
    pub fn new(cause: ExitCause) -> Self {
        Self {
            cause,
            at: Utc::now(),
        }
    }

    pub fn unknown() -> Self {
        Self::new(ExitCause::Unknown)
    }

    pub fn killed() -> Self {
        Self::new(ExitCause::Signal { signal: SIGKILL })
    }

    pub fn from_status(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Self::new(ExitCause::Code { code });
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Self::new(ExitCause::Signal { signal });
            }
        }

        Self::unknown()
    }
}

/// A daemon definition together with its last-known runtime state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Daemon {
    #[serde(flatten)]
    pub(crate) definition: DaemonDefinition,
    pub(crate) status: DaemonStatus,
    /// OS pid of the current instance, only while Running or Paused.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) pid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) exit: Option<ExitInfo>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl Daemon {
    /// A fresh NotStarted record.
    pub fn new(definition: DaemonDefinition) -> Self {
        let now = Utc::now();
        Self {
            definition,
            status: DaemonStatus::NotStarted,
            pid: None,
            exit: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> &str {
        &self.definition.key
    }

    pub fn definition(&self) -> &DaemonDefinition {
        &self.definition
    }

    pub fn status(&self) -> DaemonStatus {
        self.status
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn exit_info(&self) -> Option<&ExitInfo> {
        self.exit.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub(crate) fn mark_running(&mut self, pid: u32) {
        self.status = DaemonStatus::Running;
        self.pid = Some(pid);
        self.exit = None;
        self.touch();
    }

    pub(crate) fn mark_paused(&mut self) {
        self.status = DaemonStatus::Paused;
        self.touch();
    }

    pub(crate) fn mark_resumed(&mut self) {
        self.status = DaemonStatus::Running;
        self.touch();
    }

    /// Move to a terminal status.
    pub(crate) fn mark_finished(&mut self, status: DaemonStatus, exit: ExitInfo) {
        debug_assert!(status.is_terminal());
        self.status = status;
        self.pid = None;
        self.exit = Some(exit);
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
