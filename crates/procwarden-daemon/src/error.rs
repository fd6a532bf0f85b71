//! Daemon-related errors.

use thiserror::Error;

/// Errors that can occur during daemon operations.
#[derive(Debug, Clone, Error)]
pub enum DaemonError {
    /// No daemon is recorded under the key.
    #[error("Daemon not found: {0}")]
    NotFound(String),

    /// A daemon with the key already exists.
    #[error("Daemon key already exists: {0}")]
    KeyNotUnique(String),

    /// The daemon is running or paused, or may not be started again.
    #[error("Daemon already started: {0}")]
    AlreadyStarted(String),

    /// The daemon is not in a state that allows the operation.
    #[error("Daemon not started: {0}")]
    NotStarted(String),

    /// The definition was rejected before any mutation.
    #[error("Invalid daemon definition: {0}")]
    InvalidDefinition(String),

    /// Record store failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The executable could not be launched.
    #[error("Failed to spawn '{command}': {reason}")]
    Spawn { command: String, reason: String },

    /// The process could not be signalled.
    #[error("Failed to signal process {pid}: {reason}")]
    Signal { pid: u32, reason: String },
}

impl DaemonError {
    /// Whether the error is an infrastructure failure that callers should see as
    /// an opaque internal error.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            DaemonError::Storage(_) | DaemonError::Spawn { .. } | DaemonError::Signal { .. }
        )
    }
}

impl From<tokio_rusqlite::Error> for DaemonError {
    fn from(e: tokio_rusqlite::Error) -> Self {
        DaemonError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for DaemonError {
    fn from(e: serde_json::Error) -> Self {
        DaemonError::Storage(format!("Invalid record encoding: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let err = DaemonError::NotFound("web".to_string());
        assert!(err.to_string().contains("not found"));
        assert!(err.to_string().contains("web"));
        assert!(!err.is_internal());
    }

    #[test]
    fn test_state_conflicts_are_not_internal() {
        assert!(!DaemonError::AlreadyStarted("web".into()).is_internal());
        assert!(!DaemonError::NotStarted("web".into()).is_internal());
        assert!(!DaemonError::KeyNotUnique("web".into()).is_internal());
        assert!(!DaemonError::InvalidDefinition("empty command".into()).is_internal());
    }

    #[test]
    fn test_infrastructure_errors_are_internal() {
        assert!(DaemonError::Storage("disk full".into()).is_internal());
        assert!(
            DaemonError::Spawn {
                command: "/bin/missing".into(),
                reason: "No such file or directory".into(),
            }
            .is_internal()
        );
        assert!(
            DaemonError::Signal {
                pid: 42,
                reason: "ESRCH".into(),
            }
            .is_internal()
        );
    }

    #[test]
    fn test_spawn_error_display() {
        let err = DaemonError::Spawn {
            command: "/bin/missing".into(),
            reason: "No such file or directory".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/bin/missing"));
        assert!(msg.contains("No such file"));
    }

    #[test]
    fn test_serde_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: DaemonError = json_err.into();
        assert!(matches!(err, DaemonError::Storage(_)));
    }
}
