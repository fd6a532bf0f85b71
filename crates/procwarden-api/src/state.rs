//! Application state.

use std::time::{Duration, Instant};

use procwarden_daemon::DaemonManager;

/// State shared across handlers.
pub struct AppState {
    pub manager: DaemonManager,
    start_time: Instant,
}

impl AppState {
    pub fn new(manager: DaemonManager) -> Self {
        Self {
            manager,
            start_time: Instant::now(),
        }
    }

    /// Get uptime.
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }
}
