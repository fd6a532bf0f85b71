//! Per-key locking.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::supervisor::ProcessHandle;

/// The live instance currently on record for a key.
pub(crate) struct LiveProcess {
    pub handle: ProcessHandle,
    /// Set when the process was terminated but recording `Killed` failed; the
    /// exit-watch then records `Killed` instead of `Exited`.
    pub kill_requested: bool,
    /// Set when the start could be neither recorded nor rolled back. The
    /// record keeps its earlier status; only `kill` acts on the process.
    pub unrecorded: bool,
}

impl LiveProcess {
    pub fn new(handle: ProcessHandle) -> Self {
        Self {
            handle,
            kill_requested: false,
            unrecorded: false,
        }
    }

    pub fn unrecorded(handle: ProcessHandle) -> Self {
        Self {
            unrecorded: true,
            ..Self::new(handle)
        }
    }
}

/// State guarded by a key's lock.
#[derive(Default)]
pub(crate) struct KeySlot {
    pub process: Option<LiveProcess>,
}

pub(crate) type SlotGuard = OwnedMutexGuard<KeySlot>;

/// Lock table, one async mutex per key. Entries are created on demand.
#[derive(Default)]
pub(crate) struct KeyLocks {
    slots: DashMap<String, Arc<Mutex<KeySlot>>>,
}

impl KeyLocks {
    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: &str) -> SlotGuard {
        let slot = Arc::clone(self.slots.entry(key.to_string()).or_default().value());
        slot.lock_owned().await
    }

    /// Release `guard` and drop the key's entry if nobody else holds or waits
    /// on it and no process is on record.
    pub fn release(&self, key: &str, guard: SlotGuard) {
        let idle = guard.process.is_none();
        drop(guard);
        if idle {
            self.slots
                .remove_if(key, |_, slot| Arc::strong_count(slot) == 1);
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_release_drops_idle_entry() {
        let locks = KeyLocks::default();
        let guard = locks.lock("missing").await;
        assert_eq!(locks.len(), 1);

        locks.release("missing", guard);
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn test_release_keeps_contended_entry() {
        let locks = Arc::new(KeyLocks::default());
        let guard = locks.lock("web").await;

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let guard = locks.lock("web").await;
                drop(guard);
            })
        };
        // Let the waiter queue up on the mutex.
        while Arc::strong_count(locks.slots.get("web").unwrap().value()) < 3 {
            tokio::task::yield_now().await;
        }

        locks.release("web", guard);
        assert_eq!(locks.len(), 1);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks = KeyLocks::default();
        let guard = locks.lock("web").await;

        let blocked = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            locks.lock("web"),
        )
        .await;
        assert!(blocked.is_err());

        // Other keys are independent.
        let other = locks.lock("db").await;
        drop(other);
        drop(guard);
    }
}
