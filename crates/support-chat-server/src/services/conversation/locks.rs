use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

struct Slot {
    mutex: Arc<Mutex<()>>,
    /// Holder plus waiters currently registered on this token
    users: usize,
}

/// Per-session turn serialization, keyed by session token.
///
/// Turns on different sessions never contend. An entry lives exactly as
/// long as some request holds or waits for it, including waiters that are
/// cancelled before they get the lock.
#[derive(Clone, Default)]
pub struct SessionLocks {
    locks: Arc<DashMap<String, Slot>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other turn holds `token`, then hold it until the guard drops
    pub async fn acquire(&self, token: &str) -> SessionGuard {
        let mutex = {
            let mut slot = self.locks.entry(token.to_string()).or_insert_with(|| Slot {
                mutex: Arc::new(Mutex::new(())),
                users: 0,
            });
            slot.users += 1;
            Arc::clone(&slot.mutex)
        };

        // Registered before waiting so a dropped waiter still deregisters
        let mut guard = SessionGuard {
            held: None,
            token: token.to_string(),
            locks: Arc::clone(&self.locks),
        };
        guard.held = Some(mutex.lock_owned().await);
        debug!("Acquired turn lock for session {}", token);

        guard
    }

    /// Number of sessions with a turn in flight or waiting
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

pub struct SessionGuard {
    held: Option<OwnedMutexGuard<()>>,
    token: String,
    locks: Arc<DashMap<String, Slot>>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.held.take();
        self.locks.remove_if_mut(&self.token, |_, slot| {
            slot.users -= 1;
            slot.users == 0
        });
    }
}
