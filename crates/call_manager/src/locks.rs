//! Per-session critical sections
//!
//! The "has active call" check, the user-message append and branch-pointer
//! updates must serialize per session. Sessions are independent units of
//! concurrency, so each gets its own async mutex; there is no cross-session
//! locking.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct SessionLocks {
    locks: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the session's lock, creating it on first use. The guard is
    /// owned so it can be held across awaits and task boundaries.
    pub async fn acquire(&self, session_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(session_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }
}
