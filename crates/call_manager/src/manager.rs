//! Active call registry
//!
//! A shared map guarded by a single mutex. Every mutation is a short,
//! non-blocking critical section; no I/O happens while the lock is held.
//! The registry is an owned, injectable component so tests construct
//! isolated instances.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{CallError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    Running,
    Completed,
    Cancelled,
    Failed,
}

#[derive(Debug)]
struct CallEntry {
    status: CallStatus,
    cancel: CancellationToken,
    #[allow(dead_code)]
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    error: Option<String>,
}

/// Registry of active calls keyed by session id. At most one entry exists
/// per session; eviction via [`CallManager::remove_call`] is the only way a
/// new call can start afterward.
#[derive(Clone, Default)]
pub struct CallManager {
    calls: Arc<Mutex<HashMap<Uuid, CallEntry>>>,
}

impl CallManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a running call. Fails with a conflict if any entry exists
    /// for the session, terminal or not.
    pub fn start_call(&self, session_id: Uuid, cancel: CancellationToken) -> Result<()> {
        let mut calls = self.calls.lock().expect("call registry poisoned");
        if calls.contains_key(&session_id) {
            return Err(CallError::AlreadyActive(session_id));
        }
        calls.insert(
            session_id,
            CallEntry {
                status: CallStatus::Running,
                cancel,
                started_at: Utc::now(),
                ended_at: None,
                error: None,
            },
        );
        Ok(())
    }

    /// Fire the stored cancel function and mark the call cancelled. Fails if
    /// no running entry exists.
    pub fn cancel_call(&self, session_id: Uuid) -> Result<()> {
        let mut calls = self.calls.lock().expect("call registry poisoned");
        match calls.get_mut(&session_id) {
            Some(entry) if entry.status == CallStatus::Running => {
                entry.cancel.cancel();
                entry.status = CallStatus::Cancelled;
                entry.ended_at = Some(Utc::now());
                Ok(())
            }
            _ => Err(CallError::NotRunning(session_id)),
        }
    }

    /// Transition a running call to completed. A no-op on non-running or
    /// absent entries: completion races with cancellation are expected.
    pub fn complete_call(&self, session_id: Uuid) {
        self.finish(session_id, CallStatus::Completed, None);
    }

    /// Transition a running call to failed. Same idempotency as
    /// [`CallManager::complete_call`].
    pub fn fail_call(&self, session_id: Uuid, error: impl Into<String>) {
        self.finish(session_id, CallStatus::Failed, Some(error.into()));
    }

    fn finish(&self, session_id: Uuid, status: CallStatus, error: Option<String>) {
        let mut calls = self.calls.lock().expect("call registry poisoned");
        if let Some(entry) = calls.get_mut(&session_id) {
            if entry.status == CallStatus::Running {
                entry.status = status;
                entry.ended_at = Some(Utc::now());
                entry.error = error;
            }
        }
    }

    /// Evict the entry unconditionally. Callers evict after the terminal
    /// broadcast has gone out.
    pub fn remove_call(&self, session_id: Uuid) {
        let mut calls = self.calls.lock().expect("call registry poisoned");
        calls.remove(&session_id);
    }

    /// Non-blocking existence check: true while an entry exists in any
    /// state, until eviction.
    pub fn has_active_call(&self, session_id: Uuid) -> bool {
        let calls = self.calls.lock().expect("call registry poisoned");
        calls.contains_key(&session_id)
    }

    pub fn call_status(&self, session_id: Uuid) -> Option<CallStatus> {
        let calls = self.calls.lock().expect("call registry poisoned");
        calls.get(&session_id).map(|entry| entry.status)
    }

    pub fn call_error(&self, session_id: Uuid) -> Option<String> {
        let calls = self.calls.lock().expect("call registry poisoned");
        calls.get(&session_id).and_then(|entry| entry.error.clone())
    }

    pub fn ended_at(&self, session_id: Uuid) -> Option<DateTime<Utc>> {
        let calls = self.calls.lock().expect("call registry poisoned");
        calls.get(&session_id).and_then(|entry| entry.ended_at)
    }
}
