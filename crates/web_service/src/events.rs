//! Events fanned out to session observers
//!
//! One event per persisted message plus terminal call transitions; each
//! carries enough to render an incremental UI update without re-querying
//! storage.

use serde::Serialize;
use uuid::Uuid;

use chat_core::Message;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    MessageAppended {
        session_id: Uuid,
        branch_id: Uuid,
        message: Message,
    },
    CallCompleted {
        session_id: Uuid,
        timestamp: String,
    },
    CallCancelled {
        session_id: Uuid,
        timestamp: String,
    },
    CallFailed {
        session_id: Uuid,
        error: String,
        timestamp: String,
    },
    TitleUpdated {
        session_id: Uuid,
        title: String,
    },
    Heartbeat {
        timestamp: String,
    },
}

impl ChatEvent {
    pub fn message_appended(message: &Message) -> Self {
        Self::MessageAppended {
            session_id: message.session_id,
            branch_id: message.branch_id,
            message: message.clone(),
        }
    }

    pub fn call_completed(session_id: Uuid) -> Self {
        Self::CallCompleted {
            session_id,
            timestamp: now(),
        }
    }

    pub fn call_cancelled(session_id: Uuid) -> Self {
        Self::CallCancelled {
            session_id,
            timestamp: now(),
        }
    }

    pub fn call_failed(session_id: Uuid, error: impl Into<String>) -> Self {
        Self::CallFailed {
            session_id,
            error: error.into(),
            timestamp: now(),
        }
    }

    pub fn heartbeat() -> Self {
        Self::Heartbeat { timestamp: now() }
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}
