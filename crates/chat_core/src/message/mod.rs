//! Message nodes of the conversation graph
//!
//! A message is one node of content: a user turn, a model turn, an ephemeral
//! thought, a function call/response, or a compression checkpoint.

mod kind;

pub use kind::MessageKind;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted message. `message_id` is assigned by storage and is the
/// authoritative chronological order within a branch; coarser timestamps are
/// not trusted for ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub session_id: Uuid,

    /// Owning branch, fixed at creation
    pub branch_id: Uuid,

    /// The preceding node in this branch's local chain. For a branch's first
    /// message this equals the branch's `branch_from_message_id`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_message_id: Option<i64>,

    /// Forward pointer to whichever message was appended immediately after
    /// this one. A navigational hint only - forking rewrites it, so history
    /// reconstruction never reads it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chosen_next_id: Option<i64>,

    pub kind: MessageKind,
    pub content: String,

    /// Structured function call/response payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,

    /// Provider-opaque continuity token, round-tripped verbatim on the next
    /// call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thought_signature: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// A message to be appended through the message chain. Storage assigns the
/// id, parent linkage and timestamp.
#[derive(Debug, Clone)]
pub struct MessageDraft {
    pub kind: MessageKind,
    pub content: String,
    pub payload: Option<serde_json::Value>,
    pub thought_signature: Option<String>,
}

impl MessageDraft {
    pub fn new(kind: MessageKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            payload: None,
            thought_signature: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageKind::User, content)
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self::new(MessageKind::Model, content)
    }

    pub fn thought(content: impl Into<String>) -> Self {
        Self::new(MessageKind::Thought, content)
    }

    pub fn function_call(payload: serde_json::Value) -> Self {
        Self {
            kind: MessageKind::FunctionCall,
            content: String::new(),
            payload: Some(payload),
            thought_signature: None,
        }
    }

    pub fn function_response(payload: serde_json::Value) -> Self {
        Self {
            kind: MessageKind::FunctionResponse,
            content: String::new(),
            payload: Some(payload),
            thought_signature: None,
        }
    }

    /// A compression checkpoint. The header line carries the first message id
    /// still replayed into model context; the body is the summary shown in
    /// its place.
    pub fn compression(target_id: i64, summary: impl AsRef<str>) -> Self {
        Self::new(
            MessageKind::Compression,
            format!("{}\n{}", target_id, summary.as_ref()),
        )
    }

    pub fn with_thought_signature(mut self, signature: impl Into<String>) -> Self {
        self.thought_signature = Some(signature.into());
        self
    }
}

impl Message {
    /// Split a compression checkpoint's content into its target id and
    /// summary body. Returns None for other kinds or a malformed header.
    pub fn compression_parts(&self) -> Option<(i64, &str)> {
        if self.kind != MessageKind::Compression {
            return None;
        }
        let (header, body) = self.content.split_once('\n')?;
        let target_id = header.trim().parse::<i64>().ok()?;
        Some((target_id, body))
    }
}
