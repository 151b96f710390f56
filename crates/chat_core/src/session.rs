//! Session and Branch rows of the conversation graph

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One conversation. Created on the first user message together with its
/// root branch; never deleted during normal operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: Uuid,

    /// Workspace this conversation belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,

    /// Display title, auto-generated after the first completed exchange
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// System prompt sent ahead of every model call
    pub system_prompt: String,

    /// Selected model name
    pub model: String,

    /// The branch currently shown as "the" conversation
    pub primary_branch_id: Uuid,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a session row together with its root branch id. The two rows
    /// are inserted in one transaction by the graph store.
    pub fn new(model: impl Into<String>, system_prompt: impl Into<String>) -> (Self, Branch) {
        let now = Utc::now();
        let session_id = Uuid::new_v4();
        let root = Branch::root(session_id);
        let session = Self {
            session_id,
            workspace: None,
            title: None,
            system_prompt: system_prompt.into(),
            model: model.into(),
            primary_branch_id: root.branch_id,
            created_at: now,
            updated_at: now,
        };
        (session, root)
    }

    pub fn with_workspace(mut self, workspace: impl Into<String>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }
}

/// A named continuation of a session. Parentage and fork point are
/// write-once: once created a branch never moves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub branch_id: Uuid,
    pub session_id: Uuid,

    /// None only for the session's root branch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_branch_id: Option<Uuid>,

    /// The message in an ancestor branch after which this branch diverges.
    /// None only for the root branch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_from_message_id: Option<i64>,

    pub created_at: DateTime<Utc>,
}

impl Branch {
    /// The root branch of a new session
    pub fn root(session_id: Uuid) -> Self {
        Self {
            branch_id: Uuid::new_v4(),
            session_id,
            parent_branch_id: None,
            branch_from_message_id: None,
            created_at: Utc::now(),
        }
    }

    /// A branch forked off `parent_branch_id` after `fork_point`
    pub fn forked(session_id: Uuid, parent_branch_id: Uuid, fork_point: i64) -> Self {
        Self {
            branch_id: Uuid::new_v4(),
            session_id,
            parent_branch_id: Some(parent_branch_id),
            branch_from_message_id: Some(fork_point),
            created_at: Utc::now(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_branch_id.is_none()
    }
}
