//! Per-branch append cursor
//!
//! The only path by which new messages enter a branch. The cursor remembers
//! the id of the branch's last message so every append gets correct
//! `parent_message_id` linkage; it only advances after the storage
//! transaction commits, so a failed append can be retried safely.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use chat_core::{Message, MessageDraft};

use crate::error::Result;
use crate::store::GraphStore;

pub struct MessageChain {
    store: Arc<dyn GraphStore>,
    session_id: Uuid,
    branch_id: Uuid,
    last_message_id: Option<i64>,
}

impl MessageChain {
    /// Cursor for a brand-new root branch; the first append has no
    /// predecessor.
    pub fn for_root(store: Arc<dyn GraphStore>, session_id: Uuid, branch_id: Uuid) -> Self {
        Self {
            store,
            session_id,
            branch_id,
            last_message_id: None,
        }
    }

    /// Cursor for a freshly forked branch, pre-seeded with the fork-point
    /// message id so the branch's first message links to it.
    pub fn for_fork(
        store: Arc<dyn GraphStore>,
        session_id: Uuid,
        branch_id: Uuid,
        fork_point: i64,
    ) -> Self {
        Self {
            store,
            session_id,
            branch_id,
            last_message_id: Some(fork_point),
        }
    }

    /// Cursor for an existing branch, seeded with its current last message.
    /// A forked branch with no own messages yet falls back to its fork
    /// point.
    pub async fn resume(
        store: Arc<dyn GraphStore>,
        session_id: Uuid,
        branch_id: Uuid,
    ) -> Result<Self> {
        let last_message_id = match store.last_message_id_in_branch(branch_id).await? {
            Some(id) => Some(id),
            None => store.get_branch(branch_id).await?.branch_from_message_id,
        };
        Ok(Self {
            store,
            session_id,
            branch_id,
            last_message_id,
        })
    }

    pub fn branch_id(&self) -> Uuid {
        self.branch_id
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Append one message to the branch. The draft is linked to the cursor's
    /// last message, persisted, and the cursor advances to the new id. On a
    /// storage error the cursor keeps its old position.
    pub async fn add(&mut self, draft: MessageDraft) -> Result<Message> {
        let message = self
            .store
            .append_message(
                self.session_id,
                self.branch_id,
                self.last_message_id,
                draft,
                Utc::now(),
            )
            .await?;
        self.last_message_id = Some(message.message_id);
        Ok(message)
    }
}
