//! Fork and switch operations
//!
//! Forking replaces a message and everything after it: the new branch
//! becomes a sibling of the edited message, hanging off that message's
//! predecessor.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use chat_core::{Branch, MessageDraft};
use graph_store::{GraphStore, MessageChain, StoreError};

use crate::error::{Result, SessionError};

pub struct BranchManager {
    store: Arc<dyn GraphStore>,
}

impl BranchManager {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Fork an alternate continuation in place of `edited_message_id`.
    ///
    /// The fork point is the edited message's predecessor; its owning branch
    /// becomes the new branch's parent. The new branch receives one user
    /// message with `new_text` and becomes the session's primary branch.
    /// Returns the new branch id and first message id.
    pub async fn create_branch(
        &self,
        session_id: Uuid,
        edited_message_id: i64,
        new_text: String,
    ) -> Result<(Uuid, i64)> {
        let edited = self.store.get_message(edited_message_id).await?;
        if edited.session_id != session_id {
            // A message id from another session is as good as unknown.
            return Err(StoreError::MessageNotFound(edited_message_id).into());
        }

        let fork_point_id = edited.parent_message_id.ok_or_else(|| {
            SessionError::Validation(
                "the session's first message has no predecessor to fork from".to_string(),
            )
        })?;
        let fork_point = self.store.get_message(fork_point_id).await?;

        let branch = Branch::forked(session_id, fork_point.branch_id, fork_point_id);
        self.store.insert_branch(branch.clone()).await?;

        let mut chain = MessageChain::for_fork(
            self.store.clone(),
            session_id,
            branch.branch_id,
            fork_point_id,
        );
        let first = chain.add(MessageDraft::user(new_text)).await?;

        self.store
            .set_primary_branch(session_id, branch.branch_id, Utc::now())
            .await?;

        tracing::info!(
            session_id = %session_id,
            branch_id = %branch.branch_id,
            fork_point = fork_point_id,
            "Forked new branch"
        );

        Ok((branch.branch_id, first.message_id))
    }

    /// Point the session at another branch. No message mutation.
    pub async fn switch_primary_branch(
        &self,
        session_id: Uuid,
        target_branch_id: Uuid,
    ) -> Result<()> {
        let branch = self.store.get_branch(target_branch_id).await?;
        if branch.session_id != session_id {
            return Err(SessionError::BranchMismatch {
                branch_id: target_branch_id,
                session_id,
            });
        }
        self.store
            .set_primary_branch(session_id, target_branch_id, Utc::now())
            .await?;
        Ok(())
    }
}
