//! Session service facade
//!
//! The surface the server layer talks to: session creation/lookup, message
//! appends, forking, switching, and both history read paths, all over one
//! injected graph store.

use std::sync::Arc;

use uuid::Uuid;

use chat_core::{Message, MessageDraft, Session, Turn};
use graph_store::{GraphStore, MessageChain};

use crate::branch::BranchManager;
use crate::error::{Result, SessionError};
use crate::history::HistoryReconstructor;

pub struct SessionService {
    store: Arc<dyn GraphStore>,
    branches: BranchManager,
    history: HistoryReconstructor,
}

impl SessionService {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            branches: BranchManager::new(store.clone()),
            history: HistoryReconstructor::new(store.clone()),
            store,
        }
    }

    pub fn store(&self) -> Arc<dyn GraphStore> {
        self.store.clone()
    }

    /// Create a session and its root branch together.
    pub async fn create_session(
        &self,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
        workspace: Option<String>,
    ) -> Result<Session> {
        let (mut session, root) = Session::new(model, system_prompt);
        if let Some(workspace) = workspace {
            session = session.with_workspace(workspace);
        }
        self.store.create_session(session.clone(), root).await?;
        tracing::info!(session_id = %session.session_id, "Created session");
        Ok(session)
    }

    pub async fn get_session(&self, session_id: Uuid) -> Result<Session> {
        Ok(self.store.get_session(session_id).await?)
    }

    pub async fn list_sessions(&self) -> Result<Vec<Session>> {
        Ok(self.store.list_sessions().await?)
    }

    /// Resolve the branch a request targets: an explicit branch must belong
    /// to the session, otherwise the primary branch is used.
    pub async fn resolve_branch(&self, session_id: Uuid, branch_id: Option<Uuid>) -> Result<Uuid> {
        match branch_id {
            Some(branch_id) => {
                let branch = self.store.get_branch(branch_id).await?;
                if branch.session_id != session_id {
                    return Err(SessionError::BranchMismatch {
                        branch_id,
                        session_id,
                    });
                }
                Ok(branch_id)
            }
            None => Ok(self.store.get_session(session_id).await?.primary_branch_id),
        }
    }

    /// Append one message to a branch through its chain cursor.
    pub async fn add_message(
        &self,
        session_id: Uuid,
        branch_id: Uuid,
        draft: MessageDraft,
    ) -> Result<Message> {
        let mut chain = self.chain(session_id, branch_id).await?;
        Ok(chain.add(draft).await?)
    }

    /// A resumed append cursor for callers that append repeatedly (the
    /// stream consolidator).
    pub async fn chain(&self, session_id: Uuid, branch_id: Uuid) -> Result<MessageChain> {
        Ok(MessageChain::resume(self.store.clone(), session_id, branch_id).await?)
    }

    pub async fn create_branch(
        &self,
        session_id: Uuid,
        edited_message_id: i64,
        new_text: String,
    ) -> Result<(Uuid, i64)> {
        self.branches
            .create_branch(session_id, edited_message_id, new_text)
            .await
    }

    pub async fn switch_primary_branch(
        &self,
        session_id: Uuid,
        target_branch_id: Uuid,
    ) -> Result<()> {
        self.branches
            .switch_primary_branch(session_id, target_branch_id)
            .await
    }

    /// Full transcript for UI replay; every message type included.
    pub async fn session_history(
        &self,
        session_id: Uuid,
        branch_id: Uuid,
    ) -> Result<Vec<Message>> {
        self.history.session_history(session_id, branch_id).await
    }

    /// Trimmed, model-ready context for the provider.
    pub async fn session_context(&self, session_id: Uuid, branch_id: Uuid) -> Result<Vec<Turn>> {
        self.history.session_context(session_id, branch_id).await
    }

    pub async fn set_session_title(&self, session_id: Uuid, title: String) -> Result<()> {
        Ok(self.store.set_session_title(session_id, title).await?)
    }
}
