//! Session manager error types

use thiserror::Error;
use uuid::Uuid;

use graph_store::StoreError;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("branch {branch_id} does not belong to session {session_id}")]
    BranchMismatch { branch_id: Uuid, session_id: Uuid },
}

impl SessionError {
    /// Conflicts are expected and surface as a distinct response; storage
    /// failures do not.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::BranchMismatch { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Store(
                StoreError::SessionNotFound(_)
                    | StoreError::BranchNotFound(_)
                    | StoreError::MessageNotFound(_)
            )
        )
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
