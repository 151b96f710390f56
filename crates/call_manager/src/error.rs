//! Call manager error types
//!
//! These are conflicts, not failures: the server layer maps them to
//! "already streaming" style responses, distinct from storage errors.

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CallError {
    #[error("call already active for session {0}")]
    AlreadyActive(Uuid),

    #[error("no running call for session {0}")]
    NotRunning(Uuid),
}

pub type Result<T> = std::result::Result<T, CallError>;
