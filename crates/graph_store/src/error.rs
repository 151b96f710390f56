//! Graph store error types

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage task join error: {0}")]
    Task(String),

    #[error("session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("branch not found: {0}")]
    BranchNotFound(Uuid),

    #[error("message not found: {0}")]
    MessageNotFound(i64),

    #[error("invalid row data: {0}")]
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
