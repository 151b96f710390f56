//! graph_store - Append-only conversation graph persistence
//!
//! Owns the relational schema and CRUD primitives for sessions, branches and
//! messages, plus the per-branch append cursor that is the only path by
//! which new messages enter a branch.

pub mod chain;
pub mod error;
pub mod store;

pub use chain::MessageChain;
pub use error::{Result, StoreError};
pub use store::{GraphStore, SqliteGraphStore};
