//! call_manager - Single-flight model call coordination
//!
//! Tracks at most one in-flight model invocation per session and owns the
//! per-session locks that serialize call setup against branch mutations.

pub mod error;
pub mod locks;
pub mod manager;

pub use error::{CallError, Result};
pub use locks::SessionLocks;
pub use manager::{CallManager, CallStatus};
