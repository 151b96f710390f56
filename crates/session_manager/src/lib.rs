//! session_manager - Branch management and history reconstruction
//!
//! Builds on the graph store to implement fork-from-message, primary-branch
//! switching, and the two read paths that replay a branch's ancestry: the
//! full transcript for UI display and the trimmed, model-ready context.

pub mod branch;
pub mod error;
pub mod history;
pub mod service;

pub use branch::BranchManager;
pub use error::{Result, SessionError};
pub use history::HistoryReconstructor;
pub use service::SessionService;
