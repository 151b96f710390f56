//! chat_core - Core types for the conversation system
//!
//! This crate provides the foundational types used across all conversation
//! crates:
//! - `session` - Session and Branch rows of the conversation graph
//! - `message` - Message nodes, kinds, and append drafts
//! - `turn` - Model-facing conversation turns
//! - `config` - Server configuration loading
//! - `paths` - Data directory helpers

pub mod config;
pub mod message;
pub mod paths;
pub mod session;
pub mod turn;

// Re-export commonly used types
pub use config::Config;
pub use message::{Message, MessageDraft, MessageKind};
pub use session::{Branch, Session};
pub use turn::{Turn, TurnRole};
