//! web_service - HTTP/SSE surface and streaming consolidation
//!
//! Hosts the stream consolidator that turns provider fragments into
//! persisted messages plus observer fan-out, and the actix-web layer that
//! exposes sessions, branching, history and live events.

pub mod controllers;
pub mod error;
pub mod events;
pub mod models;
pub mod server;
pub mod services;
pub mod state;

pub use error::AppError;
pub use state::AppState;
