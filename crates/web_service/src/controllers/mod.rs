pub mod health;
pub mod messages;
pub mod sessions;
pub mod streaming;
