//! chat_llm - Model provider boundary
//!
//! A provider turns an ordered list of conversation turns into a lazy,
//! single-pass sequence of response fragments. The concrete implementation
//! speaks the Gemini generateContent protocol; the rest of the system only
//! sees the [`LLMProvider`] trait.

pub mod gemini;
pub mod provider;
pub mod types;

pub use gemini::GeminiProvider;
pub use provider::{LLMError, LLMProvider, LLMStream, Result};
pub use types::StreamFragment;
