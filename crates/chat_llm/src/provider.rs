use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;

use chat_core::Turn;

use crate::types::StreamFragment;

#[derive(Error, Debug)]
pub enum LLMError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("API error: {0}")]
    Api(String),
}

pub type Result<T> = std::result::Result<T, LLMError>;

/// Lazy, finite, single-pass fragment sequence. Dropping the stream releases
/// the underlying transport.
pub type LLMStream = Pin<Box<dyn Stream<Item = Result<StreamFragment>> + Send>>;

#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Stream a model response for an ordered turn list.
    ///
    /// # Arguments
    /// * `system_prompt` - Instruction text sent ahead of the turns
    /// * `turns` - Conversation turns, oldest first
    /// * `model` - Model identifier
    /// * `include_thoughts` - Ask the model to surface reasoning fragments
    ///   and continuity tokens; tokens present on the turns are echoed back
    ///   regardless
    async fn chat_stream(
        &self,
        system_prompt: Option<&str>,
        turns: &[Turn],
        model: &str,
        include_thoughts: bool,
    ) -> Result<LLMStream>;

    /// One-shot aggregated completion, used for auxiliary tasks like session
    /// naming and history summarization.
    async fn generate(&self, prompt: &str, model: &str) -> Result<String>;
}
