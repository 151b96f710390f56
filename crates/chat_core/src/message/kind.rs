//! Message kind tags

use serde::{Deserialize, Serialize};

/// The type tag of a message node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// A user turn
    User,
    /// A model turn
    Model,
    /// An ephemeral reasoning fragment. Shown in the UI, never replayed into
    /// model context.
    Thought,
    /// A model-issued function call
    FunctionCall,
    /// The corresponding function result
    FunctionResponse,
    /// A compression checkpoint summarizing all prior turns up to a
    /// referenced message id
    Compression,
}

impl MessageKind {
    /// Stable storage tag
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
            Self::Thought => "thought",
            Self::FunctionCall => "function_call",
            Self::FunctionResponse => "function_response",
            Self::Compression => "compression",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "user" => Some(Self::User),
            "model" => Some(Self::Model),
            "thought" => Some(Self::Thought),
            "function_call" => Some(Self::FunctionCall),
            "function_response" => Some(Self::FunctionResponse),
            "compression" => Some(Self::Compression),
            _ => None,
        }
    }

    /// Thoughts are UI-only; everything else participates in model context.
    pub fn is_ephemeral(&self) -> bool {
        matches!(self, Self::Thought)
    }
}
