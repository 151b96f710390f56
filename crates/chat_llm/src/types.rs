//! Stream fragment types

use serde_json::Value;

/// One meaningful piece of a streamed model response.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFragment {
    /// Visible model text. Carries the provider's continuity token when one
    /// was attached to this piece; the token must be persisted and echoed
    /// back verbatim on the next call.
    Text {
        content: String,
        thought_signature: Option<String>,
    },

    /// Ephemeral reasoning text. UI-only, never replayed into model context.
    Thought { content: String },

    /// A structured function call issued by the model
    FunctionCall {
        payload: Value,
        thought_signature: Option<String>,
    },

    /// A structured function result echoed through the stream
    FunctionResponse { payload: Value },
}

impl StreamFragment {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
            thought_signature: None,
        }
    }

    pub fn thought(content: impl Into<String>) -> Self {
        Self::Thought {
            content: content.into(),
        }
    }
}
