//! Model-facing conversation turns
//!
//! The history reconstructor flattens a branch's transcript into an ordered
//! list of turns; the provider serializes them into its wire format.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Model,
}

/// One turn handed to a model provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,

    /// Opaque continuity token echoed back exactly as received
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thought_signature: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_call: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_response: Option<serde_json::Value>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
            thought_signature: None,
            function_call: None,
            function_response: None,
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            text: text.into(),
            thought_signature: None,
            function_call: None,
            function_response: None,
        }
    }

    pub fn with_thought_signature(mut self, signature: impl Into<String>) -> Self {
        self.thought_signature = Some(signature.into());
        self
    }

    pub fn function_call(payload: serde_json::Value) -> Self {
        Self {
            role: TurnRole::Model,
            text: String::new(),
            thought_signature: None,
            function_call: Some(payload),
            function_response: None,
        }
    }

    pub fn function_response(payload: serde_json::Value) -> Self {
        Self {
            role: TurnRole::User,
            text: String::new(),
            thought_signature: None,
            function_call: None,
            function_response: Some(payload),
        }
    }
}
