//! Request and response bodies

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use chat_core::Message;

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub workspace: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
    /// Target branch; the session's primary branch when omitted
    #[serde(default)]
    pub branch_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub message: Message,
    /// Model output arrives over the session's event stream
    pub streaming: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateBranchRequest {
    pub edited_message_id: i64,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct CreateBranchResponse {
    pub branch_id: Uuid,
    pub message_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct SwitchBranchRequest {
    pub branch_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct CompressRequest {
    /// How many recent context messages to keep verbatim
    #[serde(default)]
    pub keep_recent: Option<usize>,
}
