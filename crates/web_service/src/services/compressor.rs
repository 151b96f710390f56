//! Compression checkpoints
//!
//! Bounds model context on long conversations: everything before a kept
//! recent tail is summarized by the provider's one-shot call and recorded as
//! a new compression message. Old messages stay in place for full-history
//! display and re-forking.

use std::sync::Arc;

use uuid::Uuid;

use chat_core::{Message, MessageDraft, MessageKind};
use chat_llm::LLMProvider;
use session_manager::{SessionError, SessionService};

use crate::error::AppError;
use crate::events::ChatEvent;
use crate::services::event_broadcaster::EventBroadcaster;

pub const DEFAULT_KEEP_RECENT: usize = 4;

const SUMMARY_PROMPT: &str =
    "Summarize the conversation below in a few sentences. Preserve names, \
     decisions and open questions; drop pleasantries. Reply with the \
     summary only.";

/// Append a compression checkpoint to a branch. The checkpoint's target id
/// is the first context message kept verbatim; the summary covers everything
/// before it.
pub async fn compress_session(
    sessions: &Arc<SessionService>,
    llm: &Arc<dyn LLMProvider>,
    broadcaster: &EventBroadcaster,
    session_id: Uuid,
    branch_id: Option<Uuid>,
    keep_recent: usize,
) -> Result<Message, AppError> {
    let session = sessions.get_session(session_id).await?;
    let branch_id = sessions.resolve_branch(session_id, branch_id).await?;
    let transcript = sessions.session_history(session_id, branch_id).await?;

    // Only messages that reach model context count toward the tail.
    let eligible: Vec<&Message> = transcript
        .iter()
        .filter(|message| !message.kind.is_ephemeral())
        .collect();
    if eligible.len() <= keep_recent {
        return Err(SessionError::Validation(
            "history is too short to compress".to_string(),
        )
        .into());
    }

    let target_id = eligible[eligible.len() - keep_recent].message_id;

    let mut body = String::new();
    for message in &eligible {
        if message.message_id >= target_id {
            break;
        }
        match message.kind {
            MessageKind::User => body.push_str(&format!("User: {}\n", message.content)),
            MessageKind::Model => body.push_str(&format!("Assistant: {}\n", message.content)),
            // An older checkpoint folds in through its summary body.
            MessageKind::Compression => {
                if let Some((_, summary)) = message.compression_parts() {
                    body.push_str(&format!("Earlier summary: {}\n", summary));
                }
            }
            MessageKind::FunctionCall
            | MessageKind::FunctionResponse
            | MessageKind::Thought => {}
        }
    }

    let prompt = format!("{}\n\n{}", SUMMARY_PROMPT, body);
    let summary = llm.generate(&prompt, &session.model).await?;

    let checkpoint = sessions
        .add_message(
            session_id,
            branch_id,
            MessageDraft::compression(target_id, summary.trim()),
        )
        .await?;

    tracing::info!(
        session_id = %session_id,
        branch_id = %branch_id,
        target_id = target_id,
        "Appended compression checkpoint"
    );

    broadcaster
        .broadcast(session_id, ChatEvent::message_appended(&checkpoint))
        .await;

    Ok(checkpoint)
}
