//! History reconstruction
//!
//! Two read paths over the same ancestry resolution: the verbatim transcript
//! for UI replay, and the trimmed model context that honors compression
//! checkpoints and drops ephemeral content. Reconstruction is keyed strictly
//! off branch ancestry metadata; `chosen_next_id` is never consulted.

use std::sync::Arc;

use uuid::Uuid;

use chat_core::{Branch, Message, MessageKind, Turn};
use graph_store::GraphStore;

use crate::error::{Result, SessionError};

pub struct HistoryReconstructor {
    store: Arc<dyn GraphStore>,
}

impl HistoryReconstructor {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// The canonical transcript for a branch: every ancestor's prefix up to
    /// its fork point, then the branch's own messages, ascending by id. All
    /// message types included.
    pub async fn session_history(
        &self,
        session_id: Uuid,
        branch_id: Uuid,
    ) -> Result<Vec<Message>> {
        let lineage = self.lineage(session_id, branch_id).await?;

        let mut transcript = Vec::new();
        for (index, branch) in lineage.iter().enumerate() {
            // An ancestor contributes only the prefix that was visible
            // before the next fork happened; the target branch itself is
            // unbounded.
            let upto = match lineage.get(index + 1) {
                Some(child) => child.branch_from_message_id,
                None => None,
            };
            let mut messages = self.store.messages_in_branch(branch.branch_id, upto).await?;
            transcript.append(&mut messages);
        }
        Ok(transcript)
    }

    /// The exact ordered turn list to hand to a model provider: compression
    /// cut applied, thoughts dropped.
    pub async fn session_context(&self, session_id: Uuid, branch_id: Uuid) -> Result<Vec<Turn>> {
        let transcript = self.session_history(session_id, branch_id).await?;
        Ok(context_from_transcript(&transcript))
    }

    /// Ancestry of `branch_id` in root-to-leaf order.
    async fn lineage(&self, session_id: Uuid, branch_id: Uuid) -> Result<Vec<Branch>> {
        let mut lineage = Vec::new();
        let mut cursor = Some(branch_id);
        while let Some(current) = cursor {
            let branch = self.store.get_branch(current).await?;
            if branch.session_id != session_id {
                return Err(SessionError::BranchMismatch {
                    branch_id,
                    session_id,
                });
            }
            cursor = branch.parent_branch_id;
            lineage.push(branch);
        }
        lineage.reverse();
        Ok(lineage)
    }
}

/// Flatten a canonical transcript into model turns.
///
/// The last compression checkpoint wins: everything older than its target id
/// is dropped and only its summary body is emitted. A malformed checkpoint
/// header is ignored rather than trusted.
pub fn context_from_transcript(transcript: &[Message]) -> Vec<Turn> {
    let cut = transcript
        .iter()
        .rev()
        .find(|message| message.kind == MessageKind::Compression)
        .and_then(|message| match message.compression_parts() {
            Some((target_id, _)) => Some(target_id),
            None => {
                tracing::warn!(
                    message_id = message.message_id,
                    "Ignoring compression checkpoint with malformed header"
                );
                None
            }
        });

    let mut turns = Vec::new();
    for message in transcript {
        if let Some(target_id) = cut {
            if message.message_id < target_id {
                continue;
            }
        }
        if let Some(turn) = turn_from_message(message) {
            turns.push(turn);
        }
    }
    turns
}

fn turn_from_message(message: &Message) -> Option<Turn> {
    match message.kind {
        // Thoughts are UI-only and never replayed into model context.
        MessageKind::Thought => None,
        MessageKind::User => Some(Turn::user(message.content.clone())),
        MessageKind::Model => {
            let mut turn = Turn::model(message.content.clone());
            turn.thought_signature = message.thought_signature.clone();
            Some(turn)
        }
        MessageKind::FunctionCall => {
            let mut turn = Turn::function_call(message.payload.clone()?);
            turn.thought_signature = message.thought_signature.clone();
            Some(turn)
        }
        MessageKind::FunctionResponse => Some(Turn::function_response(message.payload.clone()?)),
        // The header is bookkeeping; only the summary body reaches the
        // model, phrased as user context.
        MessageKind::Compression => {
            let (_, summary) = message.compression_parts()?;
            Some(Turn::user(summary))
        }
    }
}
