//! Streaming-to-persistence consolidation
//!
//! Drives a provider's fragment sequence under the call's cancellation
//! token. Every fragment is appended through the branch's message chain and
//! fanned out to observers before the next one is consumed, so cancellation
//! always leaves the chain truncated at a valid, replayable boundary.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use call_manager::CallManager;
use chat_core::{Message, MessageDraft, Session, Turn};
use chat_llm::{LLMProvider, StreamFragment};
use graph_store::MessageChain;
use session_manager::SessionService;

use crate::events::ChatEvent;
use crate::services::event_broadcaster::EventBroadcaster;
use crate::services::title;

enum CallOutcome {
    Completed,
    Cancelled,
    Failed(String),
}

pub struct StreamConsolidator {
    sessions: Arc<SessionService>,
    calls: CallManager,
    broadcaster: EventBroadcaster,
    llm: Arc<dyn LLMProvider>,
}

impl StreamConsolidator {
    pub fn new(
        sessions: Arc<SessionService>,
        calls: CallManager,
        broadcaster: EventBroadcaster,
        llm: Arc<dyn LLMProvider>,
    ) -> Self {
        Self {
            sessions,
            calls,
            broadcaster,
            llm,
        }
    }

    /// Drive one registered call to its terminal state. The call entry is
    /// evicted after the terminal broadcast; the session is then immediately
    /// eligible for a new call.
    pub async fn run_call(
        &self,
        session: Session,
        mut chain: MessageChain,
        turns: Vec<Turn>,
        cancel: CancellationToken,
    ) {
        let session_id = session.session_id;
        let outcome = self.consume(&session, &mut chain, &turns, &cancel).await;

        match &outcome {
            CallOutcome::Completed => {
                log::debug!("[{}] Model stream completed", session_id);
                self.calls.complete_call(session_id);
                self.broadcaster
                    .broadcast(session_id, ChatEvent::call_completed(session_id))
                    .await;
            }
            CallOutcome::Cancelled => {
                log::info!("[{}] Model stream cancelled", session_id);
                // Usually the canceller already transitioned the entry; a
                // cancellation surfaced by the provider itself still needs
                // the transition.
                let _ = self.calls.cancel_call(session_id);
                self.broadcaster
                    .broadcast(session_id, ChatEvent::call_cancelled(session_id))
                    .await;
            }
            CallOutcome::Failed(error) => {
                log::error!("[{}] Model stream failed: {}", session_id, error);
                self.calls.fail_call(session_id, error.clone());
                self.broadcaster
                    .broadcast(session_id, ChatEvent::call_failed(session_id, error.clone()))
                    .await;
            }
        }

        self.calls.remove_call(session_id);

        if matches!(outcome, CallOutcome::Completed) {
            title::maybe_generate_title(&self.sessions, &self.llm, &self.broadcaster, session_id)
                .await;
        }
    }

    async fn consume(
        &self,
        session: &Session,
        chain: &mut MessageChain,
        turns: &[Turn],
        cancel: &CancellationToken,
    ) -> CallOutcome {
        let system_prompt = Some(session.system_prompt.as_str()).filter(|p| !p.is_empty());
        let mut stream = match self
            .llm
            .chat_stream(system_prompt, turns, &session.model, true)
            .await
        {
            Ok(stream) => stream,
            Err(error) => return CallOutcome::Failed(error.to_string()),
        };

        loop {
            let fragment = tokio::select! {
                // Cancellation is cooperative: stop consuming between
                // fragments. Messages already committed stand; there is no
                // rollback.
                _ = cancel.cancelled() => return CallOutcome::Cancelled,
                next = stream.next() => match next {
                    None => return CallOutcome::Completed,
                    Some(Err(error)) => return CallOutcome::Failed(error.to_string()),
                    Some(Ok(fragment)) => fragment,
                },
            };

            match chain.add(draft_from_fragment(fragment)).await {
                Ok(message) => self.announce(&message).await,
                Err(error) => return CallOutcome::Failed(format!("storage error: {}", error)),
            }
        }
    }

    async fn announce(&self, message: &Message) {
        self.broadcaster
            .broadcast(message.session_id, ChatEvent::message_appended(message))
            .await;
    }
}

/// Classify a fragment into its message form. Continuity tokens ride along
/// verbatim so a future request can replay them exactly as received.
fn draft_from_fragment(fragment: StreamFragment) -> MessageDraft {
    match fragment {
        StreamFragment::Text {
            content,
            thought_signature,
        } => {
            let mut draft = MessageDraft::model(content);
            draft.thought_signature = thought_signature;
            draft
        }
        StreamFragment::Thought { content } => MessageDraft::thought(content),
        StreamFragment::FunctionCall {
            payload,
            thought_signature,
        } => {
            let mut draft = MessageDraft::function_call(payload);
            draft.thought_signature = thought_signature;
            draft
        }
        StreamFragment::FunctionResponse { payload } => MessageDraft::function_response(payload),
    }
}
