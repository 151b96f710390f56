//! Automatic session naming
//!
//! After the first completed exchange an untitled session gets a short
//! title from the provider's one-shot call. Failures are logged and
//! swallowed; naming never disturbs the conversation itself.

use std::sync::Arc;

use uuid::Uuid;

use chat_core::TurnRole;
use chat_llm::LLMProvider;
use session_manager::SessionService;

use crate::events::ChatEvent;
use crate::services::event_broadcaster::EventBroadcaster;

const TITLE_PROMPT: &str =
    "Suggest a short title (six words at most) for the conversation below. \
     Reply with the title only.";

/// How many leading turns are enough to name a conversation
const TITLE_CONTEXT_TURNS: usize = 6;

pub async fn maybe_generate_title(
    sessions: &Arc<SessionService>,
    llm: &Arc<dyn LLMProvider>,
    broadcaster: &EventBroadcaster,
    session_id: Uuid,
) {
    let session = match sessions.get_session(session_id).await {
        Ok(session) => session,
        Err(error) => {
            log::warn!("[{}] Title generation skipped: {}", session_id, error);
            return;
        }
    };
    if session.title.is_some() {
        return;
    }

    let turns = match sessions
        .session_context(session_id, session.primary_branch_id)
        .await
    {
        Ok(turns) => turns,
        Err(error) => {
            log::warn!("[{}] Title generation skipped: {}", session_id, error);
            return;
        }
    };

    let mut excerpt = String::new();
    for turn in turns.iter().take(TITLE_CONTEXT_TURNS) {
        if turn.text.is_empty() {
            continue;
        }
        let speaker = match turn.role {
            TurnRole::User => "User",
            TurnRole::Model => "Assistant",
        };
        excerpt.push_str(&format!("{}: {}\n", speaker, turn.text));
    }
    if excerpt.is_empty() {
        return;
    }

    let prompt = format!("{}\n\n{}", TITLE_PROMPT, excerpt);
    match llm.generate(&prompt, &session.model).await {
        Ok(raw) => {
            let title = raw.trim().trim_matches('"').to_string();
            if title.is_empty() {
                return;
            }
            if let Err(error) = sessions.set_session_title(session_id, title.clone()).await {
                log::warn!("[{}] Failed to store title: {}", session_id, error);
                return;
            }
            broadcaster
                .broadcast(session_id, ChatEvent::TitleUpdated { session_id, title })
                .await;
        }
        Err(error) => {
            log::warn!("[{}] Title generation failed: {}", session_id, error);
        }
    }
}
