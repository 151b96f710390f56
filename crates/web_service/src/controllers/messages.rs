//! Message send, cancel and history endpoints

use actix_web::{
    get, post,
    web::{Data, Json, Path},
    HttpResponse,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use chat_core::MessageDraft;

use crate::error::AppError;
use crate::events::ChatEvent;
use crate::models::{SendMessageRequest, SendMessageResponse};
use crate::services::StreamConsolidator;
use crate::state::AppState;

/// Send a user message and start one streaming model call. Returns 202 with
/// the persisted user message; model output arrives over the session's event
/// stream. Fails fast with 409 while a call is already running.
#[post("/sessions/{id}/messages")]
pub async fn send_message(
    state: Data<AppState>,
    path: Path<Uuid>,
    req: Json<SendMessageRequest>,
) -> Result<HttpResponse, AppError> {
    let session_id = path.into_inner();
    let SendMessageRequest { text, branch_id } = req.into_inner();

    tracing::info!(
        session_id = %session_id,
        message_length = text.len(),
        "send_message called"
    );

    // The single-flight check, the user append and the branch read happen
    // under the session's lock so they cannot interleave with a fork or
    // switch.
    let guard = state.session_locks.acquire(session_id).await;

    if state.call_manager.has_active_call(session_id) {
        return Err(call_manager::CallError::AlreadyActive(session_id).into());
    }

    let session = state.sessions.get_session(session_id).await?;
    let branch_id = state.sessions.resolve_branch(session_id, branch_id).await?;

    let mut chain = state.sessions.chain(session_id, branch_id).await?;
    let user_message = chain.add(MessageDraft::user(text)).await?;
    state
        .broadcaster
        .broadcast(session_id, ChatEvent::message_appended(&user_message))
        .await;

    let turns = state.sessions.session_context(session_id, branch_id).await?;

    let cancel = CancellationToken::new();
    state.call_manager.start_call(session_id, cancel.clone())?;
    drop(guard);

    let consolidator = StreamConsolidator::new(
        state.sessions.clone(),
        state.call_manager.clone(),
        state.broadcaster.clone(),
        state.llm.clone(),
    );
    tokio::spawn(async move {
        consolidator.run_call(session, chain, turns, cancel).await;
    });

    Ok(HttpResponse::Accepted().json(SendMessageResponse {
        message: user_message,
        streaming: true,
    }))
}

/// Cancel the session's running call. 409 when none is running.
#[post("/sessions/{id}/cancel")]
pub async fn cancel_call(
    state: Data<AppState>,
    path: Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let session_id = path.into_inner();
    state.call_manager.cancel_call(session_id)?;
    log::info!("[{}] Call cancelled by client", session_id);
    Ok(HttpResponse::Accepted().json(serde_json::json!({ "cancelled": true })))
}

/// Full transcript of a branch for UI replay; every message type included.
#[get("/sessions/{id}/branches/{branch_id}/messages")]
pub async fn branch_history(
    state: Data<AppState>,
    path: Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, AppError> {
    let (session_id, branch_id) = path.into_inner();
    let messages = state
        .sessions
        .session_history(session_id, branch_id)
        .await?;
    Ok(HttpResponse::Ok().json(messages))
}
