//! Session lifecycle and branch operations

use actix_web::{
    get, post, put,
    web::{Data, Json, Path},
    HttpResponse,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    CompressRequest, CreateBranchRequest, CreateBranchResponse, CreateSessionRequest,
    SwitchBranchRequest,
};
use crate::services::compressor;
use crate::state::AppState;

#[post("/sessions")]
pub async fn create_session(
    state: Data<AppState>,
    req: Json<CreateSessionRequest>,
) -> Result<HttpResponse, AppError> {
    let CreateSessionRequest {
        model,
        system_prompt,
        workspace,
    } = req.into_inner();

    let session = state
        .sessions
        .create_session(
            model.unwrap_or_else(|| state.default_model.clone()),
            system_prompt.unwrap_or_default(),
            workspace,
        )
        .await?;

    Ok(HttpResponse::Created().json(session))
}

#[get("/sessions")]
pub async fn list_sessions(state: Data<AppState>) -> Result<HttpResponse, AppError> {
    let sessions = state.sessions.list_sessions().await?;
    Ok(HttpResponse::Ok().json(sessions))
}

#[get("/sessions/{id}")]
pub async fn get_session(
    state: Data<AppState>,
    path: Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let session = state.sessions.get_session(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(session))
}

/// Fork an alternate continuation in place of an edited message. The new
/// branch becomes the session's primary branch.
#[post("/sessions/{id}/branches")]
pub async fn create_branch(
    state: Data<AppState>,
    path: Path<Uuid>,
    req: Json<CreateBranchRequest>,
) -> Result<HttpResponse, AppError> {
    let session_id = path.into_inner();
    let CreateBranchRequest {
        edited_message_id,
        text,
    } = req.into_inner();

    // Branch-pointer updates serialize with call setup on the same session
    // lock.
    let _guard = state.session_locks.acquire(session_id).await;

    let (branch_id, message_id) = state
        .sessions
        .create_branch(session_id, edited_message_id, text)
        .await?;

    tracing::info!(
        session_id = %session_id,
        branch_id = %branch_id,
        "Branch created via fork"
    );

    Ok(HttpResponse::Created().json(CreateBranchResponse {
        branch_id,
        message_id,
    }))
}

#[put("/sessions/{id}/primary-branch")]
pub async fn switch_primary_branch(
    state: Data<AppState>,
    path: Path<Uuid>,
    req: Json<SwitchBranchRequest>,
) -> Result<HttpResponse, AppError> {
    let session_id = path.into_inner();
    let target = req.into_inner().branch_id;

    let _guard = state.session_locks.acquire(session_id).await;
    state
        .sessions
        .switch_primary_branch(session_id, target)
        .await?;

    Ok(HttpResponse::NoContent().finish())
}

/// Append a compression checkpoint summarizing everything before a kept
/// recent tail.
#[post("/sessions/{id}/compress")]
pub async fn compress(
    state: Data<AppState>,
    path: Path<Uuid>,
    req: Json<CompressRequest>,
) -> Result<HttpResponse, AppError> {
    let session_id = path.into_inner();
    let keep_recent = req
        .into_inner()
        .keep_recent
        .unwrap_or(compressor::DEFAULT_KEEP_RECENT);

    // A checkpoint append must not interleave with a streaming call's chain.
    let _guard = state.session_locks.acquire(session_id).await;
    if state.call_manager.has_active_call(session_id) {
        return Err(call_manager::CallError::AlreadyActive(session_id).into());
    }

    let checkpoint = compressor::compress_session(
        &state.sessions,
        &state.llm,
        &state.broadcaster,
        session_id,
        None,
        keep_recent,
    )
    .await?;

    Ok(HttpResponse::Created().json(checkpoint))
}
