//! HTTP error mapping
//!
//! Conflicts are expected and must stay distinguishable from storage
//! failures so clients get "already streaming" instead of a generic 500.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use call_manager::CallError;
use chat_llm::LLMError;
use session_manager::SessionError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Call(#[from] CallError),

    #[error("provider error: {0}")]
    Provider(#[from] LLMError),
}

impl From<graph_store::StoreError> for AppError {
    fn from(error: graph_store::StoreError) -> Self {
        Self::Session(SessionError::Store(error))
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Session(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            Self::Session(e) if e.is_conflict() => StatusCode::CONFLICT,
            Self::Session(SessionError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Call(_) => StatusCode::CONFLICT,
            Self::Provider(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.to_string(),
        }))
    }
}
