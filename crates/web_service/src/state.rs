use std::path::PathBuf;
use std::sync::Arc;

use call_manager::{CallManager, SessionLocks};
use chat_llm::{GeminiProvider, LLMProvider};
use graph_store::{GraphStore, SqliteGraphStore};
use session_manager::SessionService;

use crate::services::EventBroadcaster;

/// Shared state of the HTTP layer. Everything here is an owned, injectable
/// component so tests construct isolated instances.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionService>,
    pub call_manager: CallManager,
    pub session_locks: SessionLocks,
    pub broadcaster: EventBroadcaster,
    pub llm: Arc<dyn LLMProvider>,
    pub default_model: String,
}

impl AppState {
    pub fn new(
        store: Arc<dyn GraphStore>,
        llm: Arc<dyn LLMProvider>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            sessions: Arc::new(SessionService::new(store)),
            call_manager: CallManager::new(),
            session_locks: SessionLocks::new(),
            broadcaster: EventBroadcaster::new(),
            llm,
            default_model: default_model.into(),
        }
    }

    pub async fn with_config(
        db_path: PathBuf,
        api_key: String,
        api_base: Option<String>,
        default_model: String,
    ) -> anyhow::Result<Self> {
        log::info!("Initializing conversation store at: {:?}", db_path);
        let store = SqliteGraphStore::new(&db_path);
        store.init().await?;

        let mut provider = GeminiProvider::new(api_key);
        if let Some(base) = api_base {
            provider = provider.with_base_url(base);
        }

        Ok(Self::new(
            Arc::new(store),
            Arc::new(provider),
            default_model,
        ))
    }
}
