//! HTTP-level flow tests: send/stream/cancel, forking and switching.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use actix_web::{http::StatusCode, test, web, App};
use async_trait::async_trait;
use futures::stream;
use futures::StreamExt;
use serde_json::json;
use tempfile::tempdir;
use uuid::Uuid;

use chat_core::{Message, MessageDraft, Turn};
use chat_llm::{LLMProvider, LLMStream, StreamFragment};
use graph_store::{GraphStore, SqliteGraphStore};
use web_service::server::configure_api;
use web_service::AppState;

/// One scripted fragment sequence per model call, in order. A `None` script
/// hangs after its fragments, for cancellation tests.
struct ScriptedProvider {
    scripts: Mutex<VecDeque<(Vec<StreamFragment>, bool)>>,
}

impl ScriptedProvider {
    fn new(scripts: Vec<(Vec<StreamFragment>, bool)>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into_iter().collect()),
        }
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn chat_stream(
        &self,
        _system_prompt: Option<&str>,
        _turns: &[Turn],
        _model: &str,
        _include_thoughts: bool,
    ) -> chat_llm::Result<LLMStream> {
        let (fragments, hang) = self
            .scripts
            .lock()
            .expect("script lock")
            .pop_front()
            .expect("unexpected model call");
        let scripted = stream::iter(fragments.into_iter().map(Ok));
        if hang {
            Ok(Box::pin(scripted.chain(stream::pending())))
        } else {
            Ok(Box::pin(scripted))
        }
    }

    async fn generate(&self, _prompt: &str, _model: &str) -> chat_llm::Result<String> {
        Ok("Scripted chat".to_string())
    }
}

async fn app_state(provider: ScriptedProvider) -> (AppState, tempfile::TempDir) {
    let dir = tempdir().expect("temp dir");
    let store = SqliteGraphStore::new(dir.path().join("conversations.db"));
    store.init().await.expect("init store");
    let state = AppState::new(Arc::new(store), Arc::new(provider), "gemini-2.5-flash");
    (state, dir)
}

async fn wait_until_idle(state: &AppState, session_id: Uuid) {
    for _ in 0..100 {
        if !state.call_manager.has_active_call(session_id) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("call never reached a terminal state");
}

#[actix_web::test]
async fn send_message_streams_into_history() {
    let (state, _dir) = app_state(ScriptedProvider::new(vec![(
        vec![
            StreamFragment::thought("working on it"),
            StreamFragment::text("high tide is at noon"),
        ],
        false,
    )]))
    .await;

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(configure_api),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/sessions")
            .set_json(json!({ "system_prompt": "be brief" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let session: chat_core::Session = test::read_body_json(resp).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/sessions/{}/messages", session.session_id))
            .set_json(json!({ "text": "when is high tide?" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    wait_until_idle(&state, session.session_id).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!(
                "/api/v1/sessions/{}/branches/{}/messages",
                session.session_id, session.primary_branch_id
            ))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let messages: Vec<Message> = test::read_body_json(resp).await;

    // user turn + thought + model text
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0].content, "when is high tide?");
    assert_eq!(messages[2].content, "high tide is at noon");

    // The completed exchange titles the session; naming finishes shortly
    // after the call entry is evicted.
    let mut title = None;
    for _ in 0..100 {
        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri(&format!("/api/v1/sessions/{}", session.session_id))
                .to_request(),
        )
        .await;
        let reloaded: chat_core::Session = test::read_body_json(resp).await;
        if reloaded.title.is_some() {
            title = reloaded.title;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(title.as_deref(), Some("Scripted chat"));
}

#[actix_web::test]
async fn concurrent_send_conflicts_until_cancelled() {
    let (state, _dir) = app_state(ScriptedProvider::new(vec![
        (vec![StreamFragment::text("thinking...")], true),
        (vec![StreamFragment::text("done")], false),
    ]))
    .await;

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(configure_api),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/sessions")
            .set_json(json!({}))
            .to_request(),
    )
    .await;
    let session: chat_core::Session = test::read_body_json(resp).await;
    let send_uri = format!("/api/v1/sessions/{}/messages", session.session_id);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&send_uri)
            .set_json(json!({ "text": "first" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    // The first call hangs mid-stream: every retry fails fast.
    for _ in 0..2 {
        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri(&send_uri)
                .set_json(json!({ "text": "second" }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/sessions/{}/cancel", session.session_id))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    wait_until_idle(&state, session.session_id).await;

    // Cancelling an idle session is a conflict, not a 500.
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/sessions/{}/cancel", session.session_id))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // After eviction the session accepts a new call.
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&send_uri)
            .set_json(json!({ "text": "third" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    wait_until_idle(&state, session.session_id).await;
}

#[actix_web::test]
async fn fork_and_switch_over_http() {
    let (state, _dir) = app_state(ScriptedProvider::new(vec![])).await;

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(configure_api),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/sessions")
            .set_json(json!({}))
            .to_request(),
    )
    .await;
    let session: chat_core::Session = test::read_body_json(resp).await;
    let root = session.primary_branch_id;

    // Seed the root branch without involving the provider.
    let first = state
        .sessions
        .add_message(session.session_id, root, MessageDraft::user("hi"))
        .await
        .expect("first");
    let second = state
        .sessions
        .add_message(session.session_id, root, MessageDraft::model("hello"))
        .await
        .expect("second");

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/sessions/{}/branches", session.session_id))
            .set_json(json!({ "edited_message_id": second.message_id, "text": "bye" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let fork: serde_json::Value = test::read_body_json(resp).await;
    let branch_id: Uuid = fork["branch_id"].as_str().unwrap().parse().unwrap();
    let forked_message_id = fork["message_id"].as_i64().unwrap();

    // The forked branch replays the shared prefix plus its own message.
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!(
                "/api/v1/sessions/{}/branches/{}/messages",
                session.session_id, branch_id
            ))
            .to_request(),
    )
    .await;
    let messages: Vec<Message> = test::read_body_json(resp).await;
    assert_eq!(
        messages.iter().map(|m| m.message_id).collect::<Vec<_>>(),
        vec![first.message_id, forked_message_id]
    );

    // Forking the session's first message is rejected as invalid.
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/sessions/{}/branches", session.session_id))
            .set_json(json!({ "edited_message_id": first.message_id, "text": "yo" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // Switch back to the root branch.
    let resp = test::call_service(
        &app,
        test::TestRequest::put()
            .uri(&format!(
                "/api/v1/sessions/{}/primary-branch",
                session.session_id
            ))
            .set_json(json!({ "branch_id": root }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    // A branch from another session is a conflict.
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/sessions")
            .set_json(json!({}))
            .to_request(),
    )
    .await;
    let other: chat_core::Session = test::read_body_json(resp).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::put()
            .uri(&format!(
                "/api/v1/sessions/{}/primary-branch",
                session.session_id
            ))
            .set_json(json!({ "branch_id": other.primary_branch_id }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}
