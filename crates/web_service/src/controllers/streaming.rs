//! Live session event stream
//!
//! Observers attach over SSE: the canonical transcript replays first, then
//! live events follow. Any number of tabs or reconnecting clients may watch
//! the same session.

use std::time::Duration;

use actix_web::{
    get,
    web::{Data, Path},
};
use actix_web_lab::{sse, util::InfallibleStream};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::error::AppError;
use crate::events::ChatEvent;
use crate::state::AppState;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const KEEP_ALIVE: Duration = Duration::from_secs(15);

/// Subscribe to a session's event stream. Replays the primary branch's
/// transcript up to "now", then forwards the live broadcast.
#[get("/sessions/{id}/events")]
pub async fn subscribe_session_events(
    path: Path<Uuid>,
    state: Data<AppState>,
) -> Result<sse::Sse<InfallibleStream<ReceiverStream<sse::Event>>>, AppError> {
    let session_id = path.into_inner();

    let session = state.sessions.get_session(session_id).await?;

    tracing::info!(
        session_id = %session_id,
        "SSE subscription requested"
    );

    // Subscribe before snapshotting the transcript so no event falls into
    // the gap; an observer may see a boundary message twice, never a hole.
    let mut live_rx = state.broadcaster.subscribe(session_id).await;

    let transcript = state
        .sessions
        .session_history(session_id, session.primary_branch_id)
        .await?;

    let (tx, rx) = mpsc::channel::<sse::Event>(32);

    tokio::spawn(async move {
        for message in &transcript {
            let event = ChatEvent::message_appended(message);
            if send_chat_event(&tx, &event).await.is_err() {
                return;
            }
        }

        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await; // the first tick fires immediately

        loop {
            tokio::select! {
                event = live_rx.recv() => match event {
                    Some(event) => {
                        if send_chat_event(&tx, &event).await.is_err() {
                            break;
                        }
                    }
                    // Broadcaster pruned this observer (queue overflow);
                    // the client reconnects and replays.
                    None => break,
                },
                _ = heartbeat.tick() => {
                    if send_chat_event(&tx, &ChatEvent::heartbeat()).await.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::debug!(session_id = %session_id, "SSE event stream closed");
    });

    Ok(sse::Sse::from_infallible_receiver(rx).with_keep_alive(KEEP_ALIVE))
}

async fn send_chat_event(
    tx: &mpsc::Sender<sse::Event>,
    event: &ChatEvent,
) -> Result<(), ()> {
    match sse::Data::new_json(event) {
        Ok(data) => tx
            .send(sse::Event::Data(data.event("chat")))
            .await
            .map_err(|_| ()),
        Err(error) => {
            log::error!("Failed to serialize chat event: {}", error);
            Ok(())
        }
    }
}
