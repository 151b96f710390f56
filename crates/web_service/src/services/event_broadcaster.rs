use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::events::ChatEvent;

/// Event broadcaster for session observers.
/// Any number of observers (browser tabs, reconnecting clients) may follow
/// the same session; fan-out never blocks on a slow observer, and message
/// persistence never depends on anyone being attached.
#[derive(Clone)]
pub struct EventBroadcaster {
    /// Map of session_id -> list of observer senders
    subscribers: Arc<RwLock<HashMap<Uuid, Vec<mpsc::Sender<ChatEvent>>>>>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Subscribe to events for a session. The returned receiver has a
    /// bounded queue; an observer that falls too far behind loses events
    /// rather than slowing the stream down.
    pub async fn subscribe(&self, session_id: Uuid) -> mpsc::Receiver<ChatEvent> {
        let (tx, rx) = mpsc::channel::<ChatEvent>(32);

        let mut subscribers = self.subscribers.write().await;
        subscribers.entry(session_id).or_default().push(tx);

        tracing::debug!(
            session_id = %session_id,
            subscriber_count = subscribers.get(&session_id).map(|v| v.len()).unwrap_or(0),
            "New session observer added"
        );

        rx
    }

    /// Broadcast an event to all observers of a session.
    pub async fn broadcast(&self, session_id: Uuid, event: ChatEvent) {
        let mut subscribers = self.subscribers.write().await;

        if let Some(senders) = subscribers.get_mut(&session_id) {
            // Drop disconnected observers and push to the rest; a full queue
            // counts as disconnected for this event.
            senders.retain(|sender| sender.try_send(event.clone()).is_ok());

            if senders.is_empty() {
                subscribers.remove(&session_id);
            }
        }
    }

    /// Number of active observers for a session
    pub async fn subscriber_count(&self, session_id: Uuid) -> usize {
        let subscribers = self.subscribers.read().await;
        subscribers.get(&session_id).map(|v| v.len()).unwrap_or(0)
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_reaches_every_subscriber() {
        let broadcaster = EventBroadcaster::new();
        let session_id = Uuid::new_v4();

        let mut rx_a = broadcaster.subscribe(session_id).await;
        let mut rx_b = broadcaster.subscribe(session_id).await;
        assert_eq!(broadcaster.subscriber_count(session_id).await, 2);

        broadcaster
            .broadcast(session_id, ChatEvent::call_completed(session_id))
            .await;

        assert!(matches!(
            rx_a.recv().await,
            Some(ChatEvent::CallCompleted { .. })
        ));
        assert!(matches!(
            rx_b.recv().await,
            Some(ChatEvent::CallCompleted { .. })
        ));
    }

    #[tokio::test]
    async fn events_stay_within_their_session() {
        let broadcaster = EventBroadcaster::new();
        let session_a = Uuid::new_v4();
        let session_b = Uuid::new_v4();

        let mut rx_a = broadcaster.subscribe(session_a).await;
        let _rx_b = broadcaster.subscribe(session_b).await;

        broadcaster
            .broadcast(session_b, ChatEvent::call_completed(session_b))
            .await;

        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn dropped_subscribers_are_pruned() {
        let broadcaster = EventBroadcaster::new();
        let session_id = Uuid::new_v4();

        let rx = broadcaster.subscribe(session_id).await;
        drop(rx);

        broadcaster
            .broadcast(session_id, ChatEvent::call_completed(session_id))
            .await;
        assert_eq!(broadcaster.subscriber_count(session_id).await, 0);
    }

    #[tokio::test]
    async fn slow_observer_drops_events_without_blocking() {
        let broadcaster = EventBroadcaster::new();
        let session_id = Uuid::new_v4();

        // Never read from this receiver; its 32-slot queue fills up.
        let mut slow = broadcaster.subscribe(session_id).await;

        for _ in 0..40 {
            broadcaster
                .broadcast(session_id, ChatEvent::heartbeat())
                .await;
        }

        // The slow observer was pruned on its first full queue.
        assert_eq!(broadcaster.subscriber_count(session_id).await, 0);

        // It still holds whatever fit in its queue.
        let mut received = 0;
        while slow.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, 32);
    }
}
