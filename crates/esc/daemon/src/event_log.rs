//! Bounded log of recorded controller events

use esc_types::EventEnvelope;
use std::collections::VecDeque;
use tokio::sync::{broadcast, RwLock};

/// Keeps the most recent events, oldest dropped first
pub struct EventLog {
    events: RwLock<VecDeque<EventEnvelope>>,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: RwLock::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    pub async fn push(&self, event: EventEnvelope) {
        let mut events = self.events.write().await;
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Up to `limit` most recent events, newest first
    pub async fn recent(&self, limit: usize) -> Vec<EventEnvelope> {
        let events = self.events.read().await;
        events.iter().rev().take(limit).cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Append events from `rx` until the channel closes
    pub async fn collect_from(&self, mut rx: broadcast::Receiver<EventEnvelope>) {
        loop {
            match rx.recv().await {
                Ok(event) => self.push(event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "Event log lagged behind recorder");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use esc_types::{EscEvent, EventSeverity, ObjectKey, ObjectReference, ResourceKind};

    fn event(name: &str) -> EventEnvelope {
        EventEnvelope::new(
            "test",
            ObjectReference {
                kind: ResourceKind::Userland,
                key: ObjectKey::new("dev", "u1"),
                uid: None,
            },
            EscEvent::ClaimRetained {
                name: name.to_string(),
            },
            EventSeverity::Normal,
        )
    }

    #[tokio::test]
    async fn test_oldest_events_are_dropped() {
        let log = EventLog::new(2);
        log.push(event("a")).await;
        log.push(event("b")).await;
        log.push(event("c")).await;

        let recent = log.recent(10).await;
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].event, EscEvent::ClaimRetained { name: "c".to_string() });
        assert_eq!(recent[1].event, EscEvent::ClaimRetained { name: "b".to_string() });
    }

    #[tokio::test]
    async fn test_recent_respects_limit() {
        let log = EventLog::new(10);
        for name in ["a", "b", "c"] {
            log.push(event(name)).await;
        }
        assert_eq!(log.recent(1).await.len(), 1);
        assert_eq!(log.len().await, 3);
    }
}
