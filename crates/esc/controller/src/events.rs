//! Event recording
//!
//! Events are attached to the Userland they concern and published on a
//! broadcast channel. Nobody listening is fine.

use esc_types::{EscEvent, EventEnvelope, EventSeverity, ObjectReference, Resource};
use tokio::sync::broadcast;

/// Channel capacity for recorded events
const EVENT_CHANNEL_CAPACITY: usize = 4096;

/// Records controller events about objects
#[derive(Clone)]
pub struct EventRecorder {
    source: String,
    tx: broadcast::Sender<EventEnvelope>,
}

impl EventRecorder {
    pub fn new(source: impl Into<String>) -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            source: source.into(),
            tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }

    pub fn record<R: Resource>(&self, object: &R, event: EscEvent, severity: EventSeverity) {
        let involved = ObjectReference {
            kind: R::KIND,
            key: object.key(),
            uid: object.meta().uid,
        };

        tracing::debug!(
            object = %involved.key,
            reason = event.reason(),
            "{}",
            event.message()
        );

        let _ = self
            .tx
            .send(EventEnvelope::new(self.source.clone(), involved, event, severity));
    }

    pub fn normal<R: Resource>(&self, object: &R, event: EscEvent) {
        self.record(object, event, EventSeverity::Normal);
    }

    pub fn warning<R: Resource>(&self, object: &R, event: EscEvent) {
        self.record(object, event, EventSeverity::Warning);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use esc_types::{ObjectKey, ResourceKind, Userland};

    #[tokio::test]
    async fn test_recorded_event_reaches_subscriber() {
        let recorder = EventRecorder::new("userland-controller");
        let mut rx = recorder.subscribe();

        let userland = Userland::empty(&ObjectKey::new("ns", "u1"));
        recorder.warning(
            &userland,
            EscEvent::TemplateNotFound {
                template_name: "t1".to_string(),
            },
        );

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.source, "userland-controller");
        assert_eq!(envelope.severity, EventSeverity::Warning);
        assert_eq!(envelope.involved_object.kind, ResourceKind::Userland);
        assert_eq!(envelope.involved_object.key, ObjectKey::new("ns", "u1"));
    }
}
