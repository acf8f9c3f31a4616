use async_trait::async_trait;
use parking_lot::Mutex;
use slugway_core::{EventSink, EventSinkError, SlugChangeCorrelations, SlugChangedEvent};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const BROADCAST_CAPACITY: usize = 256;

/// Hands slug change notifications to an [`EventSink`].
///
/// Delivery is best effort: a failing sink is logged and never fails the
/// cascade that already happened.
#[derive(Clone)]
pub struct NotificationEmitter {
    sink: Arc<dyn EventSink>,
}

impl NotificationEmitter {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    pub async fn slug_changed(
        &self,
        correlations: SlugChangeCorrelations,
        auto_update_slugs: bool,
        auto_create_redirects: bool,
    ) -> SlugChangedEvent {
        let event = SlugChangedEvent::new(correlations, auto_update_slugs, auto_create_redirects);

        match self.sink.publish(&event).await {
            Ok(()) => debug!(
                slug_update = %event.correlations.correlation_id_slug_update,
                redirect_creation = %event.correlations.correlation_id_redirect_creation,
                "slug change notification published"
            ),
            Err(e) => warn!(error = %e, "failed to publish slug change notification"),
        }
        event
    }
}

/// Fans notifications out to in-process subscribers.
#[derive(Debug, Clone)]
pub struct BroadcastEventSink {
    tx: broadcast::Sender<SlugChangedEvent>,
}

impl BroadcastEventSink {
    pub fn new() -> Self {
        Self {
            tx: broadcast::channel(BROADCAST_CAPACITY).0,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SlugChangedEvent> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastEventSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventSink for BroadcastEventSink {
    async fn publish(&self, event: &SlugChangedEvent) -> Result<(), EventSinkError> {
        // no subscribers is not an error
        let receivers = self.tx.send(event.clone()).unwrap_or(0);
        debug!(receivers, "slug change broadcast");
        Ok(())
    }
}

/// Writes every notification as a JSON log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn publish(&self, event: &SlugChangedEvent) -> Result<(), EventSinkError> {
        let payload = serde_json::to_string(event)
            .map_err(|e| EventSinkError::Serialization(e.to_string()))?;
        info!(event = %payload, "slug changed");
        Ok(())
    }
}

/// Keeps every published notification in memory.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<SlugChangedEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SlugChangedEvent> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl EventSink for RecordingEventSink {
    async fn publish(&self, event: &SlugChangedEvent) -> Result<(), EventSinkError> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slugway_core::CorrelationId;

    struct FailingSink;

    #[async_trait]
    impl EventSink for FailingSink {
        async fn publish(&self, _event: &SlugChangedEvent) -> Result<(), EventSinkError> {
            Err(EventSinkError::Publish("channel closed".to_string()))
        }
    }

    fn correlations() -> SlugChangeCorrelations {
        let base = CorrelationId::for_subject("abc");
        SlugChangeCorrelations {
            correlation_id_slug_update: base.with_aspects(["slugway", "slug"]),
            correlation_id_redirect_creation: base.with_aspects(["slugway", "redirect"]),
        }
    }

    #[tokio::test]
    async fn emitter_publishes_to_sink() {
        let sink = Arc::new(RecordingEventSink::new());
        let emitter = NotificationEmitter::new(sink.clone());

        let event = emitter.slug_changed(correlations(), true, false).await;

        assert_eq!(sink.events(), vec![event.clone()]);
        assert_eq!(event.component_name, "redirects");
        assert_eq!(event.event_name, "slugChanged");
        assert!(event.auto_update_slugs);
        assert!(!event.auto_create_redirects);
    }

    #[tokio::test]
    async fn failing_sink_is_not_an_error() {
        let emitter = NotificationEmitter::new(Arc::new(FailingSink));

        let event = emitter.slug_changed(correlations(), true, true).await;
        assert_eq!(event.correlations, correlations());
    }

    #[tokio::test]
    async fn broadcast_reaches_subscribers() {
        let sink = BroadcastEventSink::new();
        let mut rx = sink.subscribe();

        let event = SlugChangedEvent::new(correlations(), true, true);
        sink.publish(&event).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn broadcast_without_subscribers_succeeds() {
        let sink = BroadcastEventSink::new();
        let event = SlugChangedEvent::new(correlations(), true, true);

        assert!(sink.publish(&event).await.is_ok());
    }

    #[tokio::test]
    async fn tracing_sink_accepts_events() {
        let event = SlugChangedEvent::new(correlations(), false, true);
        assert!(TracingEventSink.publish(&event).await.is_ok());
    }
}
