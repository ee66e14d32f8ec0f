//! Broadcast-based dispatch for [`SessionEvent`]s.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::broadcast;

use crate::events::SessionEvent;

/// Default broadcast channel capacity.
const DEFAULT_CAPACITY: usize = 1024;

/// Fan-out channel for session events.
///
/// Non-blocking: `emit` never awaits, so the workflow can publish
/// transitions from inside its own async stages. A receiver that falls
/// behind the channel capacity lags out instead of slowing the sender.
pub struct EventEmitter {
    tx: broadcast::Sender<SessionEvent>,
    emit_count: AtomicU64,
}

impl EventEmitter {
    /// Emitter with the default channel capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Emitter with a custom channel capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            emit_count: AtomicU64::new(0),
        }
    }

    /// Publish an event to every subscriber.
    ///
    /// Returns how many receivers got the event; 0 when nobody is
    /// listening, which is not an error.
    pub fn emit(&self, event: SessionEvent) -> usize {
        let _ = self.emit_count.fetch_add(1, Ordering::Relaxed);
        self.tx.send(event).unwrap_or(0)
    }

    /// Open a receiver for events emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Number of live receivers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Total events published over the emitter's lifetime.
    pub fn emit_count(&self) -> u64 {
        self.emit_count.load(Ordering::Relaxed)
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use respira_core::errors::{ErrorKind, StageError};
    use uuid::Uuid;

    use super::*;
    use crate::session::{ReportStage, SessionStage};

    fn stage_event(stage: SessionStage) -> SessionEvent {
        SessionEvent::stage_changed(Uuid::now_v7(), stage)
    }

    #[test]
    fn emit_with_no_subscribers() {
        let emitter = EventEmitter::new();
        let delivered = emitter.emit(stage_event(SessionStage::Submitting));
        assert_eq!(delivered, 0);
        assert_eq!(emitter.emit_count(), 1);
    }

    #[tokio::test]
    async fn emit_and_receive() {
        let emitter = EventEmitter::new();
        let mut rx = emitter.subscribe();

        let id = Uuid::now_v7();
        let delivered = emitter.emit(SessionEvent::stage_changed(id, SessionStage::Ready));
        assert_eq!(delivered, 1);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.session_id(), id);
        assert_eq!(received.event_type(), "stage_changed");
    }

    #[tokio::test]
    async fn multiple_subscribers_all_receive() {
        let emitter = EventEmitter::new();
        let mut rx1 = emitter.subscribe();
        let mut rx2 = emitter.subscribe();

        assert_eq!(emitter.subscriber_count(), 2);

        let delivered = emitter.emit(stage_event(SessionStage::Ready));
        assert_eq!(delivered, 2);

        assert_eq!(rx1.recv().await.unwrap().event_type(), "stage_changed");
        assert_eq!(rx2.recv().await.unwrap().event_type(), "stage_changed");
    }

    #[tokio::test]
    async fn slow_receiver_lags_out() {
        let emitter = EventEmitter::with_capacity(2);
        let mut rx = emitter.subscribe();

        // Three events into a capacity-2 channel without a read between
        let _ = emitter.emit(stage_event(SessionStage::Submitting));
        let _ = emitter.emit(stage_event(SessionStage::AwaitingResult));
        let _ = emitter.emit(stage_event(SessionStage::Ready));

        assert!(rx.recv().await.is_err());
    }

    #[tokio::test]
    async fn mixed_event_kinds_arrive_in_order() {
        let emitter = EventEmitter::new();
        let mut rx = emitter.subscribe();
        let id = Uuid::now_v7();

        let _ = emitter.emit(SessionEvent::stage_changed(id, SessionStage::Ready));
        let _ = emitter.emit(SessionEvent::report_stage_changed(id, ReportStage::Generating));
        let _ = emitter.emit(SessionEvent::error_raised(
            id,
            StageError {
                kind: ErrorKind::Network,
                message: "timeout".into(),
                retry_after_ms: None,
            },
        ));

        assert_eq!(rx.recv().await.unwrap().event_type(), "stage_changed");
        assert_eq!(rx.recv().await.unwrap().event_type(), "report_stage_changed");
        assert_eq!(rx.recv().await.unwrap().event_type(), "error_raised");
    }

    #[test]
    fn subscriber_count_tracks_drops() {
        let emitter = EventEmitter::new();
        assert_eq!(emitter.subscriber_count(), 0);

        let rx1 = emitter.subscribe();
        let rx2 = emitter.subscribe();
        assert_eq!(emitter.subscriber_count(), 2);

        drop(rx1);
        assert_eq!(emitter.subscriber_count(), 1);

        drop(rx2);
        assert_eq!(emitter.subscriber_count(), 0);
    }

    #[test]
    fn emit_count_increments() {
        let emitter = EventEmitter::new();
        assert_eq!(emitter.emit_count(), 0);

        let _ = emitter.emit(stage_event(SessionStage::Submitting));
        let _ = emitter.emit(stage_event(SessionStage::AwaitingResult));
        assert_eq!(emitter.emit_count(), 2);
    }

    #[test]
    fn default_starts_empty() {
        let emitter = EventEmitter::default();
        assert_eq!(emitter.subscriber_count(), 0);
        assert_eq!(emitter.emit_count(), 0);
    }
}
