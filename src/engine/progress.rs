//! Notification channel: event sink, event stream and the registered-sink slot

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tracing::trace;

use crate::domain::model::ChannelEvent;

/// Sending half of the notification channel
#[derive(Clone, Debug)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<ChannelEvent>,
}

impl EventSink {
    /// Create a connected sink and stream
    pub fn channel() -> (EventSink, EventStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (EventSink { tx }, EventStream { rx })
    }

    pub fn send(&self, event: ChannelEvent) {
        if self.tx.send(event).is_err() {
            trace!("Event stream dropped; discarding event");
        }
    }
}

/// Receiving half of the notification channel
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<ChannelEvent>,
}

impl EventStream {
    /// Next event; `None` once the sink was replaced or cleared
    pub async fn next(&mut self) -> Option<ChannelEvent> {
        self.rx.recv().await
    }

    /// Next event if one is already queued
    pub fn try_next(&mut self) -> Option<ChannelEvent> {
        self.rx.try_recv().ok()
    }

    /// All events queued right now
    pub fn drain(&mut self) -> Vec<ChannelEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.try_next() {
            events.push(event);
        }
        events
    }
}

/// The currently registered sink, if any
#[derive(Clone, Default)]
pub struct SinkSlot {
    inner: Arc<Mutex<Option<EventSink>>>,
}

impl SinkSlot {
    /// Register `sink`, dropping any previous one
    pub fn replace(&self, sink: EventSink) {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = Some(sink);
    }

    pub fn clear(&self) {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    /// Deliver `event` to the registered sink; dropped when none is registered
    pub fn emit(&self, event: ChannelEvent) {
        match self.inner.lock().unwrap_or_else(PoisonError::into_inner).as_ref() {
            Some(sink) => sink.send(event),
            None => trace!(?event, "No listener registered; dropping event"),
        }
    }

    pub fn is_registered(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::ErrorCode;

    #[test]
    fn test_slot_drops_events_without_listener() {
        let slot = SinkSlot::default();
        slot.emit(ChannelEvent::Progress { value: 0.5 });
        assert!(!slot.is_registered());
    }

    #[test]
    fn test_replacing_sink_closes_previous_stream() {
        let slot = SinkSlot::default();
        let (first, mut first_stream) = EventSink::channel();
        let (second, mut second_stream) = EventSink::channel();

        slot.replace(first);
        slot.emit(ChannelEvent::Progress { value: 0.1 });
        slot.replace(second);
        slot.emit(ChannelEvent::Progress { value: 0.2 });

        assert_eq!(first_stream.drain(), vec![ChannelEvent::Progress { value: 0.1 }]);
        assert!(first_stream.try_next().is_none());
        assert_eq!(second_stream.try_next(), Some(ChannelEvent::Progress { value: 0.2 }));
    }

    #[test]
    fn test_sink_error_event() {
        let (sink, mut stream) = EventSink::channel();
        let event = ChannelEvent::Error {
            code: ErrorCode::ProcessingFailed,
            message: "boom".to_string(),
        };
        sink.send(event.clone());
        assert_eq!(stream.try_next(), Some(event));

        drop(stream);
        sink.send(ChannelEvent::Progress { value: 0.5 });
    }
}
