//! Fan-out of session events to subscribers.

use std::sync::{Mutex, PoisonError};

use futures_channel::mpsc;
use steamsesh_ports::SessionEvent;

/// Unbounded broadcast to any number of subscribers. Receivers that have been
/// dropped are pruned on the next publish.
#[derive(Default)]
pub(crate) struct EventHub {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<SessionEvent>>>,
}

impl EventHub {
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<SessionEvent> {
        let (tx, rx) = mpsc::unbounded();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Never blocks and never calls back into subscriber code, so it is safe
    /// to call with the coordinator state locked.
    pub fn publish(&self, events: impl IntoIterator<Item = SessionEvent>) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for event in events {
            tracing::debug!(event = ?event, "Publishing session event");
            subscribers.retain(|tx| tx.unbounded_send(event.clone()).is_ok());
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
