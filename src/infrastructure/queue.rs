//! Bounded in-process event queue.
//!
//! Wraps a `tokio::sync::mpsc` channel so ingress can reject with a clear
//! "full" signal (mapped to `503` at the HTTP boundary) instead of blocking
//! or growing without bound.

use tokio::sync::mpsc;

use crate::domain::Event;

#[derive(Debug, thiserror::Error)]
#[error("event queue is full")]
pub struct QueueFullError;

/// Producer handle. Cheaply cloneable; every `POST /event` request gets one.
#[derive(Clone)]
pub struct EventQueue {
    sender: mpsc::Sender<Event>,
    capacity: usize,
}

/// Consumer handle held by the worker pool.
pub struct EventQueueReceiver {
    receiver: mpsc::Receiver<Event>,
}

impl EventQueue {
    #[must_use]
    pub fn bounded(capacity: usize) -> (Self, EventQueueReceiver) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender, capacity }, EventQueueReceiver { receiver })
    }

    /// Enqueue an event without waiting. Fails immediately if the queue is
    /// at capacity, letting the HTTP layer return `503` rather than stall
    /// the request.
    pub fn try_enqueue(&self, event: Event) -> Result<(), QueueFullError> {
        self.sender.try_send(event).map_err(|_| QueueFullError)?;
        metrics::gauge!("gate_queue_depth").set(self.size() as f64);
        Ok(())
    }

    /// Approximate current depth — exact at the instant of the call, but
    /// may be stale by the time a caller acts on it.
    #[must_use]
    pub fn size(&self) -> usize {
        self.capacity - self.sender.capacity()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl EventQueueReceiver {
    pub async fn recv(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventProperties, UserId};
    use chrono::Utc;
    use std::collections::HashMap;
    use uuid::Uuid;

    fn dummy_event() -> Event {
        Event::new(
            Uuid::new_v4(),
            "scam_flag",
            Utc::now(),
            EventProperties::new(UserId::new("u1"), HashMap::new()),
        )
    }

    #[test]
    fn enqueue_and_size_tracking() {
        let (queue, _rx) = EventQueue::bounded(2);
        assert_eq!(queue.size(), 0);
        queue.try_enqueue(dummy_event()).unwrap();
        assert_eq!(queue.size(), 1);
    }

    #[test]
    fn full_queue_rejects() {
        let (queue, _rx) = EventQueue::bounded(1);
        queue.try_enqueue(dummy_event()).unwrap();
        assert!(queue.try_enqueue(dummy_event()).is_err());
    }

    #[tokio::test]
    async fn receiver_drains_in_fifo_order() {
        let (queue, mut rx) = EventQueue::bounded(4);
        let first = dummy_event();
        let first_uuid = first.uuid;
        queue.try_enqueue(first).unwrap();
        queue.try_enqueue(dummy_event()).unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.uuid, first_uuid);
    }
}
