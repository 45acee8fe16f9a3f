//! Fixed-size worker pool draining the event queue.
//!
//! Workers provide per-worker FIFO, not global FIFO: events for the same
//! user delivered to different workers may be processed out of order
//! relative to each other. Correctness therefore depends on every aggregate
//! and grant mutation being individually atomic (see
//! [`crate::domain::aggregate`] and [`crate::application::grant_service`]).

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::infrastructure::queue::EventQueueReceiver;

use super::event_processor::EventProcessor;

pub struct ConsumerPool {
    workers: Vec<JoinHandle<()>>,
}

impl ConsumerPool {
    /// Spawn `num_workers` tasks sharing `receiver`, each pulling events and
    /// handing them to `processor`. A worker exits cleanly once the queue is
    /// closed and drained — shutdown is driven by closing the producer side
    /// (see [`crate::infrastructure::queue::EventQueue`]), not by cancelling
    /// workers mid-event, so in-flight and already-queued events are always
    /// processed before the pool stops.
    pub fn spawn(num_workers: usize, receiver: EventQueueReceiver, processor: Arc<EventProcessor>) -> Self {
        let receiver = Arc::new(Mutex::new(receiver));
        let workers = (0..num_workers)
            .map(|worker_id| {
                let receiver = receiver.clone();
                let processor = processor.clone();
                tokio::spawn(async move {
                    loop {
                        let next = receiver.lock().await.recv().await;
                        let Some(event) = next else {
                            tracing::info!(worker_id, "consumer worker shutting down: queue drained");
                            return;
                        };
                        match processor.process_event(&event).await {
                            Ok(()) => metrics::counter!("gate_events_processed_total").increment(1),
                            Err(error) => {
                                tracing::error!(worker_id, %error, event_uuid = %event.uuid, "dropping event");
                                metrics::counter!("gate_events_dropped_total").increment(1);
                            }
                        }
                    }
                })
            })
            .collect();

        Self { workers }
    }

    /// Wait for every worker to exit. Cancellation (a dropped sender or
    /// closed channel) is a normal exit, not an error.
    pub async fn join(self) {
        for worker in self.workers {
            if let Err(error) = worker.await {
                tracing::warn!(%error, "consumer worker panicked");
            }
        }
    }
}
