//! Application layer — orchestration around the pure domain model.
//!
//! This is where I/O-adjacent business logic lives: the event processor
//! drives the domain stores per event, the consumer pool drains the queue
//! concurrently, the grant service owns the only `.await`-holding lock in
//! the system, and notifications are delivered (or logged) here.

pub mod consumer_pool;
pub mod event_processor;
pub mod grant_service;
pub mod notifications;

pub use consumer_pool::ConsumerPool;
pub use event_processor::{EventProcessingError, EventProcessor};
pub use grant_service::{GrantService, GrantServiceError};
pub use notifications::{LoggingNotificationsService, NotificationsService};
