//! Infrastructure layer — the in-process event queue and the default
//! declarative wiring (event schemas, aggregate/rule/feature configs) the
//! service boots with.
//!
//! There is no persistence here: this service keeps no state across process
//! restarts, by design (§6 of the design notes).

pub mod fixtures;
pub mod queue;

pub use fixtures::build_default_domain;
pub use queue::{EventQueue, EventQueueReceiver, QueueFullError};
