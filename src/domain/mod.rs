//! Core domain model: events, aggregates, rules, and features.
//!
//! Nothing in this module knows about HTTP, queues, or configuration — it is
//! the pure state machine that the application layer drives.

pub mod aggregate;
pub mod event;
pub mod feature;
pub mod rules;
pub mod schema;

pub use aggregate::{Aggregate, AggregateConfig, AggregateStore, AggregateStoreError, AggregateType, AggregationError};
pub use event::{Event, EventProperties, PropertyValue, UserId};
pub use feature::{FeatureError, FeatureRegistry, PlatformFeature};
pub use rules::{Rule, RuleCondition, RuleError, RuleOperation, RulesStore, RuleStoreError};
pub use schema::{EventPropertiesSchema, SchemaError, SchemaRegistry};
