//! Per-user aggregates over event streams.
//!
//! An [`Aggregate`] owns one accumulator per user. All three kinds
//! (`COUNT`, `DISTINCT_COUNT`, `SUM`) key their updates by `event.uuid` so
//! that accidental duplicate delivery is idempotent — `DISTINCT_COUNT` gets
//! this for free from set semantics, `COUNT` and `SUM` need to track uuids
//! explicitly.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use thiserror::Error;
use uuid::Uuid;

use super::event::{Event, PropertyValue, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateType {
    Count,
    DistinctCount,
    Sum,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AggregateConfigError {
    #[error("field is not allowed for COUNT aggregate '{0}'")]
    CountForbidsField(String),
    #[error("field is required for {kind:?} aggregate '{name}'")]
    FieldRequired { name: String, kind: AggregateType },
}

/// Declarative description of an aggregate, validated at construction.
#[derive(Debug, Clone)]
pub struct AggregateConfig {
    pub name: String,
    pub event_name: String,
    pub agg_type: AggregateType,
    pub field: Option<String>,
}

impl AggregateConfig {
    pub fn new(
        name: impl Into<String>,
        event_name: impl Into<String>,
        agg_type: AggregateType,
        field: Option<String>,
    ) -> Result<Self, AggregateConfigError> {
        let name = name.into();
        match (agg_type, &field) {
            (AggregateType::Count, Some(_)) => {
                return Err(AggregateConfigError::CountForbidsField(name));
            }
            (AggregateType::DistinctCount | AggregateType::Sum, None) => {
                return Err(AggregateConfigError::FieldRequired {
                    name,
                    kind: agg_type,
                });
            }
            _ => {}
        }
        Ok(Self {
            name,
            event_name: event_name.into(),
            agg_type,
            field,
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AggregationError {
    #[error("field '{field}' not found (or falsy) in properties for event '{event_name}'")]
    MissingField { event_name: String, field: String },
}

/// A hashable canonical key used to deduplicate DISTINCT_COUNT values. Plain
/// floats aren't `Hash`/`Eq`, so numeric values are stored by bit pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum DistinctKey {
    Text(String),
    NumberBits(u64),
}

impl From<&PropertyValue> for DistinctKey {
    fn from(value: &PropertyValue) -> Self {
        match value {
            PropertyValue::Text(s) => Self::Text(s.clone()),
            PropertyValue::Number(n) => Self::NumberBits(n.to_bits()),
        }
    }
}

enum Accumulator {
    Count(HashSet<Uuid>),
    DistinctCount(HashSet<DistinctKey>),
    Sum(HashMap<Uuid, f64>),
}

impl Accumulator {
    fn new(agg_type: AggregateType) -> Self {
        match agg_type {
            AggregateType::Count => Self::Count(HashSet::new()),
            AggregateType::DistinctCount => Self::DistinctCount(HashSet::new()),
            AggregateType::Sum => Self::Sum(HashMap::new()),
        }
    }

    fn value(&self) -> f64 {
        match self {
            Self::Count(set) => set.len() as f64,
            Self::DistinctCount(set) => set.len() as f64,
            Self::Sum(map) => map.values().sum(),
        }
    }
}

/// Runtime instance of an [`AggregateConfig`], owning a per-user accumulator.
pub struct Aggregate {
    config: AggregateConfig,
    store: Mutex<HashMap<UserId, Accumulator>>,
}

impl Aggregate {
    #[must_use]
    pub fn new(config: AggregateConfig) -> Self {
        Self {
            config,
            store: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    #[must_use]
    pub fn event_name(&self) -> &str {
        &self.config.event_name
    }

    /// Update this aggregate for `user_id` from `event`. Idempotent per
    /// `event.uuid` for COUNT and SUM; DISTINCT_COUNT is idempotent by
    /// virtue of storing a value set.
    pub fn update(&self, user_id: &UserId, event: &Event) -> Result<(), AggregationError> {
        let agg_type = self.config.agg_type;
        let mut store = self.store.lock().expect("aggregate lock poisoned");
        let accumulator = store
            .entry(user_id.clone())
            .or_insert_with(|| Accumulator::new(agg_type));

        match accumulator {
            Accumulator::Count(uuids) => {
                uuids.insert(event.uuid);
            }
            Accumulator::Sum(values) => {
                let field = self.required_field();
                let value = self.read_required_field(event, field)?;
                values.entry(event.uuid).or_insert(value);
            }
            Accumulator::DistinctCount(keys) => {
                let field = self.required_field();
                let raw = self.read_raw_field(event, field)?;
                keys.insert(DistinctKey::from(raw));
            }
        }
        Ok(())
    }

    /// Current value for `user_id`, or `0.0` if the user has never been
    /// observed by this aggregate.
    #[must_use]
    pub fn read(&self, user_id: &UserId) -> f64 {
        let store = self.store.lock().expect("aggregate lock poisoned");
        store.get(user_id).map_or(0.0, Accumulator::value)
    }

    fn required_field(&self) -> &str {
        self.config
            .field
            .as_deref()
            .expect("SUM/DISTINCT_COUNT aggregates always have a field by construction")
    }

    fn read_raw_field<'e>(
        &self,
        event: &'e Event,
        field: &str,
    ) -> Result<&'e PropertyValue, AggregationError> {
        event
            .properties
            .field(field)
            .filter(|v| v.is_truthy())
            .ok_or_else(|| AggregationError::MissingField {
                event_name: event.name.clone(),
                field: field.to_string(),
            })
    }

    fn read_required_field(&self, event: &Event, field: &str) -> Result<f64, AggregationError> {
        let value = self.read_raw_field(event, field)?;
        value.as_number().ok_or_else(|| AggregationError::MissingField {
            event_name: event.name.clone(),
            field: field.to_string(),
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AggregateStoreError {
    #[error("aggregate '{0}' already exists")]
    DuplicateAggregate(String),
    #[error("aggregate '{0}' not found")]
    NotFound(String),
}

/// Owns every configured [`Aggregate`], indexed by name and by the event
/// name that feeds it.
#[derive(Default)]
pub struct AggregateStore {
    by_name: HashMap<String, std::sync::Arc<Aggregate>>,
    by_event_name: HashMap<String, Vec<std::sync::Arc<Aggregate>>>,
}

impl AggregateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an aggregate. Only called during startup.
    pub fn add(&mut self, aggregate: Aggregate) -> Result<(), AggregateStoreError> {
        if self.by_name.contains_key(aggregate.name()) {
            return Err(AggregateStoreError::DuplicateAggregate(
                aggregate.name().to_string(),
            ));
        }
        let aggregate = std::sync::Arc::new(aggregate);
        self.by_name
            .insert(aggregate.name().to_string(), aggregate.clone());
        self.by_event_name
            .entry(aggregate.event_name().to_string())
            .or_default()
            .push(aggregate);
        Ok(())
    }

    #[must_use]
    pub fn by_event_name(&self, event_name: &str) -> &[std::sync::Arc<Aggregate>] {
        self.by_event_name
            .get(event_name)
            .map_or(&[], Vec::as_slice)
    }

    pub fn by_name(&self, name: &str) -> Result<std::sync::Arc<Aggregate>, AggregateStoreError> {
        self.by_name
            .get(name)
            .cloned()
            .ok_or_else(|| AggregateStoreError::NotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap as StdHashMap;

    fn event(uuid: Uuid, name: &str, user_id: &str, fields: Vec<(&str, PropertyValue)>) -> Event {
        let mut map = StdHashMap::new();
        for (k, v) in fields {
            map.insert(k.to_string(), v);
        }
        Event::new(
            uuid,
            name,
            Utc::now(),
            super::super::event::EventProperties::new(UserId::new(user_id), map),
        )
    }

    #[test]
    fn count_aggregate_config_forbids_field() {
        let err =
            AggregateConfig::new("c", "e", AggregateType::Count, Some("f".to_string())).unwrap_err();
        assert_eq!(err, AggregateConfigError::CountForbidsField("c".to_string()));
    }

    #[test]
    fn sum_aggregate_config_requires_field() {
        let err = AggregateConfig::new("s", "e", AggregateType::Sum, None).unwrap_err();
        assert_eq!(
            err,
            AggregateConfigError::FieldRequired {
                name: "s".to_string(),
                kind: AggregateType::Sum
            }
        );
    }

    #[test]
    fn count_is_idempotent_per_uuid() {
        let config = AggregateConfig::new("total_scam_flags", "scam_flag", AggregateType::Count, None)
            .unwrap();
        let agg = Aggregate::new(config);
        let user = UserId::new("user_a");
        let uuid = Uuid::new_v4();
        let e = event(uuid, "scam_flag", "user_a", vec![]);

        agg.update(&user, &e).unwrap();
        agg.update(&user, &e).unwrap();
        assert_eq!(agg.read(&user), 1.0);

        let e2 = event(Uuid::new_v4(), "scam_flag", "user_a", vec![]);
        agg.update(&user, &e2).unwrap();
        assert_eq!(agg.read(&user), 2.0);
    }

    #[test]
    fn sum_is_idempotent_per_uuid() {
        let config =
            AggregateConfig::new("total_purchase_amount", "purchase", AggregateType::Sum, Some("amount".into()))
                .unwrap();
        let agg = Aggregate::new(config);
        let user = UserId::new("user_b");
        let uuid = Uuid::new_v4();
        let e = event(uuid, "purchase", "user_b", vec![("amount", PropertyValue::Number(50.0))]);

        agg.update(&user, &e).unwrap();
        agg.update(&user, &e).unwrap();
        assert_eq!(agg.read(&user), 50.0);
    }

    #[test]
    fn distinct_count_dedupes_values() {
        let config = AggregateConfig::new(
            "credit_card_distinct_zips",
            "add_credit_card",
            AggregateType::DistinctCount,
            Some("zipcode".into()),
        )
        .unwrap();
        let agg = Aggregate::new(config);
        let user = UserId::new("user_c");

        for zip in ["10001", "20002", "10001"] {
            let e = event(
                Uuid::new_v4(),
                "add_credit_card",
                "user_c",
                vec![("zipcode", PropertyValue::Text(zip.to_string()))],
            );
            agg.update(&user, &e).unwrap();
        }
        assert_eq!(agg.read(&user), 2.0);
    }

    #[test]
    fn sum_missing_field_errors_and_zero_is_falsy() {
        let config =
            AggregateConfig::new("total_purchase_amount", "purchase", AggregateType::Sum, Some("amount".into()))
                .unwrap();
        let agg = Aggregate::new(config);
        let user = UserId::new("user_d");

        let missing = event(Uuid::new_v4(), "purchase", "user_d", vec![]);
        assert!(agg.update(&user, &missing).is_err());

        let zero = event(
            Uuid::new_v4(),
            "purchase",
            "user_d",
            vec![("amount", PropertyValue::Number(0.0))],
        );
        assert!(agg.update(&user, &zero).is_err());
    }

    #[test]
    fn unknown_user_reads_as_zero() {
        let config = AggregateConfig::new("total_scam_flags", "scam_flag", AggregateType::Count, None)
            .unwrap();
        let agg = Aggregate::new(config);
        assert_eq!(agg.read(&UserId::new("ghost")), 0.0);
    }

    #[test]
    fn store_rejects_duplicate_names() {
        let mut store = AggregateStore::new();
        let config = AggregateConfig::new("a", "e", AggregateType::Count, None).unwrap();
        store.add(Aggregate::new(config)).unwrap();
        let config2 = AggregateConfig::new("a", "e2", AggregateType::Count, None).unwrap();
        assert_eq!(
            store.add(Aggregate::new(config2)),
            Err(AggregateStoreError::DuplicateAggregate("a".to_string()))
        );
    }

    #[test]
    fn store_indexes_by_event_name() {
        let mut store = AggregateStore::new();
        let zips = AggregateConfig::new(
            "credit_card_distinct_zips",
            "add_credit_card",
            AggregateType::DistinctCount,
            Some("zipcode".into()),
        )
        .unwrap();
        let total = AggregateConfig::new("total_credit_cards", "add_credit_card", AggregateType::Count, None)
            .unwrap();
        store.add(Aggregate::new(zips)).unwrap();
        store.add(Aggregate::new(total)).unwrap();

        assert_eq!(store.by_event_name("add_credit_card").len(), 2);
        assert!(store.by_event_name("unknown_event").is_empty());
        assert!(store.by_name("total_credit_cards").is_ok());
        assert_eq!(
            store.by_name("nope"),
            Err(AggregateStoreError::NotFound("nope".to_string()))
        );
    }
}
