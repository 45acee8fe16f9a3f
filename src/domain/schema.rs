//! Event schema registry.
//!
//! Registered once at startup (one [`EventPropertiesSchema`] per event name)
//! and read-only thereafter, the registry is what lets `POST /event` parse an
//! arbitrary JSON properties map into a validated [`EventProperties`] bag
//! without a compile-time type per event name.

use std::collections::HashMap;

use serde_json::{Map, Value};
use thiserror::Error;

use super::event::{EventProperties, PropertyValue, UserId};

/// Declares which fields an event named `event_name` must carry, beyond the
/// always-required `user_id`.
#[derive(Debug, Clone)]
pub struct EventPropertiesSchema {
    pub event_name: String,
    pub required_fields: Vec<String>,
}

impl EventPropertiesSchema {
    #[must_use]
    pub fn new(event_name: impl Into<String>, required_fields: Vec<String>) -> Self {
        Self {
            event_name: event_name.into(),
            required_fields,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("event type '{0}' is not registered")]
    EventTypeNotRegistered(String),
    #[error("event type '{0}' is already registered")]
    EventAlreadyRegistered(String),
    #[error("event_properties must be a JSON object for event type '{0}'")]
    PropertiesNotAnObject(String),
    #[error("event_properties for '{event_name}' is missing required field '{field}'")]
    MissingField { event_name: String, field: String },
    #[error("event_properties for '{event_name}' is missing 'user_id'")]
    MissingUserId { event_name: String },
}

/// Read-only-after-startup map of event name to schema.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, EventPropertiesSchema>,
}

impl SchemaRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema. Only called during startup wiring.
    pub fn register(&mut self, schema: EventPropertiesSchema) -> Result<(), SchemaError> {
        if self.schemas.contains_key(&schema.event_name) {
            return Err(SchemaError::EventAlreadyRegistered(schema.event_name));
        }
        self.schemas.insert(schema.event_name.clone(), schema);
        Ok(())
    }

    pub fn get(&self, event_name: &str) -> Result<&EventPropertiesSchema, SchemaError> {
        self.schemas
            .get(event_name)
            .ok_or_else(|| SchemaError::EventTypeNotRegistered(event_name.to_string()))
    }

    /// Validate `raw` against the schema for `event_name` and build an
    /// [`EventProperties`] bag. Extra fields beyond the schema's required set
    /// are kept (a later rule config referencing them still works), but any
    /// required field missing from `raw` is an error.
    pub fn parse_properties(
        &self,
        event_name: &str,
        raw: Map<String, Value>,
    ) -> Result<EventProperties, SchemaError> {
        let schema = self.get(event_name)?;

        let user_id = raw
            .get("user_id")
            .and_then(Value::as_str)
            .ok_or_else(|| SchemaError::MissingUserId {
                event_name: event_name.to_string(),
            })?;
        let user_id = UserId::new(user_id);

        for field in &schema.required_fields {
            if !raw.contains_key(field) {
                return Err(SchemaError::MissingField {
                    event_name: event_name.to_string(),
                    field: field.clone(),
                });
            }
        }

        let mut fields = HashMap::new();
        for (key, value) in raw {
            if key == "user_id" {
                continue;
            }
            if let Some(property) = to_property_value(&value) {
                fields.insert(key, property);
            }
        }

        Ok(EventProperties::new(user_id, fields))
    }
}

fn to_property_value(value: &Value) -> Option<PropertyValue> {
    match value {
        Value::Number(n) => n.as_f64().map(PropertyValue::Number),
        Value::String(s) => Some(PropertyValue::Text(s.clone())),
        _ => None,
    }
}
