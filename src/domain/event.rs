//! Event data model.
//!
//! Events are immutable records created on ingress and never mutated. An
//! event's `name` selects which [`crate::domain::schema::EventPropertiesSchema`]
//! governs its properties; the properties themselves are a small tagged map
//! rather than a single monomorphic struct, since the set of event names (and
//! the fields each one carries) is only known at startup, not at compile time.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an authenticated user.
///
/// Wraps the raw `x-user-id` header / JSON `user_id` field verbatim. Unlike
/// the teacher's `UserId` (a UUID newtype), user identity here is an opaque
/// string supplied by the caller, so the wrapper exists purely for type
/// safety at call sites, not to generate new identities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(String);

impl UserId {
    /// Wrap a raw user identifier.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UserId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// A single property value on an event.
///
/// Event properties are either numeric (amounts) or textual (zip codes,
/// free-form tags). Aggregates read whichever shape their configured field
/// actually has.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Number(f64),
    Text(String),
}

impl PropertyValue {
    /// Whether this value counts as "present" for field-required checks.
    ///
    /// Mirrors the source's `if not val` truthiness check: a zero number or
    /// an empty string counts as absent. This is a deliberate preservation of
    /// the source's behavior (see DESIGN.md) even though it means a
    /// legitimate `amount = 0` purchase is rejected as a missing field.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Number(n) => *n != 0.0,
            Self::Text(s) => !s.is_empty(),
        }
    }

    /// Read this value as a number, if it is one.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

    /// A canonical string form, used as the dedup key for DISTINCT_COUNT.
    #[must_use]
    pub fn canonical_key(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

/// Parsed, schema-validated event properties.
///
/// Always carries `user_id`; any other fields are whatever the event's
/// schema declared as required, plus any extra fields the caller supplied.
#[derive(Debug, Clone)]
pub struct EventProperties {
    pub user_id: UserId,
    fields: HashMap<String, PropertyValue>,
}

impl EventProperties {
    #[must_use]
    pub fn new(user_id: UserId, fields: HashMap<String, PropertyValue>) -> Self {
        Self { user_id, fields }
    }

    /// Look up a named field, distinct from `user_id`.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&PropertyValue> {
        self.fields.get(name)
    }
}

/// An immutable behavioral event.
#[derive(Debug, Clone)]
pub struct Event {
    pub uuid: Uuid,
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub properties: EventProperties,
}

impl Event {
    #[must_use]
    pub fn new(uuid: Uuid, name: impl Into<String>, timestamp: DateTime<Utc>, properties: EventProperties) -> Self {
        Self {
            uuid,
            name: name.into(),
            timestamp,
            properties,
        }
    }
}
