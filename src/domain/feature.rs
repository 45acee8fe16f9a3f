//! Platform feature registry.
//!
//! A [`PlatformFeature`] names a gated capability (e.g. `message`,
//! `purchase`) and the list of rules that must all pass for a user to be
//! granted it. Features are looked up by name everywhere — the registry
//! doesn't hand out identity-stable handles, since the process-lifetime
//! uniqueness of names is enough to satisfy every caller.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// A feature name must be reachable through `GET /can<feature>`, whose path
/// guard only matches `^can[a-z]{1,16}$` — so the name itself is restricted
/// to 1-16 lowercase ASCII letters.
static FEATURE_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z]{1,16}$").expect("valid regex"));

#[derive(Debug, Clone)]
pub struct PlatformFeature {
    pub name: String,
    pub rule_names: Vec<String>,
}

impl PlatformFeature {
    pub fn new(name: impl Into<String>, rule_names: Vec<String>) -> Result<Self, FeatureError> {
        let name = name.into();
        if !FEATURE_NAME.is_match(&name) {
            return Err(FeatureError::InvalidName(name));
        }
        Ok(Self { name, rule_names })
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FeatureError {
    #[error("feature '{0}' already registered")]
    DuplicateFeature(String),
    #[error("feature '{0}' not found")]
    NotFound(String),
    #[error("feature name '{0}' must be 1-16 lowercase ASCII letters")]
    InvalidName(String),
}

/// Read-only-after-startup map of feature name to [`PlatformFeature`].
#[derive(Default)]
pub struct FeatureRegistry {
    features: HashMap<String, PlatformFeature>,
}

impl FeatureRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, feature: PlatformFeature) -> Result<(), FeatureError> {
        if self.features.contains_key(&feature.name) {
            return Err(FeatureError::DuplicateFeature(feature.name));
        }
        self.features.insert(feature.name.clone(), feature);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&PlatformFeature, FeatureError> {
        self.features
            .get(name)
            .ok_or_else(|| FeatureError::NotFound(name.to_string()))
    }

    /// Every registered feature, for fan-out after an event touches an
    /// aggregate (see [`crate::application::event_processor`]).
    pub fn all(&self) -> impl Iterator<Item = &PlatformFeature> {
        self.features.values()
    }

    /// Features gated (at least in part) by `rule_name`.
    pub fn by_rule_name<'a>(&'a self, rule_name: &'a str) -> impl Iterator<Item = &'a PlatformFeature> {
        self.features
            .values()
            .filter(move |f| f.rule_names.iter().any(|r| r == rule_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_duplicate_feature_names() {
        let mut registry = FeatureRegistry::new();
        registry
            .add(PlatformFeature::new("message", vec!["cannot_scam_message".to_string()]).unwrap())
            .unwrap();
        assert_eq!(
            registry.add(PlatformFeature::new("message", vec![]).unwrap()),
            Err(FeatureError::DuplicateFeature("message".to_string()))
        );
    }

    #[test]
    fn get_missing_feature_errors() {
        let registry = FeatureRegistry::new();
        assert_eq!(
            registry.get("purchase"),
            Err(FeatureError::NotFound("purchase".to_string()))
        );
    }

    #[test]
    fn by_rule_name_filters_correctly() {
        let mut registry = FeatureRegistry::new();
        registry
            .add(PlatformFeature::new("message", vec!["cannot_scam_message".to_string()]).unwrap())
            .unwrap();
        registry
            .add(PlatformFeature::new("purchase", vec!["credit_card_zip_ratio".to_string()]).unwrap())
            .unwrap();

        let matches: Vec<_> = registry.by_rule_name("cannot_scam_message").map(|f| f.name.as_str()).collect();
        assert_eq!(matches, vec!["message"]);
    }

    #[test]
    fn rejects_names_outside_the_path_guard_alphabet() {
        assert_eq!(
            PlatformFeature::new("Message", vec![]).unwrap_err(),
            FeatureError::InvalidName("Message".to_string())
        );
        assert_eq!(
            PlatformFeature::new("a".repeat(17), vec![]).unwrap_err(),
            FeatureError::InvalidName("a".repeat(17))
        );
        assert_eq!(
            PlatformFeature::new("", vec![]).unwrap_err(),
            FeatureError::InvalidName(String::new())
        );
    }
}
