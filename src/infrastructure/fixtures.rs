//! Batteries-included default declarative wiring.
//!
//! Mirrors the default `DEFAULT_*_CONFIG_DICT`s a real deployment would
//! normally replace with its own event schemas, aggregate/rule/feature
//! configs: a scam-flag message gate and a credit-card zip-ratio purchase
//! gate. A production deployment supplies its own [`DefaultDomain`]-shaped
//! wiring instead of calling [`build_default_domain`]; the shape (schemas,
//! aggregates, rules, features) stays the same.

use std::sync::Arc;

use crate::domain::{
    Aggregate, AggregateConfig, AggregateStore, AggregateType, EventPropertiesSchema, FeatureRegistry, PlatformFeature,
    Rule, RuleCondition, RuleOperation, RulesStore, SchemaRegistry,
};

/// Every read-only-after-startup store the application needs, wired
/// together and ready to share behind `Arc`s.
pub struct DefaultDomain {
    pub schema_registry: Arc<SchemaRegistry>,
    pub aggregate_store: Arc<AggregateStore>,
    pub rules_store: Arc<RulesStore>,
    pub feature_registry: Arc<FeatureRegistry>,
}

/// Build the default schema/aggregate/rule/feature wiring. Panics on
/// internal inconsistency — this is startup-time config, and a bad default
/// here is a programming error, not a runtime condition to recover from.
#[must_use]
pub fn build_default_domain() -> DefaultDomain {
    let mut schema_registry = SchemaRegistry::new();
    schema_registry
        .register(EventPropertiesSchema::new("scam_flag", vec![]))
        .expect("default schemas are registered once");
    schema_registry
        .register(EventPropertiesSchema::new("add_credit_card", vec!["zipcode".to_string()]))
        .expect("default schemas are registered once");
    schema_registry
        .register(EventPropertiesSchema::new("purchase", vec!["amount".to_string()]))
        .expect("default schemas are registered once");
    schema_registry
        .register(EventPropertiesSchema::new("chargeback", vec!["amount".to_string()]))
        .expect("default schemas are registered once");

    let mut aggregate_store = AggregateStore::new();
    aggregate_store
        .add(Aggregate::new(
            AggregateConfig::new("total_scam_flags", "scam_flag", AggregateType::Count, None)
                .expect("COUNT aggregate with no field is always valid"),
        ))
        .expect("default aggregate names are unique");
    aggregate_store
        .add(Aggregate::new(
            AggregateConfig::new(
                "credit_card_distinct_zips",
                "add_credit_card",
                AggregateType::DistinctCount,
                Some("zipcode".to_string()),
            )
            .expect("DISTINCT_COUNT aggregate with a field is always valid"),
        ))
        .expect("default aggregate names are unique");
    aggregate_store
        .add(Aggregate::new(
            AggregateConfig::new("total_credit_cards", "add_credit_card", AggregateType::Count, None)
                .expect("COUNT aggregate with no field is always valid"),
        ))
        .expect("default aggregate names are unique");
    aggregate_store
        .add(Aggregate::new(
            AggregateConfig::new("total_purchase_amount", "purchase", AggregateType::Sum, Some("amount".to_string()))
                .expect("SUM aggregate with a field is always valid"),
        ))
        .expect("default aggregate names are unique");
    aggregate_store
        .add(Aggregate::new(
            AggregateConfig::new(
                "total_chargeback_amount",
                "chargeback",
                AggregateType::Sum,
                Some("amount".to_string()),
            )
            .expect("SUM aggregate with a field is always valid"),
        ))
        .expect("default aggregate names are unique");

    let mut rules_store = RulesStore::new();
    rules_store
        .add(
            Rule::new(
                "cannot_scam_message",
                RuleOperation::Value,
                "total_scam_flags",
                None,
                RuleCondition::LessThan,
                2.0,
                None,
            )
            .expect("VALUE rule with no denominator is always valid"),
        )
        .expect("default rule names are unique");
    rules_store
        .add(
            Rule::new(
                "credit_card_zip_ratio",
                RuleOperation::Divide,
                "credit_card_distinct_zips",
                Some("total_credit_cards".to_string()),
                RuleCondition::LessThan,
                0.25,
                Some(3.0),
            )
            .expect("DIVIDE rule with a denominator is always valid"),
        )
        .expect("default rule names are unique");

    let mut feature_registry = FeatureRegistry::new();
    feature_registry
        .add(PlatformFeature::new("message", vec!["cannot_scam_message".to_string()]).expect("valid feature name"))
        .expect("default feature names are unique");
    feature_registry
        .add(PlatformFeature::new("purchase", vec!["credit_card_zip_ratio".to_string()]).expect("valid feature name"))
        .expect("default feature names are unique");

    DefaultDomain {
        schema_registry: Arc::new(schema_registry),
        aggregate_store: Arc::new(aggregate_store),
        rules_store: Arc::new(rules_store),
        feature_registry: Arc::new(feature_registry),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_domain_wires_without_panicking() {
        let domain = build_default_domain();
        assert!(domain.schema_registry.get("purchase").is_ok());
        assert_eq!(domain.aggregate_store.by_event_name("add_credit_card").len(), 2);
        assert!(domain.rules_store.by_name("cannot_scam_message").is_ok());
        assert!(domain.feature_registry.get("message").is_ok());
    }
}
