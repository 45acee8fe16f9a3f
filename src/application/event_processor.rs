//! Event processor: stitches the aggregate store, rule store, feature
//! registry, and grant service together for each event.
//!
//! Two-pass algorithm (see [`EventProcessor::process_event`]): the first
//! pass updates touched aggregates and collects the rules that could have
//! changed verdict; the second pass re-evaluates, per candidate feature, its
//! *entire* rule list (AND semantics) and grants or revokes accordingly.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;

use crate::domain::{AggregateStore, Event, FeatureRegistry, RulesStore};

use super::grant_service::{GrantService, GrantServiceError};

#[derive(Debug, Error)]
pub enum EventProcessingError {
    #[error("aggregate update failed: {0}")]
    Aggregation(#[from] crate::domain::AggregationError),
    #[error("rule evaluation failed: {0}")]
    Rule(#[from] crate::domain::RuleError),
    #[error("grant service failed: {0}")]
    GrantService(#[from] GrantServiceError),
}

pub struct EventProcessor {
    aggregate_store: Arc<AggregateStore>,
    rules_store: Arc<RulesStore>,
    feature_registry: Arc<FeatureRegistry>,
    grant_service: Arc<GrantService>,
}

impl EventProcessor {
    #[must_use]
    pub fn new(
        aggregate_store: Arc<AggregateStore>,
        rules_store: Arc<RulesStore>,
        feature_registry: Arc<FeatureRegistry>,
        grant_service: Arc<GrantService>,
    ) -> Self {
        Self {
            aggregate_store,
            rules_store,
            feature_registry,
            grant_service,
        }
    }

    /// Process a single event. On error the event is dropped by the caller
    /// (see [`crate::application::consumer_pool`]) — aggregate mutations
    /// already applied by this call are not rolled back.
    #[tracing::instrument(skip(self, event), fields(event_name = %event.name, event_uuid = %event.uuid))]
    pub async fn process_event(&self, event: &Event) -> Result<(), EventProcessingError> {
        let affected = self.aggregate_store.by_event_name(&event.name);
        if affected.is_empty() {
            return Ok(());
        }

        let user_id = event.properties.user_id.clone();
        let mut candidate_rules = HashSet::new();
        for aggregate in affected {
            aggregate.update(&user_id, event)?;
            for rule in self.rules_store.by_aggregate(aggregate.name()) {
                candidate_rules.insert(rule.name.clone());
            }
        }

        let mut failing_rules = HashSet::new();
        for rule_name in &candidate_rules {
            let Ok(rule) = self.rules_store.by_name(rule_name) else {
                continue;
            };
            if !rule.abides(&self.aggregate_store, &user_id)? {
                failing_rules.insert(rule_name.clone());
            }
        }

        let mut candidate_features = HashSet::new();
        for rule_name in &failing_rules {
            for feature in self.feature_registry.by_rule_name(rule_name) {
                candidate_features.insert(feature.name.clone());
            }
        }

        for feature_name in candidate_features {
            let feature = self
                .feature_registry
                .get(&feature_name)
                .expect("feature name came from the registry itself");

            let mut abides_all = true;
            for rule_name in &feature.rule_names {
                let rule = self
                    .rules_store
                    .by_name(rule_name)
                    .expect("feature configs reference only rules validated at startup");
                if !rule.abides(&self.aggregate_store, &user_id)? {
                    abides_all = false;
                    break;
                }
            }

            if abides_all {
                self.grant_service.grant(&user_id, &feature_name).await?;
            } else {
                self.grant_service.revoke(&user_id, &feature_name).await?;
            }
        }

        Ok(())
    }
}
