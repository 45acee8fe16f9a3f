//! Rule evaluation over aggregate values.
//!
//! A [`Rule`] reads one or two named aggregates for a user, combines them
//! per its [`RuleOperation`], and compares the result against a threshold
//! with its [`RuleCondition`]. A feature is granted only while every rule
//! attached to it passes (AND semantics, enforced by the caller —
//! [`crate::application::event_processor`]).

use std::collections::HashMap;

use thiserror::Error;

use super::aggregate::AggregateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOperation {
    /// Read a single aggregate's value directly.
    Value,
    /// Divide one aggregate's value by another's.
    Divide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleCondition {
    LessThan,
    GreaterThan,
}

impl RuleCondition {
    fn evaluate(self, value: f64, threshold: f64) -> bool {
        match self {
            Self::LessThan => value < threshold,
            Self::GreaterThan => value > threshold,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleConfigError {
    #[error("rule '{0}' uses DIVIDE but has no denominator aggregate")]
    DivideRequiresDenominator(String),
    #[error("rule '{0}' uses VALUE but specifies a denominator aggregate")]
    ValueForbidsDenominator(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("aggregate '{0}' referenced by a rule is not registered")]
    UnknownAggregate(String),
}

/// A single gating condition: `numerator [/ denominator] <op> threshold`.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub operation: RuleOperation,
    pub numerator_aggregate: String,
    pub denominator_aggregate: Option<String>,
    pub condition: RuleCondition,
    pub threshold: f64,
    /// Minimum denominator value below which the rule evaluates to `0.0`
    /// instead of dividing (guards against small-sample noise, e.g. a user
    /// with one credit card and one mismatched zip looking like 100% fraud).
    pub denom_min: Option<f64>,
}

impl Rule {
    pub fn new(
        name: impl Into<String>,
        operation: RuleOperation,
        numerator_aggregate: impl Into<String>,
        denominator_aggregate: Option<String>,
        condition: RuleCondition,
        threshold: f64,
        denom_min: Option<f64>,
    ) -> Result<Self, RuleConfigError> {
        let name = name.into();
        match (operation, &denominator_aggregate) {
            (RuleOperation::Divide, None) => {
                return Err(RuleConfigError::DivideRequiresDenominator(name));
            }
            (RuleOperation::Value, Some(_)) => {
                return Err(RuleConfigError::ValueForbidsDenominator(name));
            }
            _ => {}
        }
        Ok(Self {
            name,
            operation,
            numerator_aggregate: numerator_aggregate.into(),
            denominator_aggregate,
            condition,
            threshold,
            denom_min,
        })
    }

    /// Compute `(value, override)` for `user_id`. `override` is set when
    /// `denom_min` vetoes a DIVIDE rule's small-sample denominator — the
    /// caller treats that as an automatic pass regardless of `value`.
    fn evaluate(
        &self,
        store: &AggregateStore,
        user_id: &super::event::UserId,
    ) -> Result<(f64, bool), RuleError> {
        let numerator = store
            .by_name(&self.numerator_aggregate)
            .map_err(|_| RuleError::UnknownAggregate(self.numerator_aggregate.clone()))?
            .read(user_id);

        match self.operation {
            RuleOperation::Value => Ok((numerator, false)),
            RuleOperation::Divide => {
                let denom_name = self
                    .denominator_aggregate
                    .as_ref()
                    .expect("DIVIDE rules always have a denominator by construction");
                let denominator = store
                    .by_name(denom_name)
                    .map_err(|_| RuleError::UnknownAggregate(denom_name.clone()))?
                    .read(user_id);

                if self.denom_min.is_some_and(|min| denominator < min) {
                    return Ok((0.0, true));
                }
                let value = if denominator == 0.0 {
                    0.0
                } else {
                    numerator / denominator
                };
                Ok((value, false))
            }
        }
    }

    /// Whether `user_id` is within this rule's allowed threshold.
    ///
    /// A `denom_min` override always abides, independent of `condition`.
    pub fn abides(&self, store: &AggregateStore, user_id: &super::event::UserId) -> Result<bool, RuleError> {
        let (value, overridden) = self.evaluate(store, user_id)?;
        if overridden {
            return Ok(true);
        }
        Ok(self.condition.evaluate(value, self.threshold))
    }
}

/// Read-only-after-startup map of rule name to [`Rule`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleStoreError {
    #[error("rule '{0}' already exists")]
    DuplicateRule(String),
    #[error("rule '{0}' not found")]
    NotFound(String),
}

/// Owns every configured [`Rule`], indexed by name and by the aggregate
/// names it reads (so the processor can fetch only the rules an event's
/// aggregate updates could have affected).
#[derive(Default)]
pub struct RulesStore {
    by_name: HashMap<String, std::sync::Arc<Rule>>,
    by_aggregate: HashMap<String, Vec<std::sync::Arc<Rule>>>,
}

impl RulesStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, rule: Rule) -> Result<(), RuleStoreError> {
        if self.by_name.contains_key(&rule.name) {
            return Err(RuleStoreError::DuplicateRule(rule.name.clone()));
        }
        let denominator = rule.denominator_aggregate.clone();
        let numerator = rule.numerator_aggregate.clone();
        let rule = std::sync::Arc::new(rule);
        self.by_name.insert(rule.name.clone(), rule.clone());
        self.by_aggregate.entry(numerator).or_default().push(rule.clone());
        if let Some(denominator) = denominator {
            self.by_aggregate.entry(denominator).or_default().push(rule);
        }
        Ok(())
    }

    pub fn by_name(&self, name: &str) -> Result<std::sync::Arc<Rule>, RuleStoreError> {
        self.by_name
            .get(name)
            .cloned()
            .ok_or_else(|| RuleStoreError::NotFound(name.to_string()))
    }

    #[must_use]
    pub fn by_aggregate(&self, aggregate_name: &str) -> &[std::sync::Arc<Rule>] {
        self.by_aggregate.get(aggregate_name).map_or(&[], Vec::as_slice)
    }
}
