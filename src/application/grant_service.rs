//! User-feature grant service.
//!
//! Fuses four concerns behind a single lock: per-`(user, feature)` grant
//! state, a rolling access-attempt log used to compute denial rate, a
//! per-feature circuit breaker, and notification emission on state
//! transitions. The lock is `tokio::sync::Mutex` rather than
//! `std::sync::Mutex` because `grant`/`revoke` hold it across the
//! notification-send await point.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

use crate::domain::{FeatureRegistry, UserId};

use super::notifications::{NotificationKind, NotificationsService, StateChangeNotification};

/// Default width of the rolling window used for denial-rate computation,
/// used when not overridden via [`GrantService::new`].
pub const ACCESS_LOG_WINDOW: Duration = Duration::from_secs(10 * 60);
/// Default denial rate above which a feature's circuit is forced open.
pub const DENIAL_RATE_THRESHOLD: f64 = 0.05;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GrantServiceError {
    #[error("feature '{0}' is not registered")]
    UnknownFeature(String),
}

struct AccessLogEntry {
    timestamp: DateTime<Utc>,
    user_id: UserId,
    success: bool,
}

#[derive(Default)]
struct GrantState {
    grants: HashMap<UserId, HashMap<String, bool>>,
    circuits: HashMap<String, bool>,
    access_log: HashMap<String, VecDeque<AccessLogEntry>>,
    users_in_window: HashMap<String, HashSet<UserId>>,
    denied_in_window: HashMap<String, HashSet<UserId>>,
}

impl GrantState {
    /// Materialize `user_id`'s per-feature grant map from the registry
    /// snapshot taken at construction time, if this is the user's first
    /// touch. New features registered after construction never appear here
    /// — the registry is frozen after startup, by design.
    fn ensure_user(&mut self, user_id: &UserId, feature_registry: &FeatureRegistry) -> &mut HashMap<String, bool> {
        self.grants.entry(user_id.clone()).or_insert_with(|| {
            feature_registry
                .all()
                .map(|f| (f.name.clone(), true))
                .collect()
        })
    }

    /// Append an access attempt and maintain the sliding window, matching
    /// the source's presence-only set semantics verbatim: evicting one
    /// log entry for a user drops their window membership even if a later
    /// in-window entry for the same user still exists.
    fn record_access(&mut self, feature: &str, user_id: &UserId, success: bool, now: DateTime<Utc>, window: Duration) {
        let log = self.access_log.entry(feature.to_string()).or_default();
        log.push_back(AccessLogEntry {
            timestamp: now,
            user_id: user_id.clone(),
            success,
        });

        let cutoff = now - chrono::Duration::from_std(window).expect("window duration fits chrono");
        let users_in_window = self.users_in_window.entry(feature.to_string()).or_default();
        let denied_in_window = self.denied_in_window.entry(feature.to_string()).or_default();

        while log.front().is_some_and(|entry| entry.timestamp < cutoff) {
            let evicted = log.pop_front().expect("checked non-empty above");
            users_in_window.remove(&evicted.user_id);
            if !evicted.success {
                denied_in_window.remove(&evicted.user_id);
            }
        }

        users_in_window.insert(user_id.clone());
        if !success {
            denied_in_window.insert(user_id.clone());
        }
    }
}

pub struct GrantService {
    feature_registry: Arc<FeatureRegistry>,
    notifications: Arc<dyn NotificationsService>,
    state: Mutex<GrantState>,
    access_log_window: Duration,
    denial_rate_threshold: f64,
}

impl GrantService {
    /// Construct a service using the default window and denial threshold
    /// ([`ACCESS_LOG_WINDOW`], [`DENIAL_RATE_THRESHOLD`]).
    #[must_use]
    pub fn new(feature_registry: Arc<FeatureRegistry>, notifications: Arc<dyn NotificationsService>) -> Self {
        Self::with_breaker_config(feature_registry, notifications, ACCESS_LOG_WINDOW, DENIAL_RATE_THRESHOLD)
    }

    #[must_use]
    pub fn with_breaker_config(
        feature_registry: Arc<FeatureRegistry>,
        notifications: Arc<dyn NotificationsService>,
        access_log_window: Duration,
        denial_rate_threshold: f64,
    ) -> Self {
        let circuits = feature_registry.all().map(|f| (f.name.clone(), true)).collect();
        Self {
            feature_registry,
            notifications,
            state: Mutex::new(GrantState {
                circuits,
                ..GrantState::default()
            }),
            access_log_window,
            denial_rate_threshold,
        }
    }

    fn check_known(&self, feature: &str, state: &GrantState) -> Result<(), GrantServiceError> {
        if state.circuits.contains_key(feature) {
            Ok(())
        } else {
            Err(GrantServiceError::UnknownFeature(feature.to_string()))
        }
    }

    /// Set `(user_id, feature)`'s true grant state to `true`. No-op (and no
    /// notification) if already granted.
    #[tracing::instrument(skip(self), fields(user_id = %user_id, feature = %feature))]
    pub async fn grant(&self, user_id: &UserId, feature: &str) -> Result<(), GrantServiceError> {
        let mut state = self.state.lock().await;
        self.check_known(feature, &state)?;
        let grants = state.ensure_user(user_id, &self.feature_registry);
        let current = grants.get_mut(feature).expect("feature present after ensure_user");
        if *current {
            return Ok(());
        }
        *current = true;

        tracing::info!("feature access granted");
        metrics::counter!("gate_grants_total", "feature" => feature.to_string()).increment(1);
        self.notifications
            .notify(StateChangeNotification {
                uuid: Uuid::new_v4(),
                kind: NotificationKind::AccessGranted,
                timestamp: Utc::now(),
                user_id: user_id.clone(),
                feature: feature.to_string(),
            })
            .await;
        drop(state);
        Ok(())
    }

    /// Set `(user_id, feature)`'s true grant state to `false`. No-op (and no
    /// notification) if already revoked.
    #[tracing::instrument(skip(self), fields(user_id = %user_id, feature = %feature))]
    pub async fn revoke(&self, user_id: &UserId, feature: &str) -> Result<(), GrantServiceError> {
        let mut state = self.state.lock().await;
        self.check_known(feature, &state)?;
        let grants = state.ensure_user(user_id, &self.feature_registry);
        let current = grants.get_mut(feature).expect("feature present after ensure_user");
        if !*current {
            return Ok(());
        }
        *current = false;

        tracing::info!("feature access revoked");
        metrics::counter!("gate_revokes_total", "feature" => feature.to_string()).increment(1);
        self.notifications
            .notify(StateChangeNotification {
                uuid: Uuid::new_v4(),
                kind: NotificationKind::AccessRevoked,
                timestamp: Utc::now(),
                user_id: user_id.clone(),
                feature: feature.to_string(),
            })
            .await;
        drop(state);
        Ok(())
    }

    /// Whether `user_id` may currently use `feature`: the true grant state,
    /// overridden to `true` whenever the feature's circuit is open. Every
    /// call logs an access attempt against the true grant state, feeding the
    /// circuit breaker's denial-rate computation.
    pub async fn has_grant(&self, user_id: &UserId, feature: &str) -> Result<bool, GrantServiceError> {
        let mut state = self.state.lock().await;
        self.check_known(feature, &state)?;
        let true_grant = *state
            .ensure_user(user_id, &self.feature_registry)
            .get(feature)
            .expect("feature present after ensure_user");
        let open = !state.circuits.get(feature).copied().unwrap_or(true);

        state.record_access(feature, user_id, true_grant, Utc::now(), self.access_log_window);

        Ok(open || true_grant)
    }

    /// Run one circuit-breaker evaluation pass: for every feature with a
    /// non-empty window, close the circuit if its denial rate is at or
    /// below `denial_rate_threshold`, else open it. Features with no
    /// activity in the window are left untouched.
    #[tracing::instrument(skip(self))]
    pub async fn evaluate_circuit_breakers_once(&self) {
        let mut state = self.state.lock().await;
        let feature_names: Vec<String> = state.circuits.keys().cloned().collect();
        for feature in feature_names {
            let users = state.users_in_window.get(&feature).map_or(0, HashSet::len);
            if users == 0 {
                continue;
            }
            let denied = state.denied_in_window.get(&feature).map_or(0, HashSet::len);
            #[allow(clippy::cast_precision_loss)]
            let denial_rate = denied as f64 / users as f64;
            let closed = denial_rate <= self.denial_rate_threshold;
            if let Some(circuit) = state.circuits.get_mut(&feature) {
                if *circuit != closed {
                    tracing::info!(feature = %feature, denial_rate, closed, "circuit state changed");
                }
                *circuit = closed;
            }
            metrics::gauge!("gate_circuit_closed", "feature" => feature.clone()).set(if closed { 1.0 } else { 0.0 });
        }
    }

    /// Run [`Self::evaluate_circuit_breakers_once`] on a fixed interval
    /// until `shutdown` fires.
    pub async fn run_circuit_breaker_loop(self: Arc<Self>, period: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(period);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.evaluate_circuit_breakers_once().await;
                }
                _ = shutdown.changed() => {
                    tracing::info!("circuit breaker loop shutting down");
                    return;
                }
            }
        }
    }

    #[cfg(test)]
    async fn record_access_at(&self, feature: &str, user_id: &UserId, success: bool, now: DateTime<Utc>) {
        let mut state = self.state.lock().await;
        state.record_access(feature, user_id, success, now, self.access_log_window);
    }
}
