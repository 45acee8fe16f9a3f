//! Application state shared across HTTP handlers.
//!
//! `AppState` holds every dependency a handler might need; handlers extract
//! only the subset they use via `FromRef`, so e.g. the `/metrics` handler
//! never has to know about the grant service.

use std::sync::Arc;

use axum::extract::FromRef;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::application::GrantService;
use crate::domain::{FeatureRegistry, SchemaRegistry};
use crate::infrastructure::EventQueue;
use crate::presentation::events::EventsState;
use crate::presentation::features::FeaturesState;
use crate::presentation::metrics::MetricsState;

#[derive(Clone)]
pub struct AppState {
    pub schema_registry: Arc<SchemaRegistry>,
    pub feature_registry: Arc<FeatureRegistry>,
    pub grant_service: Arc<GrantService>,
    pub queue: EventQueue,
    pub prometheus_handle: PrometheusHandle,
}

impl FromRef<AppState> for EventsState {
    fn from_ref(state: &AppState) -> Self {
        EventsState {
            schema_registry: state.schema_registry.clone(),
            queue: state.queue.clone(),
        }
    }
}

impl FromRef<AppState> for FeaturesState {
    fn from_ref(state: &AppState) -> Self {
        FeaturesState {
            feature_registry: state.feature_registry.clone(),
            grant_service: state.grant_service.clone(),
        }
    }
}

impl FromRef<AppState> for MetricsState {
    fn from_ref(state: &AppState) -> Self {
        MetricsState {
            prometheus_handle: state.prometheus_handle.clone(),
        }
    }
}

impl FromRef<AppState> for EventQueue {
    fn from_ref(state: &AppState) -> Self {
        state.queue.clone()
    }
}
