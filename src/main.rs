//! Feature-gate service entry point.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::sync::watch;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use feature_gate::application::{ConsumerPool, EventProcessor, GrantService, LoggingNotificationsService};
use feature_gate::config::Config;
use feature_gate::infrastructure::{build_default_domain, EventQueue};
use feature_gate::presentation::app_router;
use feature_gate::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "feature_gate=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    tracing::info!(port = config.port, num_consumers = config.num_consumers, "starting feature-gate");

    let domain = build_default_domain();
    let notifications = Arc::new(LoggingNotificationsService);
    let grant_service = Arc::new(GrantService::with_breaker_config(
        domain.feature_registry.clone(),
        notifications,
        config.breaker_window,
        config.breaker_denial_threshold,
    ));

    let processor = Arc::new(EventProcessor::new(
        domain.aggregate_store.clone(),
        domain.rules_store.clone(),
        domain.feature_registry.clone(),
        grant_service.clone(),
    ));

    let (queue, receiver) = EventQueue::bounded(config.queue_capacity);
    let consumer_pool = ConsumerPool::spawn(config.num_consumers, receiver, processor);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let breaker_handle = tokio::spawn(
        grant_service
            .clone()
            .run_circuit_breaker_loop(config.breaker_period, shutdown_rx),
    );

    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    let state = AppState {
        schema_registry: domain.schema_registry,
        feature_registry: domain.feature_registry,
        grant_service,
        queue,
        prometheus_handle,
    };

    let app = app_router(state);
    let listener = tokio::net::TcpListener::bind(config.socket_addr())
        .await
        .expect("failed to bind HTTP listener");

    tracing::info!(addr = %config.socket_addr(), "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("HTTP server stopped, draining event queue");
    consumer_pool.join().await;

    let _ = shutdown_tx.send(true);
    if let Err(error) = breaker_handle.await {
        tracing::warn!(%error, "circuit breaker loop task panicked");
    }

    tracing::info!("shutdown complete");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.expect("failed to listen for ctrl_c");
}
