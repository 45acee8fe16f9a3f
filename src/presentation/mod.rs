//! Presentation layer — HTTP routes and handlers.
//!
//! Handlers parse requests, call into the application/domain layers, and
//! format responses. No business logic lives here — if a handler grows
//! complex, that logic belongs in [`crate::application`].

pub mod error;
pub mod events;
pub mod features;
pub mod metrics;
pub mod status;

pub use error::{AppError, ErrorResponse};
pub use events::{EventsState, post_event};
pub use features::{FeaturesState, can_feature};
pub use metrics::{MetricsState, metrics_handler};

use axum::Router;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Compose the application router from all feature routers.
///
/// # Middleware stack (outermost first)
///
/// 1. `SetRequestIdLayer` — generates a UUID v4 request ID (or preserves an
///    existing one)
/// 2. `TraceLayer` — creates a tracing span per request with method, path,
///    and request ID
/// 3. `PropagateRequestIdLayer` — copies the request ID to the response
pub fn app_router(state: AppState) -> Router {
    let x_request_id = http::HeaderName::from_static("x-request-id");

    Router::new()
        .merge(status::routes())
        .merge(events::routes())
        .merge(features::routes())
        .merge(metrics::routes())
        .with_state(state)
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &http::Request<axum::body::Body>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http.request",
                    http.request.method = %request.method(),
                    url.path = %request.uri().path(),
                    request_id = %request_id,
                )
            },
        ))
        .layer(SetRequestIdLayer::new(x_request_id, tower_http::request_id::MakeRequestUuid))
}
