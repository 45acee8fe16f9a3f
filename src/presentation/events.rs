//! `POST /event` ingress.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::domain::{Event, SchemaRegistry};
use crate::infrastructure::EventQueue;
use crate::state::AppState;

use super::error::AppError;

#[derive(Clone)]
pub struct EventsState {
    pub schema_registry: Arc<SchemaRegistry>,
    pub queue: EventQueue,
}

#[derive(Debug, Deserialize)]
pub struct IncomingEvent {
    pub uuid: Uuid,
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub event_properties: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct EventAccepted {
    pub event_id: Uuid,
}

/// `POST /event` — validate and enqueue a behavioral event.
///
/// `400` if `name` is not registered or `event_properties` fails schema
/// validation (including not being a JSON object); `503` if the queue is
/// full.
#[instrument(name = "handler.events.post_event", skip(state, body), fields(event_name = %body.name))]
pub async fn post_event(
    State(state): State<EventsState>,
    Json(body): Json<IncomingEvent>,
) -> Result<impl IntoResponse, AppError> {
    let properties_map = body
        .event_properties
        .as_object()
        .cloned()
        .ok_or_else(|| AppError::validation(format!("event_properties must be a JSON object for '{}'", body.name)))?;

    let properties = state.schema_registry.parse_properties(&body.name, properties_map)?;
    let event = Event::new(body.uuid, body.name, body.timestamp, properties);
    let event_id = event.uuid;

    state
        .queue
        .try_enqueue(event)
        .map_err(|_| AppError::service_unavailable("event queue is full"))?;

    Ok((StatusCode::OK, Json(EventAccepted { event_id })))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/event", post(post_event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EventPropertiesSchema;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::json;
    use tower::ServiceExt;

    fn test_router() -> Router {
        let mut registry = SchemaRegistry::new();
        registry
            .register(EventPropertiesSchema::new("scam_flag", vec![]))
            .unwrap();
        let (queue, _rx) = EventQueue::bounded(4);
        let state = EventsState {
            schema_registry: Arc::new(registry),
            queue,
        };
        Router::new().route("/event", post(post_event)).with_state(state)
    }

    #[tokio::test]
    async fn accepts_valid_event() {
        let app = test_router();
        let body = json!({
            "uuid": Uuid::new_v4(),
            "name": "scam_flag",
            "timestamp": Utc::now(),
            "event_properties": {"user_id": "u1"},
        });
        let response = app
            .oneshot(
                Request::post("/event")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn rejects_unknown_event_name() {
        let app = test_router();
        let body = json!({
            "uuid": Uuid::new_v4(),
            "name": "not_registered",
            "timestamp": Utc::now(),
            "event_properties": {"user_id": "u1"},
        });
        let response = app
            .oneshot(
                Request::post("/event")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rejects_non_object_event_properties() {
        let app = test_router();
        let body = json!({
            "uuid": Uuid::new_v4(),
            "name": "scam_flag",
            "timestamp": Utc::now(),
            "event_properties": "not an object",
        });
        let response = app
            .oneshot(
                Request::post("/event")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn full_queue_returns_503() {
        let mut registry = SchemaRegistry::new();
        registry
            .register(EventPropertiesSchema::new("scam_flag", vec![]))
            .unwrap();
        let (queue, _rx) = EventQueue::bounded(1);
        let state = EventsState {
            schema_registry: Arc::new(registry),
            queue,
        };
        let app = Router::new().route("/event", post(post_event)).with_state(state);

        let make_body = || {
            json!({
                "uuid": Uuid::new_v4(),
                "name": "scam_flag",
                "timestamp": Utc::now(),
                "event_properties": {"user_id": "u1"},
            })
            .to_string()
        };

        let first = app
            .clone()
            .oneshot(
                Request::post("/event")
                    .header("content-type", "application/json")
                    .body(Body::from(make_body()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app
            .oneshot(
                Request::post("/event")
                    .header("content-type", "application/json")
                    .body(Body::from(make_body()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
