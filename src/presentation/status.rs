//! `GET /` and `GET /queue-size` — process status endpoints.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use tracing::instrument;

use crate::infrastructure::EventQueue;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct QueueSizeResponse {
    pub queue_size: usize,
}

/// `GET /` — liveness ping.
#[instrument(name = "handler.status.root")]
pub async fn root() -> impl IntoResponse {
    Json(json!({"Hello": "World"}))
}

/// `GET /queue-size` — current depth of the event queue.
#[instrument(name = "handler.status.queue_size", skip(queue))]
pub async fn queue_size(State(queue): State<EventQueue>) -> impl IntoResponse {
    Json(QueueSizeResponse { queue_size: queue.size() })
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/queue-size", get(queue_size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn root_returns_hello_world() {
        let (queue, _rx) = EventQueue::bounded(4);
        let app = Router::new().route("/", get(root)).route("/queue-size", get(queue_size)).with_state(queue);

        let response = app.oneshot(Request::get("/").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["Hello"], "World");
    }

    #[tokio::test]
    async fn queue_size_reflects_enqueued_count() {
        let (queue, _rx) = EventQueue::bounded(4);
        queue
            .try_enqueue(crate::domain::Event::new(
                uuid::Uuid::new_v4(),
                "scam_flag",
                chrono::Utc::now(),
                crate::domain::EventProperties::new(crate::domain::UserId::new("u1"), std::collections::HashMap::new()),
            ))
            .unwrap();
        let app = Router::new().route("/queue-size", get(queue_size)).with_state(queue);

        let response = app.oneshot(Request::get("/queue-size").body(Body::empty()).unwrap()).await.unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["queue_size"], 1);
    }
}
