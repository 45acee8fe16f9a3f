//! `GET /can<feature>` feature-gate lookup.

use std::sync::{Arc, LazyLock};

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use regex::Regex;
use serde::Serialize;
use tracing::instrument;

use crate::application::GrantService;
use crate::domain::{FeatureRegistry, UserId};
use crate::state::AppState;

use super::error::AppError;

#[derive(Clone)]
pub struct FeaturesState {
    pub feature_registry: Arc<FeatureRegistry>,
    pub grant_service: Arc<GrantService>,
}

static FEATURE_PATH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^can[a-z]{1,16}$").expect("valid regex"));

#[derive(Debug, Serialize)]
pub struct FeatureGrantResponse {
    pub user_id: String,
    pub feature: String,
    pub has_grant: bool,
}

/// `GET /can<feature>` — whether `x-user-id` may use `<feature>` right now.
///
/// `400` if the path doesn't match `^can[a-z]{1,16}$`; `404` if the feature
/// (path with the `can` prefix stripped) isn't registered.
#[instrument(name = "handler.features.can", skip(state, headers), fields(path = %path))]
pub async fn can_feature(
    State(state): State<FeaturesState>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    if !FEATURE_PATH.is_match(&path) {
        return Err(AppError::validation(format!("path '/{path}' does not match ^can[a-z]{{1,16}}$")));
    }
    let feature_name = &path[3..];
    state.feature_registry.get(feature_name)?;

    let user_id = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .map(UserId::new)
        .ok_or_else(|| AppError::validation("missing x-user-id header"))?;

    let has_grant = state.grant_service.has_grant(&user_id, feature_name).await?;

    Ok(Json(FeatureGrantResponse {
        user_id: user_id.to_string(),
        feature: feature_name.to_string(),
        has_grant,
    }))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/{path}", get(can_feature))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::LoggingNotificationsService;
    use crate::domain::PlatformFeature;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_router() -> Router {
        let mut registry = FeatureRegistry::new();
        registry
            .add(PlatformFeature::new("message", vec!["r".to_string()]).unwrap())
            .unwrap();
        let registry = Arc::new(registry);
        let grant_service = Arc::new(GrantService::new(registry.clone(), Arc::new(LoggingNotificationsService)));
        let state = FeaturesState {
            feature_registry: registry,
            grant_service,
        };
        Router::new().route("/{path}", get(can_feature)).with_state(state)
    }

    #[tokio::test]
    async fn never_seen_user_is_granted() {
        let app = test_router();
        let response = app
            .oneshot(
                Request::get("/canmessage")
                    .header("x-user-id", "user_A")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["has_grant"], true);
        assert_eq!(json["feature"], "message");
    }

    #[tokio::test]
    async fn invalid_path_is_400() {
        let app = test_router();
        let response = app
            .oneshot(
                Request::get("/CANMESSAGE")
                    .header("x-user-id", "user_A")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_feature_is_404() {
        let app = test_router();
        let response = app
            .oneshot(
                Request::get("/canpurchase")
                    .header("x-user-id", "user_A")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn missing_user_id_header_is_400() {
        let app = test_router();
        let response = app.oneshot(Request::get("/canmessage").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);
    }
}
