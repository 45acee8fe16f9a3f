//! Presentation layer error type with HTTP response integration.
//!
//! Unifies every lower-layer error into [`AppError`], which implements
//! axum's [`IntoResponse`]. Unlike the teacher's `AppError`, this type
//! carries no UUID or backtrace: that machinery exists there to correlate
//! errors across a persisted, multi-aggregate event store, which this
//! in-memory service has no need of — its error surface is a handful of
//! validation and lookup failures.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::{EventProcessingError, GrantServiceError};
use crate::common::ErrorCode;
use crate::domain::{AggregateStoreError, FeatureError, RuleStoreError, SchemaError};

#[derive(Debug)]
pub struct AppError {
    code: ErrorCode,
    message: String,
}

impl AppError {
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    #[must_use]
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    #[must_use]
    pub fn http_status(&self) -> StatusCode {
        StatusCode::from_u16(self.code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        let body = Json(ErrorResponse {
            code: self.code,
            message: self.message,
        });
        (status, body).into_response()
    }
}

impl From<SchemaError> for AppError {
    fn from(error: SchemaError) -> Self {
        Self::validation(error.to_string())
    }
}

impl From<FeatureError> for AppError {
    fn from(error: FeatureError) -> Self {
        match error {
            FeatureError::NotFound(_) => Self::not_found(error.to_string()),
            FeatureError::DuplicateFeature(_) => Self::new(ErrorCode::InternalError, error.to_string()),
        }
    }
}

impl From<AggregateStoreError> for AppError {
    fn from(error: AggregateStoreError) -> Self {
        Self::new(ErrorCode::InternalError, error.to_string())
    }
}

impl From<RuleStoreError> for AppError {
    fn from(error: RuleStoreError) -> Self {
        Self::new(ErrorCode::InternalError, error.to_string())
    }
}

impl From<GrantServiceError> for AppError {
    fn from(error: GrantServiceError) -> Self {
        match error {
            GrantServiceError::UnknownFeature(_) => Self::not_found(error.to_string()),
        }
    }
}

impl From<EventProcessingError> for AppError {
    fn from(error: EventProcessingError) -> Self {
        Self::new(ErrorCode::InternalError, error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let error = AppError::not_found("feature 'bogus' not found");
        assert_eq!(error.http_status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn validation_maps_to_400() {
        let error = AppError::validation("bad path");
        assert_eq!(error.http_status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn grant_service_unknown_feature_maps_to_404() {
        let error: AppError = GrantServiceError::UnknownFeature("ghost".to_string()).into();
        assert_eq!(error.http_status(), StatusCode::NOT_FOUND);
    }
}
