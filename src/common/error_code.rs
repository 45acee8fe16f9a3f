//! HTTP-compatible error codes shared across all layers.

use serde::{Deserialize, Serialize};

/// HTTP-compatible error codes for API responses.
///
/// Each code maps to a specific HTTP status so handlers don't need to pick a
/// status directly — they construct a domain error, and the presentation
/// layer derives the status from its `ErrorCode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Request validation failed (malformed input, constraint violations).
    ValidationFailed,
    /// Requested resource does not exist.
    NotFound,
    /// Unexpected server error.
    InternalError,
    /// Required service is temporarily unavailable (e.g. queue full).
    ServiceUnavailable,
}

impl ErrorCode {
    /// Convert to HTTP status code.
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::ValidationFailed => 400,
            Self::NotFound => 404,
            Self::InternalError => 500,
            Self::ServiceUnavailable => 503,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_codes() {
        assert_eq!(ErrorCode::ValidationFailed.http_status(), 400);
        assert_eq!(ErrorCode::NotFound.http_status(), 404);
        assert_eq!(ErrorCode::InternalError.http_status(), 500);
        assert_eq!(ErrorCode::ServiceUnavailable.http_status(), 503);
    }

    #[test]
    fn serde_serialization() {
        assert_eq!(
            serde_json::to_string(&ErrorCode::NotFound).unwrap(),
            "\"NOT_FOUND\""
        );
    }
}
