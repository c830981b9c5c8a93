//! HTTP error responses
//!
//! Every failure leaves the service as
//! `{ "ok": false, "error": { "code": ..., "message": ..., "suggestions": [...] } }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;

use crate::error::MixError;

/// Error returned from a handler
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    /// What the caller can try next; empty when there is nothing useful
    pub suggestions: Vec<&'static str>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            suggestions: Vec::new(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "UNAUTHORIZED",
            "missing or invalid bearer token",
        )
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }
}

impl From<MixError> for ApiError {
    fn from(err: MixError) -> Self {
        let status = match &err {
            MixError::Synthesis { .. } => StatusCode::BAD_GATEWAY,
            e if e.is_caller_bug() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError {
            suggestions: err.recovery_suggestions(),
            ..ApiError::new(status, err.error_code(), err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(status = self.status.as_u16(), code = self.code, "{}", self.message);
        }
        let body = Json(json!({
            "ok": false,
            "error": {
                "code": self.code,
                "message": self.message,
                "suggestions": self.suggestions,
            }
        }));
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let synth = MixError::Synthesis {
            reason: "down".to_string(),
            source: None,
        };
        assert_eq!(ApiError::from(synth).status, StatusCode::BAD_GATEWAY);

        let bad = ApiError::from(MixError::invalid_input("fade_ms must be >= 0"));
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);
        assert_eq!(bad.code, "INVALID_INPUT");

        let io = ApiError::from(MixError::Io(std::io::Error::other("disk full")));
        assert_eq!(io.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_suggestions_carried_from_mix_error() {
        let bad = ApiError::from(MixError::invalid_input("fade_ms must be >= 0"));
        assert!(!bad.suggestions.is_empty());
        assert!(ApiError::bad_request("missing field").suggestions.is_empty());
    }
}
