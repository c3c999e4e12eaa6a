//! API-key middleware
//!
//! When `require_api_key` is set, every protected request must carry an
//! `X-API-Key` header equal to the configured key.

use crate::error::ApiError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Length-independent comparison of two keys
fn keys_match(given: &[u8], expected: &[u8]) -> bool {
    if given.len() != expected.len() {
        return false;
    }
    given
        .iter()
        .zip(expected)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Reject requests without a valid `X-API-Key`
pub async fn require_api_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if !state.config.require_api_key {
        return next.run(request).await;
    }

    let Some(expected) = state.config.api_key.as_deref().filter(|k| !k.is_empty()) else {
        error!("require_api_key is set but no api_key is configured");
        return ApiError::Config("API key required but not configured on the server".to_string())
            .into_response();
    };

    let given = request
        .headers()
        .get(API_KEY_HEADER)
        .map(|v| v.as_bytes())
        .unwrap_or_default();

    if keys_match(given, expected.as_bytes()) {
        next.run(request).await
    } else {
        warn!(path = %request.uri().path(), "Rejected request with missing or invalid API key");
        ApiError::Unauthorized("Missing or invalid X-API-Key header".to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_match() {
        assert!(keys_match(b"secret", b"secret"));
        assert!(!keys_match(b"secreT", b"secret"));
        assert!(!keys_match(b"", b"secret"));
    }
}
