//! Error responses for the authorization layer.
//!
//! Both [`AuthError`] and [`Denial`] render as an OAuth-style JSON body:
//!
//! ```json
//! { "error": "invalid_token", "error_description": "Authentication failed: ..." }
//! ```
//!
//! 401 responses also carry a `WWW-Authenticate: Bearer` challenge.

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::AuthError;
use crate::oauth::TokenError;

use super::decision::DenyReason;

// =============================================================================
// Denial
// =============================================================================

/// A refused request, ready to be turned into a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    /// Why the request was refused.
    pub reason: DenyReason,
}

impl Denial {
    #[must_use]
    pub fn new(reason: DenyReason) -> Self {
        Self { reason }
    }
}

impl IntoResponse for Denial {
    fn into_response(self) -> Response {
        error_response(self.reason.status(), self.reason.code(), &self.reason.message())
    }
}

// =============================================================================
// IntoResponse for AuthError
// =============================================================================

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let Self::InvalidToken { .. } | Self::NotAuthenticated = self {
            return error_response(StatusCode::UNAUTHORIZED, "invalid_token", &self.to_string());
        }

        let token_error = TokenError::from(&self);
        let status = StatusCode::from_u16(token_error.error.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let message = token_error
            .error_description
            .unwrap_or_else(|| self.to_string());
        error_response(status, token_error.error.as_str(), &message)
    }
}

fn error_response(status: StatusCode, error: &str, description: &str) -> Response {
    let body = json!({
        "error": error,
        "error_description": description,
    });

    let mut headers = HeaderMap::new();
    if status == StatusCode::UNAUTHORIZED {
        let www_auth = build_www_authenticate_header(error, description);
        if let Ok(value) = HeaderValue::from_str(&www_auth) {
            headers.insert(header::WWW_AUTHENTICATE, value);
        }
    }

    (status, headers, Json(body)).into_response()
}

/// Builds the WWW-Authenticate header value for 401 responses.
///
/// Format: `Bearer realm="hmcp", error="invalid_token", error_description="..."`
fn build_www_authenticate_header(error: &str, description: &str) -> String {
    let escaped_desc = description.replace('\"', "\\\"");
    format!(
        "Bearer realm=\"hmcp\", error=\"{}\", error_description=\"{}\"",
        error, escaped_desc
    )
}

// =============================================================================
// Tests
// =============================================================================
