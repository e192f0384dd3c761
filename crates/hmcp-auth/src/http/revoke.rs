//! Token revocation endpoint handler (RFC 7009).
//!
//! # Request Format
//!
//! ```text
//! POST /oauth/revoke
//! Content-Type: application/x-www-form-urlencoded
//! Authorization: Basic <client_credentials>
//!
//! token=<token_to_revoke>&token_type_hint=access_token
//! ```
//!
//! # Response
//!
//! The endpoint always returns 200 OK, even for unknown or already revoked
//! tokens, unless client authentication fails. A token issued to a different
//! client is not revoked.

use axum::{
    Form,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::error::AuthError;
use crate::middleware::AuthState;
use crate::utils::token_fingerprint;

use super::token::{extract_client_auth, verify_client_auth};

/// Form parameters for the revocation endpoint.
#[derive(Debug, Deserialize)]
pub struct RevocationForm {
    /// The token to revoke.
    #[serde(default)]
    pub token: String,

    /// Optional hint about the token type. Only access tokens exist here.
    #[serde(default)]
    pub token_type_hint: Option<String>,

    /// Client ID (when not using Basic auth).
    #[serde(default)]
    pub client_id: Option<String>,

    /// Client secret (for client_secret_post authentication).
    #[serde(default)]
    pub client_secret: Option<String>,
}

/// Token revocation endpoint handler.
///
/// - 200 OK: token revoked (or was already revoked or invalid)
/// - 400 Bad Request: missing `token` parameter
/// - 401 Unauthorized: invalid client credentials
pub async fn revoke_handler(
    State(state): State<AuthState>,
    headers: HeaderMap,
    Form(form): Form<RevocationForm>,
) -> Response {
    if form.token.is_empty() {
        return AuthError::invalid_request("Missing required 'token' parameter").into_response();
    }

    let auth = extract_client_auth(
        &headers,
        form.client_id.as_deref(),
        form.client_secret.as_deref(),
    );
    let client_id = match verify_client_auth(&state, auth) {
        Ok(client_id) => client_id,
        Err(e) => {
            tracing::debug!(error = %e, "Revocation: client authentication failed");
            return e.into_response();
        }
    };

    // Tokens of other clients are left untouched, still answered with 200.
    let newly_revoked = state.server.revoke_token_for(&form.token, &client_id);
    tracing::info!(
        client_id = %client_id,
        token = %token_fingerprint(&form.token),
        hint = form.token_type_hint.as_deref().unwrap_or("-"),
        newly_revoked,
        "Token revocation processed"
    );
    StatusCode::OK.into_response()
}
