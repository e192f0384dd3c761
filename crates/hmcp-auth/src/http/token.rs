//! OAuth 2.0 Token endpoint handler.
//!
//! Only the `client_credentials` grant issues tokens. `authorization_code`
//! is recognized and answered with `501 not_implemented`.
//!
//! # Example
//!
//! ```ignore
//! // Client credentials grant
//! POST /oauth/token
//! Content-Type: application/x-www-form-urlencoded
//! Authorization: Basic <base64(client_id:client_secret)>
//!
//! grant_type=client_credentials
//! &scope=hmcp:access patient/hmcp:read
//! &patient_id=patient-123
//! ```
//!
//! A JSON body with the same fields is accepted as well.

use axum::{
    Form, Json,
    body::Body,
    extract::{FromRequest, State},
    http::{HeaderMap, HeaderValue, Request, header},
    response::{IntoResponse, Response},
};
use base64::Engine;
use tracing::{debug, info, warn};

use crate::error::AuthError;
use crate::middleware::AuthState;
use crate::oauth::token::{TokenRequest, TokenResponse};
use crate::smart::validate_scope_request;
use crate::types::{ClientValidationError, GrantType};

/// OAuth 2.0 token endpoint handler.
///
/// # Client Authentication
///
/// Clients can authenticate using:
/// - HTTP Basic Auth header: `Authorization: Basic <base64(client_id:client_secret)>`
/// - Request body: `client_id` and `client_secret` parameters
pub async fn token_handler(State(state): State<AuthState>, request: Request<Body>) -> Response {
    let headers = request.headers().clone();
    let mut token_request = match parse_token_request(request).await {
        Ok(token_request) => token_request,
        Err(e) => return token_error_response(e),
    };

    debug!(
        grant_type = %token_request.grant_type,
        client_id = ?token_request.client_id,
        "Processing token request"
    );

    let client_id = match authenticate_client(&state, &headers, &mut token_request) {
        Ok(client_id) => client_id,
        Err(e) => {
            warn!(error = %e, "Client authentication failed");
            return token_error_response(e);
        }
    };

    let result = match GrantType::parse(&token_request.grant_type) {
        Some(GrantType::ClientCredentials) => {
            client_credentials(&state, &client_id, &token_request)
        }
        Some(GrantType::AuthorizationCode) => {
            Err(AuthError::not_implemented("Authorization Code flow"))
        }
        None => {
            warn!(grant_type = %token_request.grant_type, "Unsupported grant type");
            Err(AuthError::unsupported_grant_type(
                token_request.grant_type.clone(),
            ))
        }
    };

    match result {
        Ok(response) => {
            info!(
                client_id = %client_id,
                grant_type = %token_request.grant_type,
                "Token issued successfully"
            );
            token_success_response(response)
        }
        Err(e) => {
            warn!(
                client_id = %client_id,
                grant_type = %token_request.grant_type,
                error = %e,
                "Token request failed"
            );
            token_error_response(e)
        }
    }
}

/// Reads the request body as JSON or as a url-encoded form.
async fn parse_token_request(request: Request<Body>) -> Result<TokenRequest, AuthError> {
    let is_json = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));

    if is_json {
        let Json(body) = Json::<TokenRequest>::from_request(request, &())
            .await
            .map_err(|e| AuthError::invalid_request(e.body_text()))?;
        Ok(body)
    } else {
        let Form(body) = Form::<TokenRequest>::from_request(request, &())
            .await
            .map_err(|e| AuthError::invalid_request(e.body_text()))?;
        Ok(body)
    }
}

fn client_credentials(
    state: &AuthState,
    client_id: &str,
    request: &TokenRequest,
) -> Result<TokenResponse, AuthError> {
    let client = state.server.credentials().get(client_id).ok_or_else(|| {
        ClientValidationError::ClientNotFound {
            client_id: client_id.to_string(),
        }
    })?;

    let scope = match request.scope.as_deref().map(str::trim) {
        Some(scope) if !scope.is_empty() => scope.to_string(),
        _ => client.allowed_scopes.join(" "),
    };

    validate_scope_request(&scope, &state.server.config().supported_scopes)?;
    if let Some(scope) = client.first_disallowed_scope(&scope) {
        return Err(ClientValidationError::ScopeNotAllowed {
            scope: scope.to_string(),
        }
        .into());
    }

    let patient_id = request.patient_id.as_deref().filter(|p| !p.is_empty());
    state.server.create_token(client_id, &scope, patient_id)
}

// =============================================================================
// Client Authentication
// =============================================================================

/// Client authentication credentials extracted from the request.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ClientAuth {
    /// HTTP Basic authentication.
    Basic {
        client_id: String,
        client_secret: String,
    },
    /// Client credentials in request body.
    Body {
        client_id: String,
        client_secret: String,
    },
    /// No client credentials provided.
    None,
}

/// Extract client authentication from headers and body fields.
pub(crate) fn extract_client_auth(
    headers: &HeaderMap,
    client_id: Option<&str>,
    client_secret: Option<&str>,
) -> ClientAuth {
    if let Some((client_id, client_secret)) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_basic_auth)
    {
        return ClientAuth::Basic {
            client_id,
            client_secret,
        };
    }

    if let (Some(client_id), Some(client_secret)) = (client_id, client_secret) {
        return ClientAuth::Body {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        };
    }

    ClientAuth::None
}

fn parse_basic_auth(header: &str) -> Option<(String, String)> {
    let encoded = header.strip_prefix("Basic ")?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (client_id, client_secret) = decoded.split_once(':')?;
    Some((client_id.to_string(), client_secret.to_string()))
}

/// Checks the presented credentials and returns the authenticated client id.
pub(crate) fn verify_client_auth(state: &AuthState, auth: ClientAuth) -> Result<String, AuthError> {
    let (client_id, client_secret) = match auth {
        ClientAuth::Basic {
            client_id,
            client_secret,
        }
        | ClientAuth::Body {
            client_id,
            client_secret,
        } => (client_id, client_secret),
        ClientAuth::None => return Err(ClientValidationError::EmptyClientId.into()),
    };

    if client_id.is_empty() {
        return Err(ClientValidationError::EmptyClientId.into());
    }
    state.server.validate_client(&client_id, &client_secret)?;
    Ok(client_id)
}

fn authenticate_client(
    state: &AuthState,
    headers: &HeaderMap,
    request: &mut TokenRequest,
) -> Result<String, AuthError> {
    let auth = extract_client_auth(
        headers,
        request.client_id.as_deref(),
        request.client_secret.as_deref(),
    );
    let client_id = verify_client_auth(state, auth)?;
    request.client_id = Some(client_id.clone());
    Ok(client_id)
}

// =============================================================================
// Responses
// =============================================================================

fn token_success_response(response: TokenResponse) -> Response {
    let mut response = Json(response).into_response();
    add_no_store_headers(response.headers_mut());
    response
}

fn token_error_response(error: AuthError) -> Response {
    let mut response = error.into_response();
    add_no_store_headers(response.headers_mut());
    response
}

fn add_no_store_headers(headers: &mut HeaderMap) {
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
}

// =============================================================================
// Tests
// =============================================================================
