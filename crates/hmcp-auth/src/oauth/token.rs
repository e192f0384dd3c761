//! Token endpoint types.
//!
//! Request, response and error shapes for the OAuth 2.0 token endpoint.
//!
//! # Supported Grant Types
//!
//! - `client_credentials` - Machine-to-machine authentication
//!
//! `authorization_code` is recognized and answered with `not_implemented`.
//!
//! # Extensions
//!
//! Requests may carry a `patient_id`; responses echo it back as `patient`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AuthError;
use crate::types::GrantType;

/// Token request parameters.
///
/// # Client Authentication
///
/// Clients authenticate using one of:
/// - HTTP Basic Auth header (not in this struct)
/// - `client_id` + `client_secret` in body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenRequest {
    /// OAuth 2.0 grant type.
    pub grant_type: String,

    /// Client ID (for client_secret_post).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Client secret (for client_secret_post).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Requested scopes, space-separated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Patient the token should be bound to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,

    /// Authorization code (authorization_code grant, not implemented).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Redirect URI (authorization_code grant, not implemented).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
}

impl TokenRequest {
    /// Creates a client_credentials request with body credentials.
    #[must_use]
    pub fn client_credentials(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            grant_type: GrantType::ClientCredentials.as_str().to_string(),
            client_id: Some(client_id.into()),
            client_secret: Some(client_secret.into()),
            scope: Some(scope.into()),
            ..Self::default()
        }
    }

    /// Sets the patient id.
    #[must_use]
    pub fn with_patient_id(mut self, patient_id: impl Into<String>) -> Self {
        self.patient_id = Some(patient_id.into());
        self
    }
}

/// Successful token response.
///
/// # Example Response
///
/// ```json
/// {
///   "access_token": "eyJhbG...",
///   "token_type": "Bearer",
///   "expires_in": 3600,
///   "scope": "hmcp:access patient/hmcp:read",
///   "patient": "patient-123"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The access token (JWT).
    pub access_token: String,

    /// Token type, always "Bearer".
    pub token_type: String,

    /// Access token lifetime in seconds.
    pub expires_in: u64,

    /// Granted scopes (space-separated).
    pub scope: String,

    /// ID token. Never issued by this server, accepted from others.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    /// Patient context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient: Option<String>,
}

impl TokenResponse {
    /// Creates a new token response with required fields.
    #[must_use]
    pub fn new(access_token: String, expires_in: u64, scope: String) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in,
            scope,
            id_token: None,
            patient: None,
        }
    }

    /// Sets the ID token.
    #[must_use]
    pub fn with_id_token(mut self, token: String) -> Self {
        self.id_token = Some(token);
        self
    }

    /// Sets the patient context.
    #[must_use]
    pub fn with_patient(mut self, patient: String) -> Self {
        self.patient = Some(patient);
        self
    }
}

/// Token error response.
///
/// # Example Response
///
/// ```json
/// {
///   "error": "invalid_client",
///   "error_description": "Invalid client secret"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct TokenError {
    /// OAuth 2.0 error code.
    pub error: TokenErrorCode,

    /// Human-readable error description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl TokenError {
    /// Creates a new token error with description.
    #[must_use]
    pub fn with_description(error: TokenErrorCode, description: impl Into<String>) -> Self {
        Self {
            error,
            error_description: Some(description.into()),
        }
    }

    /// Creates an invalid_request error.
    #[must_use]
    pub fn invalid_request(description: impl Into<String>) -> Self {
        Self::with_description(TokenErrorCode::InvalidRequest, description)
    }

    /// Creates an invalid_client error.
    #[must_use]
    pub fn invalid_client(description: impl Into<String>) -> Self {
        Self::with_description(TokenErrorCode::InvalidClient, description)
    }

    /// Creates an unsupported_grant_type error.
    #[must_use]
    pub fn unsupported_grant_type(description: impl Into<String>) -> Self {
        Self::with_description(TokenErrorCode::UnsupportedGrantType, description)
    }

    /// Creates an invalid_scope error.
    #[must_use]
    pub fn invalid_scope(description: impl Into<String>) -> Self {
        Self::with_description(TokenErrorCode::InvalidScope, description)
    }
}

impl From<&AuthError> for TokenError {
    fn from(err: &AuthError) -> Self {
        let code = match err {
            AuthError::InvalidClient(crate::types::ClientValidationError::ScopeNotAllowed {
                ..
            })
            | AuthError::InvalidScope { .. } => TokenErrorCode::InvalidScope,
            AuthError::InvalidClient(_) => TokenErrorCode::InvalidClient,
            AuthError::UnsupportedGrantType { .. } => TokenErrorCode::UnsupportedGrantType,
            AuthError::NotImplemented { .. } => TokenErrorCode::NotImplemented,
            AuthError::InvalidRequest { .. }
            | AuthError::InvalidToken { .. }
            | AuthError::NotAuthenticated => TokenErrorCode::InvalidRequest,
            AuthError::Configuration { .. } | AuthError::Internal { .. } => {
                TokenErrorCode::ServerError
            }
        };
        Self::with_description(code, err.to_string())
    }
}

/// OAuth 2.0 token error codes.
///
/// Defined in RFC 6749 Section 5.2, plus `not_implemented` for recognized
/// but unsupported grants and `server_error` for internal failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenErrorCode {
    /// The request is missing a required parameter or is otherwise malformed.
    InvalidRequest,

    /// Client authentication failed.
    InvalidClient,

    /// The grant type is not supported by the authorization server.
    UnsupportedGrantType,

    /// The requested scope is invalid, unknown, or not allowed for the client.
    InvalidScope,

    /// The grant type is recognized but not implemented.
    NotImplemented,

    /// The server failed to process a valid request.
    ServerError,
}

impl TokenErrorCode {
    /// Returns the string representation of the error code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::InvalidClient => "invalid_client",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::InvalidScope => "invalid_scope",
            Self::NotImplemented => "not_implemented",
            Self::ServerError => "server_error",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidClient => 401,
            Self::InvalidRequest | Self::UnsupportedGrantType | Self::InvalidScope => 400,
            Self::NotImplemented => 501,
            Self::ServerError => 500,
        }
    }
}

impl fmt::Display for TokenErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClientValidationError;

    #[test]
    fn test_token_request_deserialization() {
        let json = r#"{
            "grant_type": "client_credentials",
            "client_id": "backend-service",
            "client_secret": "secret",
            "scope": "hmcp:access patient/hmcp:read",
            "patient_id": "p-1"
        }"#;

        let request: TokenRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.grant_type, "client_credentials");
        assert_eq!(request.client_id.as_deref(), Some("backend-service"));
        assert_eq!(request.client_secret.as_deref(), Some("secret"));
        assert_eq!(
            request.scope.as_deref(),
            Some("hmcp:access patient/hmcp:read")
        );
        assert_eq!(request.patient_id.as_deref(), Some("p-1"));
        assert!(request.code.is_none());
    }

    #[test]
    fn test_token_request_builder_serializes_sparse() {
        let request = TokenRequest::client_credentials("c1", "s1", "hmcp:access");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["grant_type"], "client_credentials");
        assert_eq!(json["scope"], "hmcp:access");
        assert!(json.get("patient_id").is_none());
        assert!(json.get("code").is_none());
    }

    #[test]
    fn test_token_response_serialization() {
        let response = TokenResponse::new("tok".to_string(), 3600, "hmcp:access".to_string());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["token_type"], "Bearer");
        assert_eq!(json["expires_in"], 3600);
        assert!(json.get("patient").is_none());
        assert!(json.get("id_token").is_none());

        let response = response.with_patient("p-1".to_string());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["patient"], "p-1");
    }

    #[test]
    fn test_token_response_deserialization() {
        let json = r#"{"access_token":"a","token_type":"Bearer","expires_in":60,"scope":"x"}"#;
        let response: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.access_token, "a");
        assert!(response.patient.is_none());
    }

    #[test]
    fn test_token_error_from_auth_error() {
        let err = AuthError::from(ClientValidationError::InvalidSecret);
        assert_eq!(TokenError::from(&err).error, TokenErrorCode::InvalidClient);

        let err = AuthError::from(ClientValidationError::ScopeNotAllowed {
            scope: "hmcp:write".into(),
        });
        assert_eq!(TokenError::from(&err).error, TokenErrorCode::InvalidScope);

        let err = AuthError::not_implemented("Authorization Code flow");
        let token_err = TokenError::from(&err);
        assert_eq!(token_err.error, TokenErrorCode::NotImplemented);
        assert_eq!(token_err.error.http_status(), 501);
    }

    #[test]
    fn test_error_code_serialization() {
        let err = TokenError::unsupported_grant_type("password");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["error"], "unsupported_grant_type");
        assert_eq!(json["error_description"], "password");
    }
}
