//! Client identity domain types.
//!
//! A [`ClientIdentity`] is created at registration time and is immutable
//! afterwards. It is owned exclusively by the
//! [`CredentialStore`](crate::storage::CredentialStore).

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::secret::ClientSecret;

// =============================================================================
// Grant Type
// =============================================================================

/// OAuth 2.0 grant types recognized by the token endpoint.
///
/// Only `ClientCredentials` is actually served; `AuthorizationCode` is
/// recognized so that it can be refused as not implemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    /// Authorization Code flow (not implemented).
    AuthorizationCode,
    /// Client Credentials flow.
    ClientCredentials,
}

impl GrantType {
    /// Returns the OAuth 2.0 grant_type parameter value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::ClientCredentials => "client_credentials",
        }
    }

    /// Parses a grant_type parameter value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "authorization_code" => Some(Self::AuthorizationCode),
            "client_credentials" => Some(Self::ClientCredentials),
            _ => None,
        }
    }
}

impl std::fmt::Display for GrantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Client Identity
// =============================================================================

/// A registered machine client.
#[derive(Debug, Clone)]
pub struct ClientIdentity {
    /// Unique client identifier.
    pub client_id: String,

    /// Client secret.
    pub secret: ClientSecret,

    /// Scopes this client may request.
    pub allowed_scopes: Vec<String>,

    /// Redirect URIs, kept for a future Authorization Code flow.
    pub redirect_uris: Vec<String>,

    /// When the client was registered.
    pub created_at: OffsetDateTime,
}

impl ClientIdentity {
    /// Creates a new client identity registered now.
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        secret: impl Into<ClientSecret>,
        allowed_scopes: Vec<String>,
        redirect_uris: Vec<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            secret: secret.into(),
            allowed_scopes,
            redirect_uris,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Checks if the given scope is in this client's allowed scopes.
    ///
    /// Matching is exact; there is no wildcard or hierarchy.
    #[must_use]
    pub fn is_scope_allowed(&self, scope: &str) -> bool {
        self.allowed_scopes.iter().any(|s| s == scope)
    }

    /// Returns the first scope of a space-separated scope string that this
    /// client is not allowed to request.
    #[must_use]
    pub fn first_disallowed_scope<'a>(&self, scope: &'a str) -> Option<&'a str> {
        scope.split_whitespace().find(|s| !self.is_scope_allowed(s))
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors raised while validating a client at issuance time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientValidationError {
    /// No client is registered under this id.
    #[error("Client not found: {client_id}")]
    ClientNotFound {
        /// The unknown client id.
        client_id: String,
    },

    /// The presented secret does not match the registered one.
    #[error("Invalid client secret")]
    InvalidSecret,

    /// The client id is empty.
    #[error("Client ID cannot be empty")]
    EmptyClientId,

    /// The client asked for a scope outside its allowed scopes.
    #[error("Scope not allowed for client: {scope}")]
    ScopeNotAllowed {
        /// The disallowed scope.
        scope: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ClientIdentity {
        ClientIdentity::new(
            "c1",
            "s1",
            vec!["hmcp:access".to_string(), "patient/hmcp:read".to_string()],
            vec!["https://app.example.com/callback".to_string()],
        )
    }

    #[test]
    fn test_scope_allowed_is_exact() {
        let client = client();
        assert!(client.is_scope_allowed("hmcp:access"));
        assert!(client.is_scope_allowed("patient/hmcp:read"));
        assert!(!client.is_scope_allowed("hmcp:read"));
        assert!(!client.is_scope_allowed("hmcp"));
    }

    #[test]
    fn test_first_disallowed_scope() {
        let client = client();
        assert_eq!(client.first_disallowed_scope("hmcp:access"), None);
        assert_eq!(
            client.first_disallowed_scope("hmcp:access hmcp:write patient/hmcp:read"),
            Some("hmcp:write")
        );
        assert_eq!(client.first_disallowed_scope(""), None);
    }

    #[test]
    fn test_grant_type_parse() {
        assert_eq!(
            GrantType::parse("client_credentials"),
            Some(GrantType::ClientCredentials)
        );
        assert_eq!(
            GrantType::parse("authorization_code"),
            Some(GrantType::AuthorizationCode)
        );
        assert_eq!(GrantType::parse("password"), None);
        assert_eq!(GrantType::ClientCredentials.to_string(), "client_credentials");
    }

    #[test]
    fn test_validation_error_display() {
        let err = ClientValidationError::ClientNotFound {
            client_id: "ghost".to_string(),
        };
        assert_eq!(err.to_string(), "Client not found: ghost");
        assert_eq!(
            ClientValidationError::InvalidSecret.to_string(),
            "Invalid client secret"
        );
    }
}
