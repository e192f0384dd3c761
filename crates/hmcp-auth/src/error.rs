//! Authentication and authorization error types.
//!
//! This module defines the umbrella [`AuthError`] returned by every fallible
//! operation in the crate, together with the nested [`TokenValidationError`]
//! that explains why a presented token was refused.

use std::fmt;

use crate::types::ClientValidationError;

/// Errors that can occur during authentication and authorization operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The client is unknown, presented a wrong secret, or asked for a scope
    /// it is not allowed to hold.
    #[error("Invalid client: {0}")]
    InvalidClient(#[from] ClientValidationError),

    /// The presented token was rejected by the verifier.
    ///
    /// Every verification failure is normalized to this kind; the nested
    /// reason keeps the distinction between expiry and other failures.
    #[error("Invalid token: {reason}")]
    InvalidToken {
        /// Why the token was rejected.
        reason: TokenValidationError,
    },

    /// The requested scope string is malformed or names an unsupported scope.
    #[error("Invalid scope: {message}")]
    InvalidScope {
        /// Description of why the scope is invalid.
        message: String,
    },

    /// The client-side credential cache was used before a token was set.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The requested flow exists in the protocol surface but is not supported.
    #[error("{feature} is not implemented")]
    NotImplemented {
        /// Name of the unsupported feature.
        feature: String,
    },

    /// The request is missing a parameter or is otherwise malformed.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of why the request is invalid.
        message: String,
    },

    /// The token endpoint does not support the requested grant type.
    #[error("Unsupported grant type: {grant_type}")]
    UnsupportedGrantType {
        /// The unsupported grant type.
        grant_type: String,
    },

    /// The auth configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `InvalidToken` error.
    #[must_use]
    pub fn invalid_token(reason: TokenValidationError) -> Self {
        Self::InvalidToken { reason }
    }

    /// Creates a new `InvalidScope` error.
    #[must_use]
    pub fn invalid_scope(message: impl Into<String>) -> Self {
        Self::InvalidScope {
            message: message.into(),
        }
    }

    /// Creates a new `NotImplemented` error.
    #[must_use]
    pub fn not_implemented(feature: impl Into<String>) -> Self {
        Self::NotImplemented {
            feature: feature.into(),
        }
    }

    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a new `UnsupportedGrantType` error.
    #[must_use]
    pub fn unsupported_grant_type(grant_type: impl Into<String>) -> Self {
        Self::UnsupportedGrantType {
            grant_type: grant_type.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a client error (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidClient(_)
                | Self::InvalidToken { .. }
                | Self::InvalidScope { .. }
                | Self::NotAuthenticated
                | Self::InvalidRequest { .. }
                | Self::UnsupportedGrantType { .. }
        )
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::NotImplemented { .. } | Self::Configuration { .. } | Self::Internal { .. }
        )
    }

    /// Returns `true` if this is a token-related error.
    #[must_use]
    pub fn is_token_error(&self) -> bool {
        matches!(self, Self::InvalidToken { .. })
    }

    /// Returns `true` if the token was rejected only because it expired.
    ///
    /// Callers use this to decide whether re-issuing a token is worthwhile.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        matches!(
            self,
            Self::InvalidToken {
                reason: TokenValidationError::Expired
            }
        )
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidClient(_) => ErrorCategory::Authentication,
            Self::InvalidToken { .. } => ErrorCategory::Token,
            Self::InvalidScope { .. } => ErrorCategory::Authorization,
            Self::NotAuthenticated => ErrorCategory::Authentication,
            Self::NotImplemented { .. } => ErrorCategory::Unsupported,
            Self::InvalidRequest { .. } => ErrorCategory::Validation,
            Self::UnsupportedGrantType { .. } => ErrorCategory::Validation,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the OAuth 2.0 error code for this error.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::InvalidClient(ClientValidationError::ScopeNotAllowed { .. }) => "invalid_scope",
            Self::InvalidClient(_) => "invalid_client",
            Self::InvalidToken { .. } => "invalid_token",
            Self::InvalidScope { .. } => "invalid_scope",
            Self::NotAuthenticated => "unauthorized",
            Self::NotImplemented { .. } => "not_implemented",
            Self::InvalidRequest { .. } => "invalid_request",
            Self::UnsupportedGrantType { .. } => "unsupported_grant_type",
            Self::Configuration { .. } => "server_error",
            Self::Internal { .. } => "server_error",
        }
    }
}

impl From<TokenValidationError> for AuthError {
    fn from(reason: TokenValidationError) -> Self {
        Self::InvalidToken { reason }
    }
}

// =============================================================================
// Token Validation Errors
// =============================================================================

/// Reasons a presented token can be refused, in the order they are checked.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenValidationError {
    /// The exact token string is in the revocation set.
    #[error("Token has been revoked")]
    Revoked,

    /// The token could not be decoded or its signature did not verify.
    #[error("Malformed token: {0}")]
    Malformed(String),

    /// The token's expiry instant has been reached.
    #[error("Token has expired")]
    Expired,

    /// The token was minted for a different audience.
    #[error("Invalid audience")]
    InvalidAudience,
}

impl TokenValidationError {
    /// Stable machine-readable code for logs and denial payloads.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Revoked => "revoked",
            Self::Malformed(_) => "malformed",
            Self::Expired => "expired",
            Self::InvalidAudience => "invalid_audience",
        }
    }
}

/// Categories of authentication/authorization errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Authentication-related errors (identity verification).
    Authentication,
    /// Authorization-related errors (permission checks).
    Authorization,
    /// Token-related errors (validation, expiration).
    Token,
    /// Request validation errors.
    Validation,
    /// Flows that are deliberately refused.
    Unsupported,
    /// Configuration errors.
    Configuration,
    /// Internal server errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Authorization => write!(f, "authorization"),
            Self::Token => write!(f, "token"),
            Self::Validation => write!(f, "validation"),
            Self::Unsupported => write!(f, "unsupported"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthError::from(ClientValidationError::ClientNotFound {
            client_id: "c1".to_string(),
        });
        assert_eq!(err.to_string(), "Invalid client: Client not found: c1");

        let err = AuthError::invalid_token(TokenValidationError::Expired);
        assert_eq!(err.to_string(), "Invalid token: Token has expired");

        let err = AuthError::not_implemented("Authorization Code flow");
        assert_eq!(
            err.to_string(),
            "Authorization Code flow is not implemented"
        );
    }

    #[test]
    fn test_error_predicates() {
        let expired = AuthError::from(TokenValidationError::Expired);
        assert!(expired.is_token_error());
        assert!(expired.is_expired());
        assert!(expired.is_client_error());

        let revoked = AuthError::from(TokenValidationError::Revoked);
        assert!(revoked.is_token_error());
        assert!(!revoked.is_expired());

        let internal = AuthError::internal("boom");
        assert!(internal.is_server_error());
        assert!(!internal.is_client_error());
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            AuthError::NotAuthenticated.category(),
            ErrorCategory::Authentication
        );
        assert_eq!(
            AuthError::from(TokenValidationError::InvalidAudience).category(),
            ErrorCategory::Token
        );
        assert_eq!(
            AuthError::not_implemented("OpenID Connect").category(),
            ErrorCategory::Unsupported
        );
    }

    #[test]
    fn test_oauth_error_code() {
        assert_eq!(
            AuthError::from(ClientValidationError::InvalidSecret).oauth_error_code(),
            "invalid_client"
        );
        assert_eq!(
            AuthError::from(ClientValidationError::ScopeNotAllowed {
                scope: "hmcp:write".to_string()
            })
            .oauth_error_code(),
            "invalid_scope"
        );
        assert_eq!(
            AuthError::unsupported_grant_type("password").oauth_error_code(),
            "unsupported_grant_type"
        );
    }

    #[test]
    fn test_token_validation_codes() {
        assert_eq!(TokenValidationError::Revoked.code(), "revoked");
        assert_eq!(
            TokenValidationError::Malformed("bad".into()).code(),
            "malformed"
        );
        assert_eq!(TokenValidationError::Expired.code(), "expired");
        assert_eq!(
            TokenValidationError::InvalidAudience.code(),
            "invalid_audience"
        );
    }
}
