//! Request-time authorization decision.
//!
//! [`AuthorizationEngine::decide`] runs the full check sequence for one
//! request and returns an [`AuthorizationResult`]. It never fails: every
//! verifier or lookup error becomes a DENY with a [`DenyReason`].
//!
//! The sequence, stopping at the first DENY:
//!
//! 1. Requests to the token endpoint are allowed without a token.
//! 2. The `Authorization` header must be `Bearer <token>`.
//! 3. The token must verify (revocation, signature, expiry, audience).
//! 4. The token subject must be a registered client.
//! 5. The token must carry every required scope.
//! 6. A token with a `patient/` scope must carry a `patient` claim.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use axum::http::StatusCode;
use time::OffsetDateTime;

use crate::error::TokenValidationError;
use crate::oauth::OAuthServer;
use crate::smart::PATIENT_PREFIX;
use crate::storage::CredentialStore;
use crate::token::{TokenClaims, TokenVerifier};
use crate::utils::{missing_scopes, parse_auth_header};

// =============================================================================
// Deny Reasons
// =============================================================================

/// Why a request was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// No `Authorization` header, or one not starting with `Bearer `.
    MissingHeader,

    /// The token failed verification.
    InvalidToken(TokenValidationError),

    /// The token subject is not a registered client.
    UnknownClient {
        /// The subject found in the token.
        client_id: String,
    },

    /// The token lacks required scopes.
    InsufficientScope {
        /// Required scopes absent from the token.
        missing: Vec<String>,
    },

    /// The token has a `patient/` scope but no `patient` claim.
    MissingPatientContext,
}

impl DenyReason {
    /// Stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingHeader => "missing_header",
            Self::InvalidToken(_) => "invalid_token",
            Self::UnknownClient { .. } => "unknown_client",
            Self::InsufficientScope { .. } => "insufficient_scope",
            Self::MissingPatientContext => "missing_patient_context",
        }
    }

    /// HTTP status for this denial.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingHeader | Self::InvalidToken(_) | Self::UnknownClient { .. } => {
                StatusCode::UNAUTHORIZED
            }
            Self::InsufficientScope { .. } | Self::MissingPatientContext => StatusCode::FORBIDDEN,
        }
    }

    /// Human-readable description.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::MissingHeader => "No authorization header provided".to_string(),
            Self::InvalidToken(reason) => format!("Authentication failed: {}", reason),
            Self::UnknownClient { .. } => "Invalid client ID".to_string(),
            Self::InsufficientScope { missing } => {
                format!("Insufficient scope: missing {}", missing.join(" "))
            }
            Self::MissingPatientContext => {
                "Patient-context scopes require patient ID".to_string()
            }
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidToken(reason) => write!(f, "{}: {}", self.code(), reason.code()),
            _ => f.write_str(self.code()),
        }
    }
}

// =============================================================================
// Authorization Result
// =============================================================================

/// Outcome of one authorization decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationResult {
    /// Whether the request may proceed.
    pub allowed: bool,

    /// Client the token belongs to, when known.
    pub client_id: Option<String>,

    /// Scopes carried by the token.
    pub granted_scopes: Vec<String>,

    /// Patient the token is bound to.
    pub patient_id: Option<String>,

    /// Set on DENY.
    pub denial_reason: Option<DenyReason>,
}

impl AuthorizationResult {
    /// ALLOW without an identity (token endpoint bypass).
    #[must_use]
    pub fn bypass() -> Self {
        Self {
            allowed: true,
            client_id: None,
            granted_scopes: Vec::new(),
            patient_id: None,
            denial_reason: None,
        }
    }

    /// ALLOW for the identity in `claims`.
    #[must_use]
    pub fn allow(claims: &TokenClaims) -> Self {
        Self {
            allowed: true,
            client_id: Some(claims.sub.clone()),
            granted_scopes: claims.scopes().map(str::to_string).collect(),
            patient_id: claims.patient.clone(),
            denial_reason: None,
        }
    }

    /// DENY before any identity is known.
    #[must_use]
    pub fn deny(reason: DenyReason) -> Self {
        Self {
            allowed: false,
            client_id: None,
            granted_scopes: Vec::new(),
            patient_id: None,
            denial_reason: Some(reason),
        }
    }

    /// DENY for a verified token.
    #[must_use]
    pub fn deny_for(claims: &TokenClaims, reason: DenyReason) -> Self {
        Self {
            allowed: false,
            denial_reason: Some(reason),
            ..Self::allow(claims)
        }
    }
}

// =============================================================================
// Authorization Engine
// =============================================================================

/// Decides ALLOW/DENY for incoming requests.
#[derive(Debug, Clone)]
pub struct AuthorizationEngine {
    credentials: Arc<CredentialStore>,
    verifier: Arc<TokenVerifier>,
    token_url: String,
    route_scopes: BTreeMap<String, Vec<String>>,
}

impl AuthorizationEngine {
    /// Builds an engine sharing the server's credential store and verifier.
    #[must_use]
    pub fn new(server: &OAuthServer) -> Self {
        let config = server.config();
        Self {
            credentials: Arc::clone(server.credentials()),
            verifier: Arc::clone(server.verifier()),
            token_url: config.token_url.clone(),
            route_scopes: config.route_scopes.clone(),
        }
    }

    /// Decides using the configured required scopes for `path`.
    ///
    /// Paths without configured scopes require the calling client's
    /// registered scopes.
    #[must_use]
    pub fn decide(&self, path: &str, authorization: Option<&str>) -> AuthorizationResult {
        let required = self.route_scopes.get(path).map(Vec::as_slice);
        self.decide_at(path, authorization, required, OffsetDateTime::now_utc())
    }

    /// Decides with explicit required scopes and an explicit instant.
    ///
    /// `required = None` falls back to the client's registered scopes.
    #[must_use]
    pub fn decide_at(
        &self,
        path: &str,
        authorization: Option<&str>,
        required: Option<&[String]>,
        now: OffsetDateTime,
    ) -> AuthorizationResult {
        if path == self.token_url {
            return AuthorizationResult::bypass();
        }

        let Some(token) = authorization.and_then(parse_auth_header) else {
            return AuthorizationResult::deny(DenyReason::MissingHeader);
        };

        let claims = match self.verifier.verify_at(token, now) {
            Ok(claims) => claims,
            Err(reason) => return AuthorizationResult::deny(DenyReason::InvalidToken(reason)),
        };

        let Some(client) = self.credentials.get(&claims.sub) else {
            return AuthorizationResult::deny_for(
                &claims,
                DenyReason::UnknownClient {
                    client_id: claims.sub.clone(),
                },
            );
        };

        let required = required.unwrap_or(client.allowed_scopes.as_slice());
        let missing = missing_scopes(required, &claims.scope);
        if !missing.is_empty() {
            return AuthorizationResult::deny_for(
                &claims,
                DenyReason::InsufficientScope { missing },
            );
        }

        if claims.scopes().any(|s| s.starts_with(PATIENT_PREFIX)) && claims.patient.is_none() {
            return AuthorizationResult::deny_for(&claims, DenyReason::MissingPatientContext);
        }

        AuthorizationResult::allow(&claims)
    }

    /// Path exempt from authorization.
    #[must_use]
    pub fn token_url(&self) -> &str {
        &self.token_url
    }
}
