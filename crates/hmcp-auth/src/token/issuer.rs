//! Token issuance.

use std::sync::Arc;

use time::{Duration, OffsetDateTime};

use crate::AuthResult;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::smart::PATIENT_PREFIX;
use crate::storage::CredentialStore;
use crate::token::jwt::{JwtService, TokenClaims};
use crate::types::ClientValidationError;
use crate::utils::token_fingerprint;

/// A freshly signed token together with the claims it encodes.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The compact signed token.
    pub access_token: String,
    /// The claims inside it.
    pub claims: TokenClaims,
}

/// Mints signed access tokens for registered clients.
///
/// The issuer only checks that the client exists. Proving the client's
/// secret is the caller's job (the token endpoint or
/// [`OAuthServer::validate_client`](crate::oauth::OAuthServer::validate_client)).
#[derive(Debug)]
pub struct TokenIssuer {
    jwt: Arc<JwtService>,
    credentials: Arc<CredentialStore>,
    issuer: String,
    audience: String,
    lifetime: Duration,
}

impl TokenIssuer {
    /// Creates an issuer from configuration.
    #[must_use]
    pub fn new(
        config: &AuthConfig,
        jwt: Arc<JwtService>,
        credentials: Arc<CredentialStore>,
    ) -> Self {
        Self {
            jwt,
            credentials,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            lifetime: config.token_lifetime(),
        }
    }

    /// Issues a token valid from now.
    ///
    /// # Errors
    /// Returns `ClientNotFound` if the client is not registered.
    pub fn issue(
        &self,
        client_id: &str,
        scope: &str,
        patient_id: Option<&str>,
    ) -> AuthResult<IssuedToken> {
        self.issue_at(client_id, scope, patient_id, OffsetDateTime::now_utc())
    }

    /// Issues a token with an explicit issue instant.
    ///
    /// The `patient` claim is set only when a non-empty patient id is
    /// supplied and at least one scope starts with `patient/`. `launch/patient` on its own
    /// does not add the claim.
    ///
    /// # Errors
    /// Returns `ClientNotFound` if the client is not registered.
    pub fn issue_at(
        &self,
        client_id: &str,
        scope: &str,
        patient_id: Option<&str>,
        now: OffsetDateTime,
    ) -> AuthResult<IssuedToken> {
        if !self.credentials.contains(client_id) {
            return Err(ClientValidationError::ClientNotFound {
                client_id: client_id.to_string(),
            }
            .into());
        }

        let mut builder = TokenClaims::builder(&self.issuer, client_id)
            .audience(&self.audience)
            .issued_at(now)
            .expires_in(self.lifetime)
            .scope(scope);

        let patient_scoped = scope
            .split_whitespace()
            .any(|s| s.starts_with(PATIENT_PREFIX));
        if let Some(patient) = patient_id.filter(|p| patient_scoped && !p.is_empty()) {
            builder = builder.patient(patient);
        }

        let claims = builder.build();
        let access_token = self
            .jwt
            .encode(&claims)
            .map_err(|e| AuthError::internal(format!("Failed to encode access token: {}", e)))?;

        tracing::info!(
            client_id = %client_id,
            scope = %scope,
            patient = claims.patient.is_some(),
            token = %token_fingerprint(&access_token),
            "Issued access token"
        );

        Ok(IssuedToken {
            access_token,
            claims,
        })
    }

    /// Configured token lifetime.
    #[must_use]
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }
}
