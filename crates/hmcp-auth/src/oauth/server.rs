//! OAuth server facade.
//!
//! Bundles the credential store, token issuer and token verifier behind the
//! operations an agent server exposes: client registration and validation,
//! token creation, verification and revocation.
//!
//! # Usage
//!
//! ```
//! use hmcp_auth::config::AuthConfig;
//! use hmcp_auth::oauth::OAuthServer;
//!
//! let mut config = AuthConfig::default();
//! config.signing.secret = Some("change-me".to_string());
//!
//! let server = OAuthServer::new(config).unwrap();
//! server.register_client("c1", "s1", Vec::new(), None).unwrap();
//! server.validate_client("c1", "s1").unwrap();
//!
//! let response = server.create_token("c1", "hmcp:access", None).unwrap();
//! assert_eq!(response.token_type, "Bearer");
//! ```

use std::sync::Arc;

use time::OffsetDateTime;

use crate::AuthResult;
use crate::config::{AuthConfig, DEFAULT_CLIENT_SCOPE};
use crate::error::AuthError;
use crate::oauth::token::TokenResponse;
use crate::secret::SecretProvider;
use crate::storage::CredentialStore;
use crate::token::{JwtService, TokenClaims, TokenIssuer, TokenVerifier};
use crate::types::ClientIdentity;

/// The authorization server side of the client-credentials profile.
#[derive(Debug)]
pub struct OAuthServer {
    config: Arc<AuthConfig>,
    credentials: Arc<CredentialStore>,
    issuer: TokenIssuer,
    verifier: Arc<TokenVerifier>,
}

impl OAuthServer {
    /// Creates a server whose signing secret comes from
    /// [`AuthConfig::secret_provider`].
    ///
    /// # Errors
    /// Returns `AuthError::Configuration` if the algorithm is unsupported or
    /// no signing secret is available.
    pub fn new(config: AuthConfig) -> AuthResult<Self> {
        let provider = config.secret_provider();
        Self::with_provider(config, &provider)
    }

    /// Creates a server with an explicit secret provider.
    ///
    /// # Errors
    /// Returns `AuthError::Configuration` if the algorithm is unsupported or
    /// the provider has no secret.
    pub fn with_provider(config: AuthConfig, provider: &dyn SecretProvider) -> AuthResult<Self> {
        let algorithm = config
            .algorithm()
            .map_err(|e| AuthError::configuration(e.to_string()))?;
        let jwt = Arc::new(JwtService::from_provider(provider, algorithm)?);
        let credentials = Arc::new(CredentialStore::new());
        let issuer = TokenIssuer::new(&config, Arc::clone(&jwt), Arc::clone(&credentials));
        let verifier = Arc::new(TokenVerifier::new(jwt, config.audience.clone()));

        Ok(Self {
            config: Arc::new(config),
            credentials,
            issuer,
            verifier,
        })
    }

    /// Registers every client of the static registry.
    ///
    /// # Errors
    /// Returns an error if a configured client id is empty.
    pub fn register_configured_clients(&self) -> AuthResult<usize> {
        for (client_id, client) in &self.config.clients {
            let scopes = (!client.scopes.is_empty()).then(|| client.scopes.clone());
            self.register_client(
                client_id,
                client.secret.as_str(),
                client.redirect_uris.clone(),
                scopes,
            )?;
        }
        Ok(self.config.clients.len())
    }

    /// Registers a client. Omitted scopes default to `hmcp:access`.
    ///
    /// Re-registering an existing id replaces it.
    ///
    /// # Errors
    /// Returns `EmptyClientId` if `client_id` is empty.
    pub fn register_client(
        &self,
        client_id: &str,
        secret: &str,
        redirect_uris: Vec<String>,
        allowed_scopes: Option<Vec<String>>,
    ) -> AuthResult<Arc<ClientIdentity>> {
        let scopes = allowed_scopes.unwrap_or_else(|| vec![DEFAULT_CLIENT_SCOPE.to_string()]);
        Ok(self
            .credentials
            .register(client_id, secret, scopes, redirect_uris)?)
    }

    /// Validates client credentials.
    ///
    /// # Errors
    /// Returns `ClientNotFound` or `InvalidSecret`.
    pub fn validate_client(&self, client_id: &str, secret: &str) -> AuthResult<()> {
        Ok(self.credentials.validate(client_id, secret)?)
    }

    /// Creates an access token response.
    ///
    /// The caller must already have validated the client's secret. The
    /// response carries `patient` whenever a patient id is supplied, even if
    /// the scopes did not put it into the token. An empty id counts as absent.
    ///
    /// # Errors
    /// Returns `ClientNotFound` if the client is not registered.
    pub fn create_token(
        &self,
        client_id: &str,
        scope: &str,
        patient_id: Option<&str>,
    ) -> AuthResult<TokenResponse> {
        self.create_token_at(client_id, scope, patient_id, OffsetDateTime::now_utc())
    }

    /// [`create_token`](Self::create_token) with an explicit issue instant.
    ///
    /// # Errors
    /// Returns `ClientNotFound` if the client is not registered.
    pub fn create_token_at(
        &self,
        client_id: &str,
        scope: &str,
        patient_id: Option<&str>,
        now: OffsetDateTime,
    ) -> AuthResult<TokenResponse> {
        let patient_id = patient_id.filter(|p| !p.is_empty());
        let issued = self.issuer.issue_at(client_id, scope, patient_id, now)?;

        let mut response = TokenResponse::new(
            issued.access_token,
            self.config.expires_in_seconds(),
            scope.to_string(),
        );
        if let Some(patient) = patient_id {
            response = response.with_patient(patient.to_string());
        }
        Ok(response)
    }

    /// Verifies a token.
    ///
    /// # Errors
    /// Returns `AuthError::InvalidToken` with the failing check.
    pub fn verify_token(&self, token: &str) -> AuthResult<TokenClaims> {
        Ok(self.verifier.verify(token)?)
    }

    /// Revokes a token. Returns `true` if it was not already revoked.
    pub fn revoke_token(&self, token: &str) -> bool {
        self.verifier.revoke(token)
    }

    /// Revokes a token only if it was issued to `client_id`.
    ///
    /// Returns `true` if the token was revoked by this call.
    pub fn revoke_token_for(&self, token: &str, client_id: &str) -> bool {
        self.verifier.revoke_for_client(token, client_id)
    }

    /// Authorization Code flow entry point. Always refused.
    ///
    /// # Errors
    /// Always returns `AuthError::NotImplemented`.
    pub fn create_authorization_code(
        &self,
        _client_id: &str,
        _redirect_uri: &str,
        _scope: &str,
    ) -> AuthResult<String> {
        Err(AuthError::not_implemented("Authorization Code flow"))
    }

    /// Authorization Code exchange. Always refused.
    ///
    /// # Errors
    /// Always returns `AuthError::NotImplemented`.
    pub fn exchange_code_for_token(
        &self,
        _client_id: &str,
        _code: &str,
        _redirect_uri: &str,
    ) -> AuthResult<TokenResponse> {
        Err(AuthError::not_implemented("Authorization Code flow"))
    }

    /// OpenID Connect ID token issuance. Always refused.
    ///
    /// # Errors
    /// Always returns `AuthError::NotImplemented`.
    pub fn create_id_token(&self, _client_id: &str, _nonce: Option<&str>) -> AuthResult<String> {
        Err(AuthError::not_implemented("OpenID Connect ID token"))
    }

    /// The configuration this server was built from.
    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Shared credential store.
    #[must_use]
    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    /// Shared token verifier.
    #[must_use]
    pub fn verifier(&self) -> &Arc<TokenVerifier> {
        &self.verifier
    }
}
