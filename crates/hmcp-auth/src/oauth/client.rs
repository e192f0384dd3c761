//! Client-side credential cache.
//!
//! An [`OAuthClient`] holds one agent's own credentials and the token it
//! last obtained, and turns that token into an outgoing `Authorization`
//! header. There is no refresh logic: when a request comes back 401 the
//! caller asks for a new token and calls [`OAuthClient::set_token`] again.

use std::sync::{PoisonError, RwLock};

use axum::http::{HeaderMap, HeaderValue, header};

use crate::AuthResult;
use crate::config::{AuthConfig, DEFAULT_CLIENT_SCOPE};
use crate::error::AuthError;
use crate::oauth::token::{TokenRequest, TokenResponse};
use crate::secret::ClientSecret;
use crate::smart::{LAUNCH_PATIENT, PATIENT_PREFIX};
use crate::types::ClientValidationError;

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    id_token: Option<String>,
    patient_id: Option<String>,
    response: TokenResponse,
}

/// An agent's own OAuth credentials and current token.
#[derive(Debug)]
pub struct OAuthClient {
    client_id: String,
    client_secret: ClientSecret,
    default_scopes: Vec<String>,
    token: RwLock<Option<CachedToken>>,
}

impl OAuthClient {
    /// Creates a client after checking its credentials against the static
    /// registry in `config`.
    ///
    /// # Errors
    /// Returns `ClientNotFound` if the id is not in `config.clients` and
    /// `InvalidSecret` if the secret does not match.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        config: &AuthConfig,
    ) -> AuthResult<Self> {
        let client_id = client_id.into();
        let client_secret = ClientSecret::new(client_secret);

        let registered = config.clients.get(&client_id).ok_or_else(|| {
            ClientValidationError::ClientNotFound {
                client_id: client_id.clone(),
            }
        })?;
        if !ClientSecret::new(registered.secret.as_str()).matches(client_secret.expose()) {
            return Err(ClientValidationError::InvalidSecret.into());
        }

        let default_scopes = if registered.scopes.is_empty() {
            vec![DEFAULT_CLIENT_SCOPE.to_string()]
        } else {
            registered.scopes.clone()
        };

        Ok(Self {
            client_id,
            client_secret,
            default_scopes,
            token: RwLock::new(None),
        })
    }

    /// Builds a client_credentials token request.
    ///
    /// Without scopes, the client's registered scopes are requested, which is
    /// what the token endpoint will grant. When a patient id
    /// is given and no `patient/` scope is requested, `launch/patient` is
    /// appended.
    #[must_use]
    pub fn create_token_request(
        &self,
        scopes: Option<&[String]>,
        patient_id: Option<&str>,
    ) -> TokenRequest {
        let mut requested: Vec<String> = match scopes {
            Some(scopes) if !scopes.is_empty() => scopes.to_vec(),
            _ => self.default_scopes.clone(),
        };

        let patient_id = patient_id.filter(|p| !p.is_empty());
        if patient_id.is_some() && !requested.iter().any(|s| s.starts_with(PATIENT_PREFIX)) {
            requested.push(LAUNCH_PATIENT.to_string());
        }

        let mut request = TokenRequest::client_credentials(
            &self.client_id,
            self.client_secret.expose(),
            requested.join(" "),
        );
        if let Some(patient) = patient_id {
            request = request.with_patient_id(patient);
        }
        request
    }

    /// Stores a token response.
    ///
    /// # Errors
    /// Returns `AuthError::InvalidRequest` if the response has no access token.
    pub fn set_token(&self, response: TokenResponse) -> AuthResult<()> {
        if response.access_token.is_empty() {
            return Err(AuthError::invalid_request(
                "token response has no access_token",
            ));
        }

        let cached = CachedToken {
            access_token: response.access_token.clone(),
            id_token: response.id_token.clone(),
            patient_id: response.patient.clone(),
            response,
        };
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(cached);

        tracing::debug!(client_id = %self.client_id, "Stored access token");
        Ok(())
    }

    /// Returns `Authorization: Bearer <token>` as a header map.
    ///
    /// # Errors
    /// Returns `AuthError::NotAuthenticated` if no token has been set.
    pub fn auth_header(&self) -> AuthResult<HeaderMap> {
        let token = self.access_token().ok_or(AuthError::NotAuthenticated)?;
        let value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| AuthError::internal("access token is not a valid header value"))?;

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, value);
        Ok(headers)
    }

    /// Drops the cached token.
    pub fn clear_token(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// The client id.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Current access token, if any.
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.read(|t| t.access_token.clone())
    }

    /// ID token from the last response, if any.
    #[must_use]
    pub fn id_token(&self) -> Option<String> {
        self.read(|t| t.id_token.clone()).flatten()
    }

    /// Patient id from the last response, if any.
    #[must_use]
    pub fn patient_id(&self) -> Option<String> {
        self.read(|t| t.patient_id.clone()).flatten()
    }

    /// The full last token response.
    #[must_use]
    pub fn token_response(&self) -> Option<TokenResponse> {
        self.read(|t| t.response.clone())
    }

    fn read<T>(&self, f: impl FnOnce(&CachedToken) -> T) -> Option<T> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(f)
    }
}
