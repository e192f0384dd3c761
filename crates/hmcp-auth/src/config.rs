//! Authentication and authorization configuration.
//!
//! Everything the token issuer, verifier and authorization engine need is
//! read from here once at startup and treated as read-only afterwards.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::secret::{EnvSecretProvider, INSECURE_DEFAULT_SECRET};
use crate::token::SigningAlgorithm;

/// Scopes advertised and accepted by default.
pub const DEFAULT_SUPPORTED_SCOPES: [&str; 9] = [
    "hmcp:access",
    "hmcp:read",
    "hmcp:write",
    "patient/hmcp:read",
    "patient/hmcp:write",
    "openid",
    "profile",
    "launch/patient",
    "offline_access",
];

/// Scope granted to clients registered without an explicit scope list.
pub const DEFAULT_CLIENT_SCOPE: &str = "hmcp:access";

/// Root authentication configuration.
///
/// # Example (TOML)
///
/// ```toml
/// [auth]
/// issuer = "HMCP_Server"
/// audience = "https://hmcp-server.example.com"
/// token_expiry_hours = 1
///
/// [auth.signing]
/// secret = "change-me"
///
/// [auth.clients.test-client]
/// secret = "test-secret"
/// scopes = ["hmcp:access"]
///
/// [auth.route_scopes]
/// "/messages" = ["hmcp:access"]
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Token issuer (`iss` claim).
    pub issuer: String,

    /// Token audience (`aud` claim), checked on verification.
    pub audience: String,

    /// Access token lifetime in hours.
    pub token_expiry_hours: u64,

    /// Path of the token endpoint; requests to it bypass authorization.
    pub token_url: String,

    /// Token signing configuration.
    pub signing: SigningConfig,

    /// Scopes the token endpoint accepts.
    pub supported_scopes: Vec<String>,

    /// Static client registry, keyed by client id.
    pub clients: BTreeMap<String, ClientConfig>,

    /// Required scopes per request path.
    ///
    /// Paths without an entry require the scopes registered for the calling
    /// client.
    pub route_scopes: BTreeMap<String, Vec<String>>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        let mut clients = BTreeMap::new();
        clients.insert(
            "test-client".to_string(),
            ClientConfig {
                secret: "test-secret".to_string(),
                scopes: vec![DEFAULT_CLIENT_SCOPE.to_string()],
                redirect_uris: Vec::new(),
            },
        );

        Self {
            issuer: "HMCP_Server".to_string(),
            audience: "https://hmcp-server.example.com".to_string(),
            token_expiry_hours: 1,
            token_url: "/oauth/token".to_string(),
            signing: SigningConfig::default(),
            supported_scopes: DEFAULT_SUPPORTED_SCOPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            clients,
            route_scopes: BTreeMap::new(),
        }
    }
}

/// Token signing configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Signing algorithm. Supported: "HS256", "HS384", "HS512".
    pub algorithm: String,

    /// Symmetric signing secret. `HMCP_JWT_SECRET` takes precedence.
    #[serde(skip_serializing)]
    pub secret: Option<String>,

    /// Fall back to a built-in development secret when none is configured.
    pub allow_insecure_default: bool,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            algorithm: "HS256".to_string(),
            secret: None,
            allow_insecure_default: false,
        }
    }
}

impl fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningConfig")
            .field("algorithm", &self.algorithm)
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .field("allow_insecure_default", &self.allow_insecure_default)
            .finish()
    }
}

/// A statically configured client.
#[derive(Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Client secret.
    #[serde(skip_serializing)]
    pub secret: String,

    /// Allowed scopes. Empty means the default `hmcp:access`.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// Registered redirect URIs.
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("secret", &"[REDACTED]")
            .field("scopes", &self.scopes)
            .field("redirect_uris", &self.redirect_uris)
            .finish()
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - The issuer or audience is empty
    /// - The token expiry is zero
    /// - The token URL does not start with `/`
    /// - The signing algorithm is not supported
    /// - A static client has an empty secret
    ///
    /// Returns `ConfigError::Missing` if no signing secret is available.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.is_empty() {
            return Err(ConfigError::InvalidValue(
                "issuer cannot be empty".to_string(),
            ));
        }

        if self.audience.is_empty() {
            return Err(ConfigError::InvalidValue(
                "audience cannot be empty".to_string(),
            ));
        }

        if self.token_expiry_hours == 0 {
            return Err(ConfigError::InvalidValue(
                "token_expiry_hours must be > 0".to_string(),
            ));
        }

        if !self.token_url.starts_with('/') {
            return Err(ConfigError::InvalidValue(format!(
                "token_url must start with '/': '{}'",
                self.token_url
            )));
        }

        self.algorithm()?;

        for (client_id, client) in &self.clients {
            if client.secret.is_empty() {
                return Err(ConfigError::InvalidValue(format!(
                    "client '{}' has an empty secret",
                    client_id
                )));
            }
        }

        let has_secret = self.signing.secret.as_ref().is_some_and(|s| !s.is_empty())
            || self.signing.allow_insecure_default
            || EnvSecretProvider::from_default_env(None).is_set();
        if !has_secret {
            return Err(ConfigError::Missing("signing.secret".to_string()));
        }

        Ok(())
    }

    /// Parses the configured signing algorithm.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` for anything but HS256/HS384/HS512.
    pub fn algorithm(&self) -> Result<SigningAlgorithm, ConfigError> {
        self.signing.algorithm.parse().map_err(|_| {
            ConfigError::InvalidValue(format!(
                "Invalid signing algorithm: '{}'. Must be HS256, HS384, or HS512",
                self.signing.algorithm
            ))
        })
    }

    /// Builds the signing secret provider.
    ///
    /// `HMCP_JWT_SECRET` wins; otherwise the configured secret is used, and
    /// finally the development default if it is allowed.
    #[must_use]
    pub fn secret_provider(&self) -> EnvSecretProvider {
        let fallback = match &self.signing.secret {
            Some(secret) if !secret.is_empty() => Some(secret.clone().into_bytes()),
            _ if self.signing.allow_insecure_default => {
                tracing::warn!("Using the insecure development signing secret");
                Some(INSECURE_DEFAULT_SECRET.as_bytes().to_vec())
            }
            _ => None,
        };
        EnvSecretProvider::from_default_env(fallback)
    }

    /// Access token lifetime.
    #[must_use]
    pub fn token_lifetime(&self) -> time::Duration {
        time::Duration::hours(i64::try_from(self.token_expiry_hours).unwrap_or(i64::MAX / 3600))
    }

    /// Access token lifetime in seconds, as reported in `expires_in`.
    #[must_use]
    pub fn expires_in_seconds(&self) -> u64 {
        self.token_expiry_hours.saturating_mul(3600)
    }

    /// Required scopes configured for a path, if any.
    #[must_use]
    pub fn required_scopes_for(&self, path: &str) -> Option<&[String]> {
        self.route_scopes.get(path).map(Vec::as_slice)
    }
}
