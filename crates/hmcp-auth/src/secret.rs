//! Secret handling.
//!
//! Two kinds of secret flow through the crate:
//!
//! - the symmetric **signing secret** shared by the token issuer and verifier,
//!   obtained through a [`SecretProvider`] so that deployments can source it
//!   from the environment instead of a config file;
//! - per-client **client secrets**, wrapped in [`ClientSecret`] so they never
//!   show up in `Debug` output and are always compared in constant time.

use std::fmt;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::AuthResult;
use crate::error::AuthError;

/// Environment variable consulted by [`EnvSecretProvider::from_default_env`].
pub const JWT_SECRET_ENV: &str = "HMCP_JWT_SECRET";

/// Development-only signing secret, used when `signing.allow_insecure_default`
/// is enabled and nothing else is configured.
pub const INSECURE_DEFAULT_SECRET: &str = "hmcp-insecure-development-secret-change-me";

// =============================================================================
// Signing secret providers
// =============================================================================

/// Capability that yields the symmetric signing secret.
///
/// Implementations must be cheap to call; the secret is read once when the
/// signing service is built.
pub trait SecretProvider: Send + Sync {
    /// Returns the raw signing secret bytes.
    ///
    /// # Errors
    /// Returns `AuthError::Configuration` if no secret is available.
    fn signing_secret(&self) -> AuthResult<Vec<u8>>;
}

/// A provider holding a fixed secret, typically taken from configuration.
#[derive(Clone)]
pub struct StaticSecretProvider {
    secret: Vec<u8>,
}

impl StaticSecretProvider {
    /// Wraps the given secret.
    #[must_use]
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for StaticSecretProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticSecretProvider")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl SecretProvider for StaticSecretProvider {
    fn signing_secret(&self) -> AuthResult<Vec<u8>> {
        if self.secret.is_empty() {
            return Err(AuthError::configuration("signing secret is empty"));
        }
        Ok(self.secret.clone())
    }
}

/// A provider that reads the secret from an environment variable, falling
/// back to a configured secret when the variable is unset.
#[derive(Clone)]
pub struct EnvSecretProvider {
    var: String,
    fallback: Option<Vec<u8>>,
}

impl EnvSecretProvider {
    /// Reads from `var`, with an optional fallback secret.
    #[must_use]
    pub fn new(var: impl Into<String>, fallback: Option<Vec<u8>>) -> Self {
        Self {
            var: var.into(),
            fallback,
        }
    }

    /// Reads from [`JWT_SECRET_ENV`].
    #[must_use]
    pub fn from_default_env(fallback: Option<Vec<u8>>) -> Self {
        Self::new(JWT_SECRET_ENV, fallback)
    }

    /// Returns `true` if the environment variable is set to a non-empty value.
    #[must_use]
    pub fn is_set(&self) -> bool {
        std::env::var(&self.var).is_ok_and(|v| !v.is_empty())
    }
}

impl fmt::Debug for EnvSecretProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvSecretProvider")
            .field("var", &self.var)
            .field("has_fallback", &self.fallback.is_some())
            .finish()
    }
}

impl SecretProvider for EnvSecretProvider {
    fn signing_secret(&self) -> AuthResult<Vec<u8>> {
        match std::env::var(&self.var) {
            Ok(value) if !value.is_empty() => Ok(value.into_bytes()),
            _ => match &self.fallback {
                Some(secret) if !secret.is_empty() => Ok(secret.clone()),
                _ => Err(AuthError::configuration(format!(
                    "no signing secret: set {} or signing.secret",
                    self.var
                ))),
            },
        }
    }
}

// =============================================================================
// Client secrets
// =============================================================================

/// A client secret with redacted `Debug` and constant-time comparison.
#[derive(Clone)]
pub struct ClientSecret(String);

impl ClientSecret {
    /// Wraps a plaintext secret.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Compares a presented secret against this one.
    ///
    /// Both values are hashed first so the comparison does not leak the
    /// secret length through timing.
    #[must_use]
    pub fn matches(&self, presented: &str) -> bool {
        let expected = Sha256::digest(self.0.as_bytes());
        let provided = Sha256::digest(presented.as_bytes());
        provided.ct_eq(&expected).into()
    }

    /// Returns the plaintext secret.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ClientSecret([REDACTED])")
    }
}

impl From<&str> for ClientSecret {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ClientSecret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_secret_matches() {
        let secret = ClientSecret::new("s1");
        assert!(secret.matches("s1"));
        assert!(!secret.matches("s2"));
        assert!(!secret.matches(""));
        assert!(!secret.matches("s1 "));
    }

    #[test]
    fn test_client_secret_debug_is_redacted() {
        let secret = ClientSecret::new("super-secret");
        let debug = format!("{:?}", secret);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_static_provider() {
        let provider = StaticSecretProvider::new("abc");
        assert_eq!(provider.signing_secret().unwrap(), b"abc".to_vec());

        let empty = StaticSecretProvider::new(Vec::new());
        assert!(matches!(
            empty.signing_secret(),
            Err(AuthError::Configuration { .. })
        ));
    }

    #[test]
    fn test_env_provider_falls_back() {
        let provider = EnvSecretProvider::new(
            "HMCP_TEST_SECRET_THAT_IS_NEVER_SET",
            Some(b"fallback".to_vec()),
        );
        assert!(!provider.is_set());
        assert_eq!(provider.signing_secret().unwrap(), b"fallback".to_vec());

        let none = EnvSecretProvider::new("HMCP_TEST_SECRET_THAT_IS_NEVER_SET", None);
        assert!(none.signing_secret().is_err());
    }

    #[test]
    fn test_env_provider_reads_variable() {
        let var = "HMCP_TEST_SECRET_ENV_PROVIDER";
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var(var, "from-env") };
        let provider = EnvSecretProvider::new(var, Some(b"fallback".to_vec()));
        assert!(provider.is_set());
        assert_eq!(provider.signing_secret().unwrap(), b"from-env".to_vec());
        unsafe { std::env::remove_var(var) };
    }

    #[test]
    fn test_provider_debug_is_redacted() {
        let provider = StaticSecretProvider::new("very-secret");
        assert!(!format!("{:?}", provider).contains("very-secret"));
    }
}
