//! JWT encoding and decoding.
//!
//! Tokens are compact three-part JWTs signed with a symmetric HMAC algorithm.
//! The secret comes from a [`SecretProvider`] and is shared by the issuer and
//! the verifier.
//!
//! ## Supported Algorithms
//!
//! - **HS256**: HMAC with SHA-256 (default)
//! - **HS384**: HMAC with SHA-384
//! - **HS512**: HMAC with SHA-512
//!
//! ## Example
//!
//! ```
//! use hmcp_auth::secret::StaticSecretProvider;
//! use hmcp_auth::token::{JwtService, SigningAlgorithm, TokenClaims};
//!
//! let provider = StaticSecretProvider::new("secret");
//! let jwt = JwtService::from_provider(&provider, SigningAlgorithm::HS256).unwrap();
//!
//! let claims = TokenClaims::builder("HMCP_Server", "agent-1")
//!     .audience("https://hmcp-server.example.com")
//!     .scope("hmcp:access")
//!     .build();
//! let token = jwt.encode(&claims).unwrap();
//! assert_eq!(jwt.decode(&token).unwrap(), claims);
//! ```

use std::fmt;
use std::str::FromStr;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::AuthResult;
use crate::secret::SecretProvider;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during JWT operations.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to encode a token.
    #[error("Failed to encode token: {message}")]
    EncodingError {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode a token.
    #[error("Failed to decode token: {message}")]
    DecodingError {
        /// Description of the decoding error.
        message: String,
    },

    /// The token signature is invalid.
    #[error("Invalid signature")]
    InvalidSignature,

    /// A required claim is missing or has the wrong type.
    #[error("Invalid claims: {message}")]
    InvalidClaims {
        /// Description of why claims are invalid.
        message: String,
    },
}

impl JwtError {
    /// Creates a new `EncodingError`.
    #[must_use]
    pub fn encoding_error(message: impl Into<String>) -> Self {
        Self::EncodingError {
            message: message.into(),
        }
    }

    /// Creates a new `DecodingError`.
    #[must_use]
    pub fn decoding_error(message: impl Into<String>) -> Self {
        Self::DecodingError {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidClaims` error.
    #[must_use]
    pub fn invalid_claims(message: impl Into<String>) -> Self {
        Self::InvalidClaims {
            message: message.into(),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::MissingRequiredClaim(_) | ErrorKind::Json(_) => {
                Self::invalid_claims(err.to_string())
            }
            _ => Self::decoding_error(err.to_string()),
        }
    }
}

// ============================================================================
// Signing Algorithm
// ============================================================================

/// Supported signing algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SigningAlgorithm {
    /// HMAC with SHA-256.
    #[default]
    HS256,
    /// HMAC with SHA-384.
    HS384,
    /// HMAC with SHA-512.
    HS512,
}

impl SigningAlgorithm {
    /// Converts to the `jsonwebtoken` Algorithm type.
    #[must_use]
    pub fn to_jwt_algorithm(self) -> Algorithm {
        match self {
            Self::HS256 => Algorithm::HS256,
            Self::HS384 => Algorithm::HS384,
            Self::HS512 => Algorithm::HS512,
        }
    }

    /// Returns the algorithm name as used in JWT headers.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HS256 => "HS256",
            Self::HS384 => "HS384",
            Self::HS512 => "HS512",
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SigningAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HS256" => Ok(Self::HS256),
            "HS384" => Ok(Self::HS384),
            "HS512" => Ok(Self::HS512),
            other => Err(format!("unsupported signing algorithm: {other}")),
        }
    }
}

// ============================================================================
// Token Claims
// ============================================================================

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    /// Issuer.
    pub iss: String,

    /// Subject (the client id).
    pub sub: String,

    /// Audience.
    pub aud: String,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// JWT ID.
    pub jti: String,

    /// Space-separated scopes.
    pub scope: String,

    /// Patient context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient: Option<String>,
}

impl TokenClaims {
    /// Creates a new builder for token claims.
    #[must_use]
    pub fn builder(issuer: impl Into<String>, subject: impl Into<String>) -> TokenClaimsBuilder {
        TokenClaimsBuilder::new(issuer, subject)
    }

    /// Granted scopes, split on whitespace.
    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.scope.split_whitespace()
    }
}

/// Builder for [`TokenClaims`].
#[derive(Debug)]
pub struct TokenClaimsBuilder {
    iss: String,
    sub: String,
    aud: String,
    iat: i64,
    exp: i64,
    jti: String,
    scope: String,
    patient: Option<String>,
}

impl TokenClaimsBuilder {
    fn new(issuer: impl Into<String>, subject: impl Into<String>) -> Self {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        Self {
            iss: issuer.into(),
            sub: subject.into(),
            aud: String::new(),
            iat: now,
            exp: now + 3600, // Default 1 hour
            jti: uuid::Uuid::new_v4().to_string(),
            scope: String::new(),
            patient: None,
        }
    }

    /// Sets the audience.
    #[must_use]
    pub fn audience(mut self, aud: impl Into<String>) -> Self {
        self.aud = aud.into();
        self
    }

    /// Sets the issue instant; expiry keeps its current offset from it.
    #[must_use]
    pub fn issued_at(mut self, iat: OffsetDateTime) -> Self {
        let lifetime = self.exp - self.iat;
        self.iat = iat.unix_timestamp();
        self.exp = self.iat + lifetime;
        self
    }

    /// Sets the expiration time relative to the issue instant.
    #[must_use]
    pub fn expires_in(mut self, lifetime: time::Duration) -> Self {
        self.exp = self.iat + lifetime.whole_seconds();
        self
    }

    /// Sets the scopes.
    #[must_use]
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Sets the patient context.
    #[must_use]
    pub fn patient(mut self, patient: impl Into<String>) -> Self {
        self.patient = Some(patient.into());
        self
    }

    /// Builds the token claims.
    #[must_use]
    pub fn build(self) -> TokenClaims {
        TokenClaims {
            iss: self.iss,
            sub: self.sub,
            aud: self.aud,
            iat: self.iat,
            exp: self.exp,
            jti: self.jti,
            scope: self.scope,
            patient: self.patient,
        }
    }
}

// ============================================================================
// JWT Service
// ============================================================================

/// Service for encoding and decoding signed tokens.
///
/// Decoding checks the signature and structure only. Expiry, audience and
/// revocation are checked by the [`TokenVerifier`](super::TokenVerifier)
/// so that it controls their order.
pub struct JwtService {
    algorithm: SigningAlgorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    /// Creates a service from raw secret bytes.
    #[must_use]
    pub fn new(secret: &[u8], algorithm: SigningAlgorithm) -> Self {
        Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Creates a service using the secret yielded by `provider`.
    ///
    /// # Errors
    /// Returns `AuthError::Configuration` if the provider has no secret.
    pub fn from_provider(
        provider: &dyn SecretProvider,
        algorithm: SigningAlgorithm,
    ) -> AuthResult<Self> {
        let secret = provider.signing_secret()?;
        Ok(Self::new(&secret, algorithm))
    }

    /// Encodes claims into a JWT string.
    ///
    /// # Errors
    /// Returns an error if encoding fails.
    pub fn encode(&self, claims: &TokenClaims) -> Result<String, JwtError> {
        let header = Header::new(self.algorithm.to_jwt_algorithm());
        encode(&header, claims, &self.encoding_key)
            .map_err(|e| JwtError::encoding_error(e.to_string()))
    }

    /// Decodes a JWT string, verifying only its signature and structure.
    ///
    /// # Errors
    /// Returns an error if the token is malformed or the signature is invalid.
    pub fn decode(&self, token: &str) -> Result<TokenClaims, JwtError> {
        let mut validation = Validation::new(self.algorithm.to_jwt_algorithm());
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub", "aud"]);

        decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(JwtError::from)
    }

    /// Returns the signing algorithm.
    #[must_use]
    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }
}

impl fmt::Debug for JwtService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtService")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::StaticSecretProvider;

    fn claims() -> TokenClaims {
        TokenClaims::builder("HMCP_Server", "c1")
            .audience("https://hmcp-server.example.com")
            .scope("hmcp:access")
            .build()
    }

    #[test]
    fn test_encode_decode_all_algorithms() {
        for alg in [
            SigningAlgorithm::HS256,
            SigningAlgorithm::HS384,
            SigningAlgorithm::HS512,
        ] {
            let service = JwtService::new(b"secret", alg);
            let claims = claims();
            let token = service.encode(&claims).unwrap();
            assert_eq!(token.split('.').count(), 3);
            assert_eq!(service.decode(&token).unwrap(), claims);
        }
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = JwtService::new(b"secret-a", SigningAlgorithm::HS256);
        let verifier = JwtService::new(b"secret-b", SigningAlgorithm::HS256);
        let token = issuer.encode(&claims()).unwrap();
        assert!(matches!(
            verifier.decode(&token),
            Err(JwtError::InvalidSignature)
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        let service = JwtService::new(b"secret", SigningAlgorithm::HS256);
        assert!(service.decode("not-a-jwt").is_err());
        assert!(service.decode("").is_err());
    }

    #[test]
    fn test_expired_token_still_decodes() {
        let service = JwtService::new(b"secret", SigningAlgorithm::HS256);
        let claims = TokenClaims::builder("HMCP_Server", "c1")
            .audience("aud")
            .expires_in(time::Duration::seconds(-3600))
            .build();
        let token = service.encode(&claims).unwrap();
        assert_eq!(service.decode(&token).unwrap().exp, claims.exp);
    }

    #[test]
    fn test_patient_claim_omitted_when_absent() {
        let json = serde_json::to_value(claims()).unwrap();
        assert!(json.get("patient").is_none());

        let with_patient = TokenClaims::builder("HMCP_Server", "c1")
            .patient("p-42")
            .build();
        let json = serde_json::to_value(with_patient).unwrap();
        assert_eq!(json["patient"], "p-42");
    }

    #[test]
    fn test_builder_issued_at_keeps_lifetime() {
        let t0 = OffsetDateTime::from_unix_timestamp(1_000_000).unwrap();
        let claims = TokenClaims::builder("iss", "sub")
            .expires_in(time::Duration::hours(2))
            .issued_at(t0)
            .build();
        assert_eq!(claims.iat, 1_000_000);
        assert_eq!(claims.exp, 1_000_000 + 7200);
    }

    #[test]
    fn test_from_provider() {
        let provider = StaticSecretProvider::new("secret");
        let service = JwtService::from_provider(&provider, SigningAlgorithm::HS384).unwrap();
        assert_eq!(service.algorithm(), SigningAlgorithm::HS384);

        let empty = StaticSecretProvider::new(Vec::new());
        assert!(JwtService::from_provider(&empty, SigningAlgorithm::HS256).is_err());
    }

    #[test]
    fn test_algorithm_from_str() {
        assert_eq!("HS512".parse::<SigningAlgorithm>(), Ok(SigningAlgorithm::HS512));
        assert!("RS256".parse::<SigningAlgorithm>().is_err());
    }
}
