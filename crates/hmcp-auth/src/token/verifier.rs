//! Token verification and revocation.

use std::sync::Arc;

use time::OffsetDateTime;

use crate::error::TokenValidationError;
use crate::storage::RevocationSet;
use crate::token::jwt::{JwtService, TokenClaims};
use crate::utils::token_fingerprint;

/// Validates presented tokens.
///
/// Checks run in a fixed order and stop at the first failure:
///
/// 1. revocation (exact token string)
/// 2. signature and structure
/// 3. expiry (`now >= exp` is expired)
/// 4. audience
///
/// The issuer claim is not checked.
#[derive(Debug)]
pub struct TokenVerifier {
    jwt: Arc<JwtService>,
    revoked: RevocationSet,
    audience: String,
}

impl TokenVerifier {
    /// Creates a verifier with an empty revocation set.
    #[must_use]
    pub fn new(jwt: Arc<JwtService>, audience: impl Into<String>) -> Self {
        Self {
            jwt,
            revoked: RevocationSet::new(),
            audience: audience.into(),
        }
    }

    /// Verifies a token against the current time.
    ///
    /// # Errors
    /// Returns the first check that failed.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenValidationError> {
        self.verify_at(token, OffsetDateTime::now_utc())
    }

    /// Verifies a token against an explicit instant.
    ///
    /// # Errors
    /// Returns the first check that failed.
    pub fn verify_at(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> Result<TokenClaims, TokenValidationError> {
        let result = self.check(token, now);
        if let Err(reason) = &result {
            tracing::debug!(
                token = %token_fingerprint(token),
                reason = reason.code(),
                "Token verification failed"
            );
        }
        result
    }

    fn check(&self, token: &str, now: OffsetDateTime) -> Result<TokenClaims, TokenValidationError> {
        if self.revoked.contains(token) {
            return Err(TokenValidationError::Revoked);
        }

        let claims = self
            .jwt
            .decode(token)
            .map_err(|e| TokenValidationError::Malformed(e.to_string()))?;

        if now.unix_timestamp() >= claims.exp {
            return Err(TokenValidationError::Expired);
        }

        if claims.aud != self.audience {
            return Err(TokenValidationError::InvalidAudience);
        }

        Ok(claims)
    }

    /// Revokes a token. Revoking twice is a no-op.
    ///
    /// Returns `true` if the token was not already revoked.
    pub fn revoke(&self, token: &str) -> bool {
        let inserted = self.revoked.insert(token);
        if inserted {
            tracing::info!(token = %token_fingerprint(token), "Revoked token");
        }
        inserted
    }

    /// Revokes a token on behalf of `client_id`.
    ///
    /// A token that decodes to another client's subject is left alone and
    /// `false` is returned. Tokens that do not decode are revoked as-is.
    pub fn revoke_for_client(&self, token: &str, client_id: &str) -> bool {
        if let Ok(claims) = self.jwt.decode(token) {
            if claims.sub != client_id {
                tracing::warn!(
                    client_id = %client_id,
                    owner = %claims.sub,
                    token = %token_fingerprint(token),
                    "Refused to revoke token issued to another client"
                );
                return false;
            }
        }
        self.revoke(token)
    }

    /// Returns `true` if the exact token string has been revoked.
    #[must_use]
    pub fn is_revoked(&self, token: &str) -> bool {
        self.revoked.contains(token)
    }

    /// Expected audience.
    #[must_use]
    pub fn audience(&self) -> &str {
        &self.audience
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::jwt::SigningAlgorithm;
    use time::Duration;

    const AUD: &str = "https://hmcp-server.example.com";

    fn jwt() -> Arc<JwtService> {
        Arc::new(JwtService::new(b"secret", SigningAlgorithm::HS256))
    }

    fn token_at(jwt: &JwtService, iat: OffsetDateTime, aud: &str) -> String {
        let claims = TokenClaims::builder("HMCP_Server", "c1")
            .audience(aud)
            .expires_in(Duration::hours(1))
            .issued_at(iat)
            .scope("hmcp:access")
            .build();
        jwt.encode(&claims).unwrap()
    }

    #[test]
    fn test_valid_token() {
        let jwt = jwt();
        let verifier = TokenVerifier::new(Arc::clone(&jwt), AUD);
        let t0 = OffsetDateTime::now_utc();
        let token = token_at(&jwt, t0, AUD);

        let claims = verifier.verify_at(&token, t0).unwrap();
        assert_eq!(claims.sub, "c1");
        assert_eq!(claims.scope, "hmcp:access");
    }

    #[test]
    fn test_expiry_boundary() {
        let jwt = jwt();
        let verifier = TokenVerifier::new(Arc::clone(&jwt), AUD);
        let t0 = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let token = token_at(&jwt, t0, AUD);
        let expiry = t0 + Duration::hours(1);

        assert!(verifier.verify_at(&token, expiry - Duration::seconds(1)).is_ok());
        assert_eq!(
            verifier.verify_at(&token, expiry),
            Err(TokenValidationError::Expired)
        );
        assert_eq!(
            verifier.verify_at(&token, expiry + Duration::days(1)),
            Err(TokenValidationError::Expired)
        );
    }

    #[test]
    fn test_wrong_audience() {
        let jwt = jwt();
        let verifier = TokenVerifier::new(Arc::clone(&jwt), AUD);
        let t0 = OffsetDateTime::now_utc();
        let token = token_at(&jwt, t0, "https://other.example.com");
        assert_eq!(
            verifier.verify_at(&token, t0),
            Err(TokenValidationError::InvalidAudience)
        );
    }

    #[test]
    fn test_malformed_and_forged() {
        let verifier = TokenVerifier::new(jwt(), AUD);
        assert!(matches!(
            verifier.verify("garbage"),
            Err(TokenValidationError::Malformed(_))
        ));

        let forger = JwtService::new(b"not-the-secret", SigningAlgorithm::HS256);
        let forged = token_at(&forger, OffsetDateTime::now_utc(), AUD);
        assert!(matches!(
            verifier.verify(&forged),
            Err(TokenValidationError::Malformed(_))
        ));
    }

    #[test]
    fn test_revocation_is_sticky_and_checked_first() {
        let jwt = jwt();
        let verifier = TokenVerifier::new(Arc::clone(&jwt), AUD);
        let t0 = OffsetDateTime::now_utc();
        let token = token_at(&jwt, t0, AUD);

        assert!(verifier.revoke(&token));
        assert!(!verifier.revoke(&token));
        assert!(verifier.is_revoked(&token));
        for _ in 0..3 {
            assert_eq!(
                verifier.verify_at(&token, t0),
                Err(TokenValidationError::Revoked)
            );
        }

        // Revocation wins over expiry and malformation.
        assert_eq!(
            verifier.verify_at(&token, t0 + Duration::days(2)),
            Err(TokenValidationError::Revoked)
        );
        verifier.revoke("garbage");
        assert_eq!(
            verifier.verify("garbage"),
            Err(TokenValidationError::Revoked)
        );
    }

    #[test]
    fn test_revoke_for_client_checks_owner() {
        let jwt = jwt();
        let verifier = TokenVerifier::new(Arc::clone(&jwt), AUD);
        let t0 = OffsetDateTime::now_utc();
        let token = token_at(&jwt, t0, AUD);

        assert!(!verifier.revoke_for_client(&token, "c2"));
        assert!(!verifier.is_revoked(&token));
        assert!(verifier.verify_at(&token, t0).is_ok());

        assert!(verifier.revoke_for_client(&token, "c1"));
        assert_eq!(
            verifier.verify_at(&token, t0),
            Err(TokenValidationError::Revoked)
        );

        assert!(verifier.revoke_for_client("garbage", "c2"));
    }

    #[test]
    fn test_expiry_checked_before_audience() {
        let jwt = jwt();
        let verifier = TokenVerifier::new(Arc::clone(&jwt), AUD);
        let t0 = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let token = token_at(&jwt, t0, "https://other.example.com");
        assert_eq!(
            verifier.verify_at(&token, t0 + Duration::hours(2)),
            Err(TokenValidationError::Expired)
        );
    }
}
