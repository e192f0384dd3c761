//! Small helpers shared by the server and client sides.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Generates a new client secret: 32 random bytes, URL-safe base64 without
/// padding (43 characters).
#[must_use]
pub fn generate_client_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Returns `true` if every required scope appears in the space-separated
/// `token_scope`.
#[must_use]
pub fn validate_scope<S: AsRef<str>>(required: &[S], token_scope: &str) -> bool {
    missing_scopes(required, token_scope).is_empty()
}

/// Required scopes absent from the space-separated `token_scope`, in order.
#[must_use]
pub fn missing_scopes<S: AsRef<str>>(required: &[S], token_scope: &str) -> Vec<String> {
    let granted: Vec<&str> = token_scope.split_whitespace().collect();
    required
        .iter()
        .map(AsRef::as_ref)
        .filter(|r| !granted.contains(r))
        .map(str::to_string)
        .collect()
}

/// Extracts the token from an `Authorization` header value.
///
/// The value must start with the literal `"Bearer "`; anything else, or an
/// empty token, yields `None`. The rest is returned untouched, so stray
/// whitespace ends up in the token and fails verification.
#[must_use]
pub fn parse_auth_header(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
}

/// Short, non-reversible identifier for a token, safe to log.
///
/// First 8 hex characters of the SHA-256 digest.
#[must_use]
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(8);
    hex
}
