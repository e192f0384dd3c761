//! Token generation, validation, and revocation.
//!
//! - [`jwt`] - JWT encoding/decoding and claim types
//! - [`issuer`] - Token issuance for registered clients
//! - [`verifier`] - Token verification and the revocation set

pub mod issuer;
pub mod jwt;
pub mod verifier;

pub use issuer::{IssuedToken, TokenIssuer};
pub use jwt::{JwtError, JwtService, SigningAlgorithm, TokenClaims, TokenClaimsBuilder};
pub use verifier::TokenVerifier;
