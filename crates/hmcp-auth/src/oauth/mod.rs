//! OAuth 2.0 client-credentials profile.
//!
//! - [`server`] - Authorization server facade (registration, issuance, revocation)
//! - [`client`] - Client-side credential cache
//! - [`token`] - Token endpoint request/response types
//!
//! The Authorization Code flow and OpenID Connect ID tokens are recognized
//! but refused with [`AuthError::NotImplemented`](crate::AuthError::NotImplemented).

pub mod client;
pub mod server;
pub mod token;

pub use client::OAuthClient;
pub use server::OAuthServer;
pub use token::{TokenError, TokenErrorCode, TokenRequest, TokenResponse};
