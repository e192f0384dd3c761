//! HTTP handlers for OAuth endpoints.
//!
//! # Available Handlers
//!
//! - [`token`] - Token endpoint (`client_credentials` grant)
//! - [`revoke`] - Token revocation endpoint (RFC 7009)

pub mod revoke;
pub mod token;

pub use revoke::{RevocationForm, revoke_handler};
pub use token::token_handler;
