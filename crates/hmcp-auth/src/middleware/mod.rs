//! HTTP middleware for request authorization.
//!
//! - [`decision`]: the framework-independent decision engine
//! - [`auth`]: axum middleware and the [`BearerAuth`] extractor
//! - [`error`]: JSON error responses with `WWW-Authenticate` challenges

pub mod auth;
pub mod decision;
pub mod error;
pub mod types;

pub use auth::{AuthState, BearerAuth, authorization_middleware};
pub use decision::{AuthorizationEngine, AuthorizationResult, DenyReason};
pub use error::Denial;
pub use types::AuthContext;
