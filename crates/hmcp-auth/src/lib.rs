//! # hmcp-auth
//!
//! Authentication and authorization for HMCP agent servers.
//!
//! This crate provides:
//! - OAuth 2.0 client-credentials token issuance with signed JWTs
//! - SMART-style scope analysis and patient context binding
//! - Token verification with a revocation set
//! - A request-time authorization decision engine and axum middleware
//! - A client-side credential cache for agents calling other agents
//!
//! ## Modules
//!
//! - [`config`] - Authentication and authorization configuration
//! - [`oauth`] - OAuth server facade, client cache and token endpoint types
//! - [`token`] - Token signing, issuance and verification
//! - [`smart`] - SMART-style scopes and patient context
//! - [`middleware`] - Decision engine and HTTP middleware
//! - [`storage`] - In-memory credential and revocation stores
//! - [`http`] - Axum HTTP handlers for OAuth endpoints
//! - [`secret`] - Signing and client secret handling

pub mod config;
pub mod error;
pub mod http;
pub mod middleware;
pub mod oauth;
pub mod secret;
pub mod smart;
pub mod storage;
pub mod token;
pub mod types;
pub mod utils;

pub use config::{AuthConfig, ClientConfig, ConfigError, SigningConfig};
pub use error::{AuthError, ErrorCategory, TokenValidationError};
pub use http::{revoke_handler, token_handler};
pub use middleware::{
    AuthContext, AuthState, AuthorizationEngine, AuthorizationResult, BearerAuth, Denial,
    DenyReason, authorization_middleware,
};
pub use oauth::{OAuthClient, OAuthServer, TokenError, TokenRequest, TokenResponse};
pub use secret::{ClientSecret, EnvSecretProvider, SecretProvider, StaticSecretProvider};
pub use smart::{ScopeAnalysis, ScopeError, analyze_scopes, requires_patient_context};
pub use storage::{CredentialStore, RevocationSet};
pub use token::{SigningAlgorithm, TokenClaims, TokenIssuer, TokenVerifier};
pub use types::{ClientIdentity, ClientValidationError, GrantType};

/// Type alias for authentication/authorization results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use hmcp_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::config::{AuthConfig, ConfigError};
    pub use crate::error::{AuthError, ErrorCategory, TokenValidationError};
    pub use crate::http::{revoke_handler, token_handler};
    pub use crate::middleware::{
        AuthContext, AuthState, AuthorizationEngine, BearerAuth, DenyReason,
        authorization_middleware,
    };
    pub use crate::oauth::{OAuthClient, OAuthServer, TokenRequest, TokenResponse};
    pub use crate::token::{TokenClaims, TokenVerifier};
    pub use crate::types::{ClientIdentity, ClientValidationError};
}
