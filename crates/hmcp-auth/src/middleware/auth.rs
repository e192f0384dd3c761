//! Authorization middleware and Bearer extractor.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, middleware, routing::post};
//! use hmcp_auth::middleware::{AuthState, BearerAuth, authorization_middleware};
//!
//! async fn protected_handler(BearerAuth(auth): BearerAuth) -> String {
//!     format!("Hello, {}!", auth.client_id)
//! }
//!
//! let app = Router::new()
//!     .route("/messages", post(protected_handler))
//!     .route_layer(middleware::from_fn_with_state(
//!         auth_state.clone(),
//!         authorization_middleware,
//!     ))
//!     .with_state(auth_state);
//! ```

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{FromRef, FromRequestParts, State},
    http::{HeaderMap, Request, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::AuthResult;
use crate::oauth::OAuthServer;

use super::decision::{AuthorizationEngine, DenyReason};
use super::error::Denial;
use super::types::AuthContext;

// =============================================================================
// Auth State
// =============================================================================

/// Shared state for the authorization middleware and the OAuth handlers.
///
/// # Example
///
/// ```ignore
/// #[derive(Clone)]
/// struct AppState {
///     auth: AuthState,
///     // ... other state
/// }
///
/// impl FromRef<AppState> for AuthState {
///     fn from_ref(state: &AppState) -> Self {
///         state.auth.clone()
///     }
/// }
/// ```
#[derive(Clone, Debug)]
pub struct AuthState {
    /// Authorization server facade.
    pub server: Arc<OAuthServer>,

    /// Request-time decision engine.
    pub engine: Arc<AuthorizationEngine>,
}

impl AuthState {
    /// Creates the state around an OAuth server.
    #[must_use]
    pub fn new(server: Arc<OAuthServer>) -> Self {
        let engine = Arc::new(AuthorizationEngine::new(&server));
        Self { server, engine }
    }

    /// Builds an `OAuthServer` from its configuration and registers the
    /// static clients.
    ///
    /// # Errors
    /// Returns an error if the server cannot be built or a client is invalid.
    pub fn from_server(server: OAuthServer) -> AuthResult<Self> {
        server.register_configured_clients()?;
        Ok(Self::new(Arc::new(server)))
    }
}

fn authorization_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok())
}

// =============================================================================
// Middleware
// =============================================================================

/// Runs the authorization decision before the inner handler.
///
/// On ALLOW the caller's [`AuthContext`] is inserted into the request
/// extensions. On DENY the request never reaches the handler.
pub async fn authorization_middleware(
    State(state): State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let method = request.method().clone();
    let result = state
        .engine
        .decide(&path, authorization_header(request.headers()));

    match &result.denial_reason {
        None => {
            if let Some(context) = AuthContext::from_result(&result) {
                tracing::debug!(
                    client_id = %context.client_id,
                    path = %path,
                    method = %method,
                    patient = context.has_patient_context(),
                    "Request authorized"
                );
                request.extensions_mut().insert(context);
            }
            next.run(request).await
        }
        Some(reason) => {
            tracing::warn!(
                client_id = result.client_id.as_deref().unwrap_or("-"),
                path = %path,
                method = %method,
                reason = %reason,
                "Request denied"
            );
            Denial::new(reason.clone()).into_response()
        }
    }
}

// =============================================================================
// Bearer Auth Extractor
// =============================================================================

/// Axum extractor yielding the caller's [`AuthContext`].
///
/// Behind [`authorization_middleware`] it reads the context the middleware
/// inserted. Without the middleware it runs the decision itself.
///
/// # Example
///
/// ```ignore
/// async fn handler(BearerAuth(auth): BearerAuth) -> impl IntoResponse {
///     if auth.has_scope("hmcp:write") {
///         // Allow access
///     }
/// }
/// ```
pub struct BearerAuth(pub AuthContext);

impl<S> FromRequestParts<S> for BearerAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = Denial;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(context) = parts.extensions.get::<AuthContext>() {
            return Ok(BearerAuth(context.clone()));
        }

        let auth_state = AuthState::from_ref(state);
        let result = auth_state
            .engine
            .decide(parts.uri.path(), authorization_header(&parts.headers));

        if let Some(reason) = result.denial_reason.clone() {
            return Err(Denial::new(reason));
        }
        AuthContext::from_result(&result)
            .map(BearerAuth)
            .ok_or_else(|| Denial::new(DenyReason::MissingHeader))
    }
}

// =============================================================================
// Tests
// =============================================================================
