//! Authorized identity attached to requests.

use crate::middleware::decision::AuthorizationResult;

/// Identity of an authorized caller.
///
/// Inserted into request extensions by the authorization middleware and
/// read back by the [`BearerAuth`](super::BearerAuth) extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    /// Client the token was issued to.
    pub client_id: String,

    /// Scopes carried by the token.
    pub scopes: Vec<String>,

    /// Patient the token is bound to.
    pub patient_id: Option<String>,
}

impl AuthContext {
    /// Builds a context from an ALLOW result that carries an identity.
    ///
    /// Returns `None` for DENY results and for the token endpoint bypass.
    #[must_use]
    pub fn from_result(result: &AuthorizationResult) -> Option<Self> {
        if !result.allowed {
            return None;
        }
        let client_id = result.client_id.clone()?;
        Some(Self {
            client_id,
            scopes: result.granted_scopes.clone(),
            patient_id: result.patient_id.clone(),
        })
    }

    /// Checks if the token has a specific scope (exact match).
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    /// Returns `true` if the request is bound to a patient.
    #[must_use]
    pub fn has_patient_context(&self) -> bool {
        self.patient_id.is_some()
    }
}
