//! SMART-style scope analysis.
//!
//! Scopes are plain strings. A handful of them carry meaning beyond naming a
//! resource:
//!
//! - `openid` requests an OpenID Connect identity
//! - `patient/<scope>` binds `<scope>` to a single patient's records
//! - `launch/patient` asks for a patient context without naming a resource
//! - `profile` and `offline_access` are never resource scopes
//!
//! # Examples
//!
//! ```
//! use hmcp_auth::smart::scopes::analyze_scopes;
//!
//! let analysis = analyze_scopes(&["patient/Observation.read", "launch/patient", "openid"]);
//! assert!(analysis.resource_scopes.contains("Observation.read"));
//! assert!(analysis.has_patient_context);
//! assert!(analysis.has_openid);
//! ```

use std::collections::BTreeSet;

use crate::error::AuthError;

/// Prefix marking a patient-context scope.
pub const PATIENT_PREFIX: &str = "patient/";

/// Scope requesting a patient context at launch.
pub const LAUNCH_PATIENT: &str = "launch/patient";

/// Scope requesting an OpenID Connect identity.
pub const OPENID: &str = "openid";

/// Scopes that never name a resource.
pub const NON_RESOURCE_SCOPES: [&str; 3] = ["profile", "offline_access", LAUNCH_PATIENT];

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised when a requested scope string is malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    /// The scope string is empty.
    #[error("Empty scope string")]
    Empty,

    /// A scope token is not a well-formed scope.
    #[error("Invalid scope format: {0}")]
    InvalidFormat(String),

    /// A scope token is not among the supported scopes.
    #[error("Unsupported scope: {0}")]
    Unsupported(String),
}

impl From<ScopeError> for AuthError {
    fn from(err: ScopeError) -> Self {
        AuthError::invalid_scope(err.to_string())
    }
}

// ============================================================================
// Scope Analysis
// ============================================================================

/// Classification of a requested scope list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeAnalysis {
    /// Resource scopes, with the `patient/` prefix stripped.
    pub resource_scopes: BTreeSet<String>,

    /// A patient context was requested.
    pub has_patient_context: bool,

    /// An OpenID Connect identity was requested.
    pub has_openid: bool,
}

/// Classifies a list of scopes.
///
/// The main pass only treats `patient/`-prefixed scopes as patient context;
/// `launch/patient` is then applied as a separate check over the whole list.
#[must_use]
pub fn analyze_scopes<S: AsRef<str>>(scopes: &[S]) -> ScopeAnalysis {
    let mut analysis = ScopeAnalysis::default();

    for scope in scopes.iter().map(AsRef::as_ref) {
        if scope == OPENID {
            analysis.has_openid = true;
        } else if let Some(resource) = scope.strip_prefix(PATIENT_PREFIX) {
            analysis.has_patient_context = true;
            analysis.resource_scopes.insert(resource.to_string());
        } else if !NON_RESOURCE_SCOPES.contains(&scope) {
            analysis.resource_scopes.insert(scope.to_string());
        }
    }

    if scopes.iter().any(|s| s.as_ref() == LAUNCH_PATIENT) {
        analysis.has_patient_context = true;
    }

    analysis
}

/// Returns `true` if any scope binds the request to a patient.
///
/// Always agrees with [`ScopeAnalysis::has_patient_context`].
#[must_use]
pub fn requires_patient_context<S: AsRef<str>>(scopes: &[S]) -> bool {
    scopes.iter().map(AsRef::as_ref).any(|s| s.starts_with(PATIENT_PREFIX))
        || scopes.iter().any(|s| s.as_ref() == LAUNCH_PATIENT)
}

/// Checks a space-separated scope request against the supported scopes.
///
/// # Errors
/// Returns `ScopeError::Empty` for a blank request, `InvalidFormat` for a
/// bare `patient/` prefix and `Unsupported` for anything not listed in
/// `supported`.
pub fn validate_scope_request<S: AsRef<str>>(
    scope: &str,
    supported: &[S],
) -> Result<(), ScopeError> {
    let mut tokens = scope.split_whitespace().peekable();
    if tokens.peek().is_none() {
        return Err(ScopeError::Empty);
    }

    for token in tokens {
        if token == PATIENT_PREFIX {
            return Err(ScopeError::InvalidFormat(token.to_string()));
        }
        if !supported.iter().any(|s| s.as_ref() == token) {
            return Err(ScopeError::Unsupported(token.to_string()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_analyze_patient_launch_openid() {
        let analysis = analyze_scopes(&["patient/Observation.read", "launch/patient", "openid"]);
        assert_eq!(analysis.resource_scopes, set(&["Observation.read"]));
        assert!(analysis.has_patient_context);
        assert!(analysis.has_openid);
    }

    #[test]
    fn test_analyze_plain_scope() {
        let analysis = analyze_scopes(&["hmcp:access"]);
        assert_eq!(analysis.resource_scopes, set(&["hmcp:access"]));
        assert!(!analysis.has_patient_context);
        assert!(!analysis.has_openid);
    }

    #[test]
    fn test_analyze_launch_patient_alone_sets_context() {
        let analysis = analyze_scopes(&["launch/patient"]);
        assert!(analysis.resource_scopes.is_empty());
        assert!(analysis.has_patient_context);
    }

    #[test]
    fn test_analyze_skips_non_resource_scopes() {
        let analysis = analyze_scopes(&["profile", "offline_access", "openid", "hmcp:read"]);
        assert_eq!(analysis.resource_scopes, set(&["hmcp:read"]));
        assert!(analysis.has_openid);
        assert!(!analysis.has_patient_context);
    }

    #[test]
    fn test_analyze_empty() {
        let analysis = analyze_scopes::<&str>(&[]);
        assert_eq!(analysis, ScopeAnalysis::default());
    }

    #[test]
    fn test_requires_patient_context_matches_analysis() {
        let cases: [&[&str]; 6] = [
            &["hmcp:access"],
            &["patient/hmcp:read"],
            &["launch/patient"],
            &["openid", "profile"],
            &["hmcp:access", "patient/Observation.read"],
            &[],
        ];
        for scopes in cases {
            assert_eq!(
                requires_patient_context(scopes),
                analyze_scopes(scopes).has_patient_context,
                "disagreement for {scopes:?}"
            );
        }
    }

    #[test]
    fn test_validate_scope_request() {
        let supported = ["hmcp:access", "patient/hmcp:read", "openid"];
        assert!(validate_scope_request("hmcp:access openid", &supported).is_ok());
        assert_eq!(
            validate_scope_request("   ", &supported),
            Err(ScopeError::Empty)
        );
        assert_eq!(
            validate_scope_request("hmcp:access hmcp:admin", &supported),
            Err(ScopeError::Unsupported("hmcp:admin".to_string()))
        );
        assert_eq!(
            validate_scope_request("patient/", &supported),
            Err(ScopeError::InvalidFormat("patient/".to_string()))
        );
    }
}
