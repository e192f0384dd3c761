//! SMART-style scope handling.
//!
//! - Scope classification into resource scopes and context flags
//! - Patient-context detection
//! - Scope request validation at issuance

pub mod scopes;

pub use scopes::{
    LAUNCH_PATIENT, NON_RESOURCE_SCOPES, OPENID, PATIENT_PREFIX, ScopeAnalysis, ScopeError,
    analyze_scopes, requires_patient_context, validate_scope_request,
};
