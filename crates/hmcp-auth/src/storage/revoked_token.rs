//! Revocation set.
//!
//! Holds the exact token strings that have been revoked. Entries are never
//! removed; a revoked token stays revoked for the life of the process.

use dashmap::DashSet;

/// Set of revoked token strings.
///
/// Only the [`TokenVerifier`](crate::token::TokenVerifier) adds entries.
#[derive(Debug, Default)]
pub struct RevocationSet {
    tokens: DashSet<String>,
}

impl RevocationSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a token. Returns `true` if it was not already revoked.
    pub(crate) fn insert(&self, token: &str) -> bool {
        self.tokens.insert(token.to_string())
    }

    /// Returns `true` if this exact token string has been revoked.
    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    /// Number of revoked tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns `true` if nothing has been revoked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
