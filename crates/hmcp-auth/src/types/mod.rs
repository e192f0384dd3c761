//! Common types used across the authentication and authorization modules.
//!
//! ## Domain Types
//!
//! - [`ClientIdentity`] - A registered client with its secret and allowed scopes
//! - [`GrantType`] - OAuth grant types recognized by the token endpoint

pub mod client;

pub use client::{ClientIdentity, ClientValidationError, GrantType};
