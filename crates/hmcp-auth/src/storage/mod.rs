//! In-memory stores for authentication state.
//!
//! Both stores are read by every concurrent request and written rarely, so
//! they are backed by `dashmap` sharded maps: reads never take a global lock
//! and writes only hold a single shard briefly.
//!
//! - [`CredentialStore`] - registered client identities
//! - [`RevocationSet`] - revoked token strings

pub mod client;
pub mod revoked_token;

pub use client::CredentialStore;
pub use revoked_token::RevocationSet;
