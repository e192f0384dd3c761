//! Credential store for registered clients.

use std::sync::Arc;

use dashmap::DashMap;

use crate::secret::ClientSecret;
use crate::types::{ClientIdentity, ClientValidationError};

/// Registry of known client identities.
///
/// Registering an id that already exists replaces the previous entry.
#[derive(Debug, Default)]
pub struct CredentialStore {
    clients: DashMap<String, Arc<ClientIdentity>>,
}

impl CredentialStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a client, overwriting any existing entry with the same id.
    ///
    /// # Errors
    /// Returns `ClientValidationError::EmptyClientId` if `client_id` is empty.
    pub fn register(
        &self,
        client_id: impl Into<String>,
        secret: impl Into<ClientSecret>,
        allowed_scopes: Vec<String>,
        redirect_uris: Vec<String>,
    ) -> Result<Arc<ClientIdentity>, ClientValidationError> {
        let identity = ClientIdentity::new(client_id, secret, allowed_scopes, redirect_uris);
        self.insert(identity)
    }

    /// Inserts a pre-built identity, overwriting any existing entry.
    ///
    /// # Errors
    /// Returns `ClientValidationError::EmptyClientId` if the id is empty.
    pub fn insert(
        &self,
        identity: ClientIdentity,
    ) -> Result<Arc<ClientIdentity>, ClientValidationError> {
        if identity.client_id.is_empty() {
            return Err(ClientValidationError::EmptyClientId);
        }

        let identity = Arc::new(identity);
        let replaced = self
            .clients
            .insert(identity.client_id.clone(), Arc::clone(&identity))
            .is_some();

        tracing::info!(
            client_id = %identity.client_id,
            scopes = ?identity.allowed_scopes,
            replaced,
            "Registered client"
        );

        Ok(identity)
    }

    /// Validates a client id and secret.
    ///
    /// The secret comparison runs in constant time.
    ///
    /// # Errors
    /// Returns `ClientNotFound` for unknown ids and `InvalidSecret` when the
    /// secret does not match.
    pub fn validate(&self, client_id: &str, secret: &str) -> Result<(), ClientValidationError> {
        let client = self
            .get(client_id)
            .ok_or_else(|| ClientValidationError::ClientNotFound {
                client_id: client_id.to_string(),
            })?;

        if client.secret.matches(secret) {
            Ok(())
        } else {
            Err(ClientValidationError::InvalidSecret)
        }
    }

    /// Looks up a client by id.
    #[must_use]
    pub fn get(&self, client_id: &str) -> Option<Arc<ClientIdentity>> {
        self.clients.get(client_id).map(|entry| Arc::clone(&entry))
    }

    /// Returns `true` if a client with this id is registered.
    #[must_use]
    pub fn contains(&self, client_id: &str) -> bool {
        self.clients.contains_key(client_id)
    }

    /// Number of registered clients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns `true` if no client is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scopes(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_register_and_validate() {
        let store = CredentialStore::new();
        store
            .register("c1", "s1", scopes(&["hmcp:access"]), Vec::new())
            .unwrap();

        assert!(store.validate("c1", "s1").is_ok());
        assert_eq!(
            store.validate("c1", "wrong"),
            Err(ClientValidationError::InvalidSecret)
        );
        assert_eq!(
            store.validate("c2", "s1"),
            Err(ClientValidationError::ClientNotFound {
                client_id: "c2".to_string()
            })
        );
    }

    #[test]
    fn test_register_overwrites() {
        let store = CredentialStore::new();
        store
            .register("c1", "old", scopes(&["hmcp:access"]), Vec::new())
            .unwrap();
        store
            .register("c1", "new", scopes(&["hmcp:read"]), Vec::new())
            .unwrap();

        assert_eq!(store.len(), 1);
        assert!(store.validate("c1", "new").is_ok());
        assert!(store.validate("c1", "old").is_err());
        assert_eq!(store.get("c1").unwrap().allowed_scopes, scopes(&["hmcp:read"]));
    }

    #[test]
    fn test_register_rejects_empty_id() {
        let store = CredentialStore::new();
        let result = store.register("", "s", Vec::new(), Vec::new());
        assert_eq!(result.unwrap_err(), ClientValidationError::EmptyClientId);
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_reads_and_registration() {
        let store = Arc::new(CredentialStore::new());
        store
            .register("base", "secret", scopes(&["hmcp:access"]), Vec::new())
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store
                        .register(format!("c{i}"), "s", Vec::new(), Vec::new())
                        .unwrap();
                    for _ in 0..100 {
                        assert!(store.validate("base", "secret").is_ok());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 9);
    }
}
