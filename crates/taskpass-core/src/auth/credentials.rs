use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use keyring::Entry;
use thiserror::Error;
use tracing::{debug, warn};

use super::SessionRecord;

/// Keychain service name for all taskpass secrets
const SERVICE_NAME: &str = "taskpass";

/// Fixed key holding the JSON-serialized session record
pub const SESSION_KEY: &str = "session_token";

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Secure storage error: {0}")]
    Storage(String),

    #[error("Failed to serialize session record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Key-value backend for secret strings.
pub trait SecretStore: Send + Sync {
    /// Returns `Ok(None)` when nothing is stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, CredentialError>;
    fn set(&self, key: &str, value: &str) -> Result<(), CredentialError>;
    /// Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), CredentialError>;
}

/// Secrets in the OS keychain (Keychain, Credential Manager, Secret Service).
pub struct KeyringSecretStore {
    service: String,
}

impl KeyringSecretStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry, CredentialError> {
        Entry::new(&self.service, key)
            .map_err(|e| CredentialError::Storage(format!("Failed to create keyring entry: {}", e)))
    }
}

impl Default for KeyringSecretStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretStore for KeyringSecretStore {
    fn get(&self, key: &str) -> Result<Option<String>, CredentialError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(CredentialError::Storage(format!(
                "Failed to retrieve credential from keychain: {}",
                e
            ))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CredentialError> {
        self.entry(key)?.set_password(value).map_err(|e| {
            CredentialError::Storage(format!("Failed to store credential in keychain: {}", e))
        })
    }

    fn delete(&self, key: &str) -> Result<(), CredentialError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(CredentialError::Storage(format!(
                "Failed to delete credential from keychain: {}",
                e
            ))),
        }
    }
}

/// Process-local secrets, gone when the process exits.
#[derive(Default)]
pub struct MemorySecretStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, CredentialError> {
        self.values
            .lock()
            .map_err(|_| CredentialError::Storage("memory store lock poisoned".to_string()))
    }
}

impl SecretStore for MemorySecretStore {
    fn get(&self, key: &str) -> Result<Option<String>, CredentialError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CredentialError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CredentialError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// Stores the single session record.
/// Clone is cheap - the backend is shared.
#[derive(Clone)]
pub struct CredentialStore {
    backend: Arc<dyn SecretStore>,
}

impl CredentialStore {
    pub fn new(backend: Arc<dyn SecretStore>) -> Self {
        Self { backend }
    }

    /// Store backed by the OS keychain
    pub fn keyring() -> Self {
        Self::new(Arc::new(KeyringSecretStore::new()))
    }

    /// Store that lives only as long as the process
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySecretStore::new()))
    }

    /// Persist the record, replacing whatever was stored before
    pub fn save(&self, record: &SessionRecord) -> Result<(), CredentialError> {
        let contents = serde_json::to_string(record)?;
        self.backend.set(SESSION_KEY, &contents)?;
        debug!("Session record saved");
        Ok(())
    }

    /// Load the stored record.
    ///
    /// Missing, unreadable or token-less records all come back as `None`.
    pub fn load(&self) -> Option<SessionRecord> {
        let contents = match self.backend.get(SESSION_KEY) {
            Ok(Some(contents)) => contents,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Failed to read stored session");
                return None;
            }
        };

        match serde_json::from_str::<SessionRecord>(&contents) {
            Ok(record) if record.has_token() => Some(record),
            Ok(_) => {
                warn!("Stored session has an empty token, ignoring it");
                None
            }
            Err(e) => {
                warn!(error = %e, "Stored session is unreadable, treating as signed out");
                None
            }
        }
    }

    /// Bearer token of the stored record, read fresh from the backend
    pub fn token(&self) -> Option<String> {
        self.load().map(|record| record.token)
    }

    /// Delete the stored record
    pub fn clear(&self) -> Result<(), CredentialError> {
        self.backend.delete(SESSION_KEY)?;
        debug!("Session record cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::User;

    fn sample_record() -> SessionRecord {
        SessionRecord::new(
            "token-1",
            User {
                username: Some("bob".to_string()),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_save_then_load() {
        let store = CredentialStore::in_memory();
        store.save(&sample_record()).expect("save");

        assert_eq!(store.load(), Some(sample_record()));
        assert_eq!(store.token().as_deref(), Some("token-1"));
    }

    #[test]
    fn test_save_overwrites_previous_record() {
        let store = CredentialStore::in_memory();
        store.save(&sample_record()).expect("save");
        store
            .save(&SessionRecord::new("token-2", User::default()))
            .expect("save");

        assert_eq!(store.token().as_deref(), Some("token-2"));
    }

    #[test]
    fn test_load_missing_is_none() {
        assert_eq!(CredentialStore::in_memory().load(), None);
    }

    #[test]
    fn test_corrupted_record_is_none() {
        let backend = Arc::new(MemorySecretStore::new());
        backend.set(SESSION_KEY, "{not json").expect("set");
        let store = CredentialStore::new(backend);

        assert_eq!(store.load(), None);
        assert_eq!(store.token(), None);
    }

    #[test]
    fn test_empty_token_is_none() {
        let backend = Arc::new(MemorySecretStore::new());
        backend
            .set(SESSION_KEY, r#"{"token":"","user":{}}"#)
            .expect("set");

        assert_eq!(CredentialStore::new(backend).load(), None);
    }

    #[test]
    fn test_clear_removes_record() {
        let store = CredentialStore::in_memory();
        store.save(&sample_record()).expect("save");
        store.clear().expect("clear");

        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_clear_missing_is_ok() {
        let store = CredentialStore::in_memory();
        assert!(store.clear().is_ok());
        assert!(store.clear().is_ok());
    }

    #[test]
    fn test_clones_share_backend() {
        let store = CredentialStore::in_memory();
        let other = store.clone();
        store.save(&sample_record()).expect("save");

        assert!(other.load().is_some());
    }
}
