//! Authentication module for the persisted session.
//!
//! This module provides:
//! - `SessionRecord`: the token plus user identity returned by the auth endpoint
//! - `CredentialStore`: secure storage of that record via the OS keychain
//!
//! The record lives under a single fixed key and survives restarts.

pub mod credentials;
pub mod session;

pub use credentials::{
    CredentialError, CredentialStore, KeyringSecretStore, MemorySecretStore, SecretStore,
    SESSION_KEY,
};
pub use session::{SessionRecord, User, UserId};
