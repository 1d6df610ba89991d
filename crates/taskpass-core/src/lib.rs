//! Core library for taskpass.
//!
//! This crate holds everything the front-ends share:
//! - `auth`: the session record and the secure credential store
//! - `api`: the HTTP client for the auth, profile and logout endpoints
//! - `context`: reactive session state with sign-in/sign-out
//! - `tasks`: the local SQLite-backed to-do list
//! - `notifications`: local notification delivery and push sending
//! - `config`: configuration file and directory layout

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod notifications;
pub mod tasks;

pub use api::{ApiClient, ApiError, ProfileResponse};
pub use auth::{CredentialStore, SessionRecord, User, UserId};
pub use config::Config;
pub use context::{ProfileView, SessionContext, SessionState, SignInResult, SignOutOutcome};
pub use notifications::{Notification, NotificationHub, PushClient, PushMessage, Subscription};
pub use tasks::{Task, TaskStore, TaskStoreError};
