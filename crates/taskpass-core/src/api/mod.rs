//! REST API client module for the session server.
//!
//! This module provides the `ApiClient` for the three session endpoints:
//! `POST /auth`, `GET /profile` and `POST /logout`.
//!
//! Protected endpoints use bearer token authentication. The token is read
//! from the `CredentialStore` on every request, never cached in the client.

pub mod client;
pub mod error;

pub use client::{ApiClient, ProfileResponse, REQUEST_TIMEOUT_SECS};
pub use error::{ApiError, INVALID_CREDENTIALS_MESSAGE};
