//! API client for the session server.
//!
//! This module provides the `ApiClient` struct for signing in, reading the
//! signed-in user's profile and ending the session.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auth::{CredentialStore, SessionRecord, User};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

const AUTH_PATH: &str = "/auth";
const PROFILE_PATH: &str = "/profile";
const LOGOUT_PATH: &str = "/logout";

#[derive(Debug, Serialize)]
struct AuthRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct AuthEnvelope {
    #[serde(default)]
    data: Option<SessionRecord>,
}

/// Body of `GET /profile`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileResponse {
    #[serde(default)]
    pub user: Option<User>,
}

/// API client for the session server.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    credentials: CredentialStore,
}

impl ApiClient {
    /// Create a new API client with the default request timeout
    pub fn new(
        base_url: impl Into<String>,
        credentials: CredentialStore,
    ) -> Result<Self, ApiError> {
        Self::with_timeout(
            base_url,
            credentials,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        )
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        credentials: CredentialStore,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Authorization header for a protected endpoint.
    /// The token is read from the credential store on every call.
    fn auth_headers(&self, path: &str) -> header::HeaderMap {
        let mut headers = header::HeaderMap::new();
        let Some(token) = self.credentials.token() else {
            warn!(path = path, "No stored token for protected request");
            return headers;
        };

        match header::HeaderValue::from_str(&format!("Bearer {}", token)) {
            Ok(mut value) => {
                value.set_sensitive(true);
                headers.insert(header::AUTHORIZATION, value);
                debug!(path = path, "Attached bearer token");
            }
            Err(e) => warn!(path = path, error = %e, "Stored token is not a valid header value"),
        }
        headers
    }

    /// Check if response is successful, returning an error with body if not.
    pub(crate) async fn check_response(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    // ===== Session Endpoints =====

    /// Sign in and persist the returned session record.
    ///
    /// Every failure is reported as `ApiError::InvalidCredentials`; the
    /// underlying cause is only logged.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<SessionRecord, ApiError> {
        match self.try_authenticate(username, password).await {
            Ok(record) => {
                info!(username = username, "Login successful");
                Ok(record)
            }
            Err(e) => {
                let cause = format!("{:#}", e);
                warn!(username = username, error = %cause, "Login failed");
                Err(ApiError::InvalidCredentials)
            }
        }
    }

    async fn try_authenticate(&self, username: &str, password: &str) -> Result<SessionRecord> {
        let response = self
            .client
            .post(self.url(AUTH_PATH))
            .json(&AuthRequest { username, password })
            .send()
            .await
            .context("Failed to send authentication request")?;

        let response = Self::check_response(response).await?;

        let envelope: AuthEnvelope = response
            .json()
            .await
            .context("Failed to parse auth response")?;

        let record = envelope
            .data
            .ok_or_else(|| anyhow!("Auth response has no session data"))?;

        if !record.has_token() {
            bail!("Auth response has an empty token");
        }

        self.credentials
            .save(&record)
            .context("Failed to persist session")?;

        Ok(record)
    }

    /// Fetch the signed-in user's profile.
    ///
    /// Returns `None` on any failure so callers can show "profile unavailable".
    pub async fn fetch_profile(&self) -> Option<ProfileResponse> {
        match self.try_fetch_profile().await {
            Ok(profile) => {
                debug!("Profile received");
                Some(profile)
            }
            Err(e) => {
                let cause = format!("{:#}", e);
                warn!(error = %cause, "Failed to fetch profile");
                None
            }
        }
    }

    async fn try_fetch_profile(&self) -> Result<ProfileResponse> {
        let response = self
            .client
            .get(self.url(PROFILE_PATH))
            .headers(self.auth_headers(PROFILE_PATH))
            .send()
            .await
            .context("Failed to send profile request")?;

        let response = Self::check_response(response).await?;

        let text = response
            .text()
            .await
            .context("Failed to read profile response body")?;

        if text.trim().is_empty() {
            bail!("Empty profile response");
        }

        serde_json::from_str(&text).context("Failed to parse profile response")
    }

    /// End the session on the server, then clear the stored record.
    ///
    /// The stored record is cleared even when the request fails; the request
    /// error is still returned.
    pub async fn end_session(&self) -> Result<(), ApiError> {
        let result = self.post_logout().await;

        if let Err(e) = self.credentials.clear() {
            warn!(error = %e, "Failed to clear stored session");
        }

        match result {
            Ok(()) => {
                info!("Session ended");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Logout request failed");
                Err(e)
            }
        }
    }

    async fn post_logout(&self) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url(LOGOUT_PATH))
            .headers(self.auth_headers(LOGOUT_PATH))
            .send()
            .await?;

        Self::check_response(response).await?;
        Ok(())
    }
}
