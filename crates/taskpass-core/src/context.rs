//! Reactive session state shared by the front-end.
//!
//! `SessionContext` owns the in-memory session and is the only component
//! that talks to both the credential store and the API client. Its lifecycle
//! is explicit: construct with `new`, resolve the stored session once with
//! `init`, then use `sign_in` / `sign_out`. Subscribers created with
//! `subscribe` are woken on every state transition.

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::auth::{CredentialStore, SessionRecord, User};

/// Message for a login form submitted without username or password
pub const MISSING_CREDENTIALS_MESSAGE: &str = "Username and password required";

/// Current session as seen by the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// The credential store has not been read yet
    Unknown,
    Authenticated(SessionRecord),
    Unauthenticated,
}

impl SessionState {
    /// True until the stored session has been checked
    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Unknown)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    pub fn record(&self) -> Option<&SessionRecord> {
        match self {
            SessionState::Authenticated(record) => Some(record),
            _ => None,
        }
    }
}

/// Outcome of `SessionContext::sign_in`, for UI code to branch on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInResult {
    pub success: bool,
    pub message: Option<String>,
}

impl SignInResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Outcome of `SessionContext::sign_out`. The local session is gone either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignOutOutcome {
    /// The server acknowledged the logout
    Confirmed,
    /// The server could not be told; only the local session was cleared
    LocalOnly { reason: String },
}

/// What the profile panel can show.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileView {
    Available(User),
    Unavailable,
}

pub struct SessionContext {
    api: ApiClient,
    credentials: CredentialStore,
    state: watch::Sender<SessionState>,
}

impl SessionContext {
    pub fn new(api: ApiClient, credentials: CredentialStore) -> Self {
        let (state, _) = watch::channel(SessionState::Unknown);
        Self {
            api,
            credentials,
            state,
        }
    }

    /// Resolve the stored session. Only the first call changes state.
    pub fn init(&self) -> SessionState {
        if !self.state.borrow().is_loading() {
            return self.state();
        }

        let resolved = match self.credentials.load() {
            Some(record) => SessionState::Authenticated(record),
            None => SessionState::Unauthenticated,
        };

        let changed = self.state.send_if_modified(|state| {
            if state.is_loading() {
                *state = resolved;
                true
            } else {
                false
            }
        });
        debug!(
            changed,
            authenticated = self.state.borrow().is_authenticated(),
            "Session initialized"
        );
        self.state()
    }

    /// Snapshot of the current state
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Watch handle woken on every transition. Dropping it unsubscribes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub async fn sign_in(&self, username: &str, password: &str) -> SignInResult {
        if username.trim().is_empty() || password.is_empty() {
            self.settle_unauthenticated();
            return SignInResult::failure(MISSING_CREDENTIALS_MESSAGE);
        }

        match self.api.authenticate(username.trim(), password).await {
            Ok(record) => {
                self.state.send_replace(SessionState::Authenticated(record));
                SignInResult::ok()
            }
            Err(e) => {
                self.settle_unauthenticated();
                SignInResult::failure(e.to_string())
            }
        }
    }

    /// Leave the loading state after a failed sign-in; any other state is kept
    fn settle_unauthenticated(&self) {
        self.state.send_if_modified(|state| {
            if state.is_loading() {
                *state = SessionState::Unauthenticated;
                true
            } else {
                false
            }
        });
    }

    /// Sign out locally, telling the server when it is reachable.
    pub async fn sign_out(&self) -> SignOutOutcome {
        let outcome = match self.api.end_session().await {
            Ok(()) => SignOutOutcome::Confirmed,
            Err(e) => SignOutOutcome::LocalOnly {
                reason: e.to_string(),
            },
        };

        if let Err(e) = self.credentials.clear() {
            warn!(error = %e, "Failed to clear stored session on sign out");
        }

        self.state.send_replace(SessionState::Unauthenticated);
        info!(confirmed = outcome == SignOutOutcome::Confirmed, "Signed out");
        outcome
    }

    /// Profile of the signed-in user, or `Unavailable` when it cannot be shown.
    pub async fn fetch_profile(&self) -> ProfileView {
        if !self.state.borrow().is_authenticated() {
            return ProfileView::Unavailable;
        }

        match self.api.fetch_profile().await.and_then(|profile| profile.user) {
            Some(user) if user.has_email() => ProfileView::Available(user),
            Some(_) => {
                warn!("Profile has no email, treating as unavailable");
                ProfileView::Unavailable
            }
            None => ProfileView::Unavailable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_context(credentials: CredentialStore) -> SessionContext {
        let api = ApiClient::new("http://127.0.0.1:9", credentials.clone()).expect("client");
        SessionContext::new(api, credentials)
    }

    #[test]
    fn test_starts_loading() {
        let ctx = offline_context(CredentialStore::in_memory());
        assert!(ctx.state().is_loading());
        assert_eq!(ctx.state().record(), None);
    }

    #[test]
    fn test_init_without_stored_session() {
        let ctx = offline_context(CredentialStore::in_memory());
        assert_eq!(ctx.init(), SessionState::Unauthenticated);
    }

    #[test]
    fn test_init_restores_stored_session() {
        let credentials = CredentialStore::in_memory();
        let record = SessionRecord::new("stored", User::default());
        credentials.save(&record).expect("save");

        let ctx = offline_context(credentials);
        assert_eq!(ctx.init(), SessionState::Authenticated(record));
    }

    #[test]
    fn test_init_runs_once() {
        let credentials = CredentialStore::in_memory();
        let ctx = offline_context(credentials.clone());
        assert_eq!(ctx.init(), SessionState::Unauthenticated);

        credentials
            .save(&SessionRecord::new("late", User::default()))
            .expect("save");
        assert_eq!(ctx.init(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_sign_in_requires_both_fields() {
        let ctx = offline_context(CredentialStore::in_memory());
        ctx.init();

        let result = ctx.sign_in("  ", "secret").await;
        assert_eq!(result, SignInResult::failure(MISSING_CREDENTIALS_MESSAGE));

        let result = ctx.sign_in("bob", "").await;
        assert!(!result.success);
        assert_eq!(ctx.state(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_blank_sign_in_before_init_leaves_loading() {
        let ctx = offline_context(CredentialStore::in_memory());
        assert!(ctx.state().is_loading());

        let result = ctx.sign_in("", "").await;
        assert!(!result.success);
        assert_eq!(ctx.state(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_fetch_profile_when_signed_out() {
        let ctx = offline_context(CredentialStore::in_memory());
        ctx.init();
        assert_eq!(ctx.fetch_profile().await, ProfileView::Unavailable);
    }
}
