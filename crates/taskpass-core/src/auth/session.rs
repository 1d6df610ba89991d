use std::fmt;

use serde::{Deserialize, Serialize};

/// Token and user identity for a signed-in user.
///
/// Serialized as `{ "token": ..., "user": { ... } }`, the same shape the
/// auth endpoint returns under `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub token: String,
    #[serde(default)]
    pub user: User,
}

impl SessionRecord {
    pub fn new(token: impl Into<String>, user: User) -> Self {
        Self {
            token: token.into(),
            user,
        }
    }

    /// A record is only usable with a non-empty token.
    pub fn has_token(&self) -> bool {
        !self.token.trim().is_empty()
    }
}

/// Server-assigned user identifier; backends send either a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Number(i64),
    Text(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Number(id) => write!(f, "{}", id),
            UserId::Text(id) => f.write_str(id),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "lastName", default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl User {
    /// Get full name as "First Last", skipping missing parts
    pub fn full_name(&self) -> String {
        [self.name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn display_username(&self) -> &str {
        self.username.as_deref().unwrap_or("unknown")
    }

    /// The profile panel only shows users that carry an email address.
    pub fn has_email(&self) -> bool {
        self.email
            .as_deref()
            .map(|email| !email.trim().is_empty())
            .unwrap_or(false)
    }
}
