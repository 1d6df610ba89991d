use std::time::Duration;

use reqwest::{header, Client};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::api::{ApiClient, ApiError, REQUEST_TIMEOUT_SECS};

use super::Notification;

/// Expo push gateway used by the mobile build
pub const DEFAULT_PUSH_URL: &str = "https://exp.host/--/api/v2/push/send";

#[derive(Error, Debug)]
pub enum PushError {
    #[error("Push token is empty")]
    EmptyToken,

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Body accepted by the push gateway.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushMessage {
    pub to: String,
    pub sound: String,
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
}

impl PushMessage {
    pub fn new(to: impl Into<String>, notification: &Notification) -> Self {
        Self {
            to: to.into(),
            sound: "default".to_string(),
            title: notification.title.clone(),
            body: notification.body.clone(),
            data: notification.data.clone(),
        }
    }
}

#[derive(Clone)]
pub struct PushClient {
    client: Client,
    url: String,
}

impl PushClient {
    pub fn new(url: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_timeout(url, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub async fn send(&self, message: &PushMessage) -> Result<(), PushError> {
        if message.to.trim().is_empty() {
            return Err(PushError::EmptyToken);
        }

        let response = self
            .client
            .post(&self.url)
            .header(header::ACCEPT, "application/json")
            .json(message)
            .send()
            .await
            .map_err(ApiError::from)?;

        match ApiClient::check_response(response).await {
            Ok(_) => {
                info!(title = %message.title, "Push message sent");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Push gateway rejected message");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_from_notification() {
        let notification =
            Notification::new("Alert", "Body").with_data(serde_json::json!({"someData": "x"}));
        let message = PushMessage::new("ExponentPushToken[abc]", &notification);

        let json = serde_json::to_value(&message).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "to": "ExponentPushToken[abc]",
                "sound": "default",
                "title": "Alert",
                "body": "Body",
                "data": {"someData": "x"}
            })
        );
    }

    #[tokio::test]
    async fn test_empty_token_is_rejected_locally() {
        let client = PushClient::new("http://127.0.0.1:9").expect("client");
        let message = PushMessage::new(" ", &Notification::new("a", "b"));

        assert!(matches!(client.send(&message).await, Err(PushError::EmptyToken)));
    }
}
