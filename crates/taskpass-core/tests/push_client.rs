use std::time::Duration;

use serde_json::json;
use taskpass_core::api::ApiError;
use taskpass_core::notifications::{Notification, PushClient, PushError, PushMessage};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_send_posts_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/--/api/v2/push/send"))
        .and(header("accept", "application/json"))
        .and(body_json(json!({
            "to": "ExponentPushToken[xyz]",
            "sound": "default",
            "title": "You have an alert",
            "body": "Test message",
            "data": {"someData": "attached"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"status": "ok"}})))
        .expect(1)
        .mount(&server)
        .await;

    let client = PushClient::new(format!("{}/--/api/v2/push/send", server.uri())).expect("client");
    let notification = Notification::new("You have an alert", "Test message")
        .with_data(json!({"someData": "attached"}));

    client
        .send(&PushMessage::new("ExponentPushToken[xyz]", &notification))
        .await
        .expect("send");
}

#[tokio::test]
async fn test_send_reports_gateway_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("DeviceNotRegistered"))
        .mount(&server)
        .await;

    let client = PushClient::new(server.uri()).expect("client");
    let message = PushMessage::new("ExponentPushToken[gone]", &Notification::new("a", "b"));

    let err = client.send(&message).await.unwrap_err();
    assert!(matches!(
        err,
        PushError::Api(ApiError::InvalidResponse(ref body)) if body.contains("DeviceNotRegistered")
    ));
}

#[tokio::test]
async fn test_send_honors_configured_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let client =
        PushClient::with_timeout(server.uri(), Duration::from_millis(100)).expect("client");
    let message = PushMessage::new("ExponentPushToken[slow]", &Notification::new("a", "b"));

    match client.send(&message).await {
        Err(PushError::Api(ApiError::NetworkError(e))) => assert!(e.is_timeout()),
        other => panic!("expected a timeout, got {:?}", other),
    }
}
