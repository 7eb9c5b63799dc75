//! Wire-level tests for the HTTP gateway against a local mock server.

use mockito::Matcher;
use serde_json::json;

use campus_notify::{
    GatewayError, HttpNotificationGateway, NotificationDispatcher, NotificationGateway,
    NotificationRequest, NotificationType,
};

fn maintenance_request() -> NotificationRequest {
    NotificationRequest::builder("Maintenance", "System maintenance at 2am")
        .kind(NotificationType::Announcement)
        .send_all(true)
        .build()
}

#[tokio::test]
async fn posts_camel_case_json_with_bearer_header() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/notifications/send-by-condition")
        .match_header("authorization", "Bearer admin-token")
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(json!({
            "title": "Maintenance",
            "body": "System maintenance at 2am",
            "type": "announcement",
            "sendAll": true,
            "facultyCodes": [],
            "userNames": [],
        })))
        .with_status(200)
        .create_async()
        .await;

    let gateway = HttpNotificationGateway::new(&server.url()).unwrap();
    gateway
        .deliver(&maintenance_request(), "admin-token")
        .await
        .unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn targeting_lists_travel_on_the_wire() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/notifications/send-by-condition")
        .match_body(Matcher::PartialJson(json!({
            "classCodes": ["CS101-A", "CS101-B"],
            "courseCodes": ["CS101"],
            "sendAll": false,
        })))
        .with_status(204)
        .create_async()
        .await;

    let request = NotificationRequest::builder("Room change", "Lecture moved to B-204")
        .course_codes(["CS101"])
        .class_codes(["CS101-A", "CS101-B"])
        .build();

    let gateway = HttpNotificationGateway::new(&server.url()).unwrap();
    // Any 2xx counts as acceptance
    gateway.deliver(&request, "token").await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn structured_error_body_is_extracted() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/notifications/send-by-condition")
        .with_status(429)
        .with_header("content-type", "application/json")
        .with_body(r#"{"message": "quota exceeded"}"#)
        .create_async()
        .await;

    let gateway = HttpNotificationGateway::new(&server.url()).unwrap();
    let err = gateway
        .deliver(&maintenance_request(), "token")
        .await
        .unwrap_err();

    match &err {
        GatewayError::Rejected { status, message } => {
            assert_eq!(*status, 429);
            assert_eq!(message.as_deref(), Some("quota exceeded"));
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    assert_eq!(err.surface_message(), "quota exceeded");
}

#[tokio::test]
async fn bodyless_rejection_keeps_status_only() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/notifications/send-by-condition")
        .with_status(502)
        .create_async()
        .await;

    let gateway = HttpNotificationGateway::new(&server.url()).unwrap();
    let err = gateway
        .deliver(&maintenance_request(), "token")
        .await
        .unwrap_err();

    match &err {
        GatewayError::Rejected { status, message } => {
            assert_eq!(*status, 502);
            assert!(message.is_none());
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    assert_eq!(
        err.surface_message(),
        "backend rejected request with status 502"
    );
}

#[tokio::test]
async fn dispatcher_retries_three_times_over_real_http() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/notifications/send-by-condition")
        .with_status(500)
        .with_header("content-type", "application/json")
        .with_body(r#"{"message": "backend unavailable"}"#)
        .expect(3)
        .create_async()
        .await;

    // Millisecond backoff: paused time would also trip the client's request timeout
    let retry = campus_notify::RetryPolicy {
        base_delay: std::time::Duration::from_millis(5),
        ..campus_notify::RetryPolicy::default()
    };
    let gateway = HttpNotificationGateway::new(&server.url()).unwrap();
    let dispatcher = NotificationDispatcher::with_retry(std::sync::Arc::new(gateway), retry);

    let result = dispatcher.dispatch(maintenance_request(), "token").await;

    assert!(result.is_err());
    mock.assert_async().await;
    assert_eq!(
        dispatcher.state().error.as_deref(),
        Some("backend unavailable")
    );
}
