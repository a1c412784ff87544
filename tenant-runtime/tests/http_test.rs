//! Integration tests for the HTTP surface built by [`tenant_runtime::app`].

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{
    credentials, registry_with, FakeConnector, FakePlatform, FixedChainFactory, PanickingHandler,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tenant_runtime::{app, AppState, ControlPlane, SECRET_HEADER};
use tower::ServiceExt;
use wbot_core::Capability;

fn test_app() -> (axum::Router, Arc<FakePlatform>) {
    let platform = Arc::new(FakePlatform::business(100, "watch_bot"));
    let plain = Arc::new(FakePlatform::new(300, "plain_bot", vec![Capability::InlineQueries]));
    let registry = Arc::new(registry_with(
        FakeConnector::default()
            .with("tok-100", platform.clone())
            .with("tok-300", plain),
        credentials(&[(100, "tok-100"), (300, "tok-300")]),
        Arc::new(FixedChainFactory::new(Arc::new(PanickingHandler::default()))),
    ));
    let state = AppState {
        router: registry.router().clone(),
        control: ControlPlane::new(registry),
    };
    (app(state), platform)
}

async fn call(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn control(method: Method, id: i64) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(format!("/control/tenants/{}", id))
        .body(Body::empty())
        .expect("request")
}

/// **Test: Control plane add, duplicate add, list and remove map to HTTP statuses.**
///
/// **Setup:** Credentials for tenants 100 (business capable) and 300 (not).
/// **Action:** Add 100 twice, add 300, list, remove 100, remove 100 again.
/// **Expected:** 201, 409, 412 with missing capabilities, list of one, 200, 404.
#[tokio::test]
async fn test_control_plane_routes() {
    let (app, _platform) = test_app();

    let (status, body) = call(&app, control(Method::POST, 100)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], 100);
    assert_eq!(body["display_name"], "watch_bot");

    let (status, body) = call(&app, control(Method::POST, 100)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_EXISTS");

    let (status, body) = call(&app, control(Method::POST, 300)).await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);
    assert_eq!(body["code"], "FAILED_PRECONDITION");
    assert_eq!(body["missing_capabilities"][0], "can_connect_to_business");

    let list = Request::builder()
        .uri("/control/tenants")
        .body(Body::empty())
        .expect("request");
    let (status, body) = call(&app, list).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));

    let (status, body) = call(&app, control(Method::DELETE, 100)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 100);

    let (status, body) = call(&app, control(Method::DELETE, 100)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

/// **Test: Webhook endpoint checks tenant and secret.**
///
/// **Setup:** Tenant 100 added through the control plane.
/// **Action:** Deliver to an unknown tenant, with a wrong secret, malformed, and valid.
/// **Expected:** 404, 401, 200, 200.
#[tokio::test]
async fn test_webhook_route() {
    let (app, platform) = test_app();
    let (status, _) = call(&app, control(Method::POST, 100)).await;
    assert_eq!(status, StatusCode::CREATED);
    let secret = platform.last_secret().expect("secret");

    let delivery = |path: &str, secret: &str, body: &str| {
        Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(SECRET_HEADER, secret)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    };
    let valid = r#"{"update_id": 1, "message": {"message_id": 1, "chat": {"id": 5, "type": "private"}, "date": 1, "text": "hi"}}"#;

    let (status, _) = call(&app, delivery("/bot_999", &secret, valid)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, delivery("/bot_100", "wrong", valid)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&app, delivery("/bot_100", &secret, "{broken")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&app, delivery("/bot_100", &secret, valid)).await;
    assert_eq!(status, StatusCode::OK);
}
