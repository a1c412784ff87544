//! Integration tests for per-tenant pipelines: panic isolation, direct-message replies and the
//! rate-limited direct lane.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{
    business_chain_factory, credentials, registry_with, FakeConnector, FakePlatform,
    FixedChainFactory, PanickingHandler, RecordingNotifier,
};
use serde_json::json;
use storage::{MessageStore, MessagesQuery};
use tenant_runtime::handlers::{DIRECT_LIMIT, STATUS_TEXT};
use tenant_runtime::{DispatchOutcome, TenantRegistry};

fn direct_message(update_id: i64, chat_id: i64, text: &str) -> Vec<u8> {
    json!({
        "update_id": update_id,
        "message": {
            "message_id": update_id,
            "chat": {"id": chat_id, "type": "private"},
            "from": {"id": chat_id, "is_bot": false, "first_name": "User"},
            "date": 1,
            "text": text
        }
    })
    .to_string()
    .into_bytes()
}

fn business_message(update_id: i64, message_id: i32, text: &str) -> Vec<u8> {
    json!({
        "update_id": update_id,
        "business_message": {
            "message_id": message_id,
            "business_connection_id": "bc-1",
            "chat": {"id": 555, "type": "private", "first_name": "Alice"},
            "from": {"id": 555, "is_bot": false, "first_name": "Alice"},
            "date": 1_700_000_000,
            "text": text
        }
    })
    .to_string()
    .into_bytes()
}

async fn wait_until(mut done: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

fn deliver(registry: &TenantRegistry, tenant_id: i64, secret: &str, body: &[u8]) {
    let outcome = registry
        .router()
        .dispatch(&format!("bot_{}", tenant_id), Some(secret), body);
    assert_eq!(outcome, DispatchOutcome::Accepted);
}

/// **Test: A panic in one update affects neither the next update nor another tenant.**
///
/// **Setup:** Tenants 100 and 200 share a handler that panics on "boom".
/// **Action:** Tenant 100 gets "boom" then "ok"; tenant 200 gets "ok".
/// **Expected:** Both "ok" updates handled; panics_total 1; events_total 3; both still running.
#[tokio::test]
async fn test_panic_is_isolated_per_update_and_tenant() {
    let a = Arc::new(FakePlatform::business(100, "bot_a"));
    let b = Arc::new(FakePlatform::business(200, "bot_b"));
    let handler = Arc::new(PanickingHandler::default());
    let registry = registry_with(
        FakeConnector::default()
            .with("tok-a", a.clone())
            .with("tok-b", b.clone()),
        credentials(&[(100, "tok-a"), (200, "tok-b")]),
        Arc::new(FixedChainFactory::new(handler.clone())),
    );
    registry.add_tenant(100).await.expect("add a");
    registry.add_tenant(200).await.expect("add b");
    let secret_a = a.last_secret().expect("secret a");
    let secret_b = b.last_secret().expect("secret b");

    deliver(&registry, 100, &secret_a, &direct_message(1, 10, "boom"));
    deliver(&registry, 100, &secret_a, &direct_message(2, 10, "ok"));
    deliver(&registry, 200, &secret_b, &direct_message(3, 20, "ok"));

    wait_until(|| handler.handled.load(Ordering::SeqCst) == 2).await;
    wait_until(|| registry.metrics().snapshot().events_total == 3).await;

    let metrics = registry.metrics().snapshot();
    assert_eq!(metrics.panics_total, 1);
    assert_eq!(metrics.handler_errors_total, 0);
    assert!(registry.get_tenant(100).expect("tenant a").running);
    assert!(registry.get_tenant(200).expect("tenant b").running);
}

/// **Test: /start is answered in the sender's chat.**
///
/// **Setup:** Tenant 100 with the business chain.
/// **Action:** Deliver "/start" from chat 42.
/// **Expected:** The platform client sends the status text to chat 42.
#[tokio::test]
async fn test_start_command_replies_with_status() {
    let platform = Arc::new(FakePlatform::business(100, "watch_bot"));
    let (factory, _store) = business_chain_factory(Arc::new(RecordingNotifier::default())).await;
    let registry = registry_with(
        FakeConnector::default().with("tok", platform.clone()),
        credentials(&[(100, "tok")]),
        Arc::new(factory),
    );
    registry.add_tenant(100).await.expect("add");
    let secret = platform.last_secret().expect("secret");

    deliver(&registry, 100, &secret, &direct_message(1, 42, "/start"));

    wait_until(|| !platform.sent().is_empty()).await;
    assert_eq!(platform.sent(), vec![(42, STATUS_TEXT.to_string())]);
}

/// **Test: A removed tenant's pipeline stops and its route answers unknown tenant.**
#[tokio::test]
async fn test_removed_tenant_stops_receiving() {
    let platform = Arc::new(FakePlatform::business(100, "watch_bot"));
    let handler = Arc::new(PanickingHandler::default());
    let registry = registry_with(
        FakeConnector::default().with("tok", platform.clone()),
        credentials(&[(100, "tok")]),
        Arc::new(FixedChainFactory::new(handler)),
    );
    registry.add_tenant(100).await.expect("add");
    let secret = platform.last_secret().expect("secret");
    registry.remove_tenant(100).await.expect("remove");

    let outcome = registry
        .router()
        .dispatch("bot_100", Some(&secret), &direct_message(1, 1, "ok"));

    assert_eq!(outcome, DispatchOutcome::UnknownTenant);
}

/// **Test: A throttled user neither blocks the tenant's business updates nor queues unbounded.**
///
/// **Setup:** Tenant 100 with the business chain; user 7 has used the 5 messages of the window.
/// **Action:** User 7 sends 4 more `/start`; then a business message arrives.
/// **Expected:** The 6th waits for the window, the 7th and 8th queue, the 9th is dropped at once;
/// the business message is archived right away; no 6th reply goes out.
#[tokio::test]
async fn test_rate_limited_user_does_not_stall_business_updates() {
    let platform = Arc::new(FakePlatform::business(100, "watch_bot"));
    let (factory, store) = business_chain_factory(Arc::new(RecordingNotifier::default())).await;
    let registry = registry_with(
        FakeConnector::default().with("tok", platform.clone()),
        credentials(&[(100, "tok")]),
        Arc::new(factory),
    );
    registry.add_tenant(100).await.expect("add");
    let secret = platform.last_secret().expect("secret");

    for i in 1..=DIRECT_LIMIT as i64 {
        deliver(&registry, 100, &secret, &direct_message(i, 7, "/start"));
        wait_until(|| platform.sent().len() == i as usize).await;
    }
    tokio::time::sleep(Duration::from_millis(50)).await;

    for i in 6..=9 {
        deliver(&registry, 100, &secret, &direct_message(i, 7, "/start"));
    }
    wait_until(|| registry.metrics().snapshot().dropped_total == 1).await;

    deliver(&registry, 100, &secret, &business_message(10, 1, "hello"));
    let query = MessagesQuery::new(555, vec![1], vec!["bc-1".to_string()]);
    let archived = tokio::time::timeout(Duration::from_secs(2), async {
        while store.get_latest(&query).await.expect("query").is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;

    assert!(archived.is_ok(), "business message waited behind the rate limiter");
    assert_eq!(platform.sent().len(), DIRECT_LIMIT as usize);
    let metrics = registry.metrics().snapshot();
    assert_eq!(metrics.handlers["message"].requests, 9);
    assert_eq!(metrics.handlers["message"].dropped, 1);
    assert_eq!(metrics.handlers["business_message"].requests, 1);
}

/// **Test: One end user has a single direct-message budget across every bot.**
///
/// **Setup:** Tenants 100 and 200 on one business chain factory and queue store.
/// **Action:** User 7 sends 5 `/start` to tenant 100, then one to tenant 200.
/// **Expected:** Tenant 100 answers all 5; tenant 200 holds the 6th for the window instead of
/// answering it, and nothing is dropped.
#[tokio::test]
async fn test_direct_budget_is_shared_across_tenants() {
    let a = Arc::new(FakePlatform::business(100, "bot_a"));
    let b = Arc::new(FakePlatform::business(200, "bot_b"));
    let (factory, _store) = business_chain_factory(Arc::new(RecordingNotifier::default())).await;
    let registry = registry_with(
        FakeConnector::default()
            .with("tok-a", a.clone())
            .with("tok-b", b.clone()),
        credentials(&[(100, "tok-a"), (200, "tok-b")]),
        Arc::new(factory),
    );
    registry.add_tenant(100).await.expect("add 100");
    registry.add_tenant(200).await.expect("add 200");
    let secret_a = a.last_secret().expect("secret a");
    let secret_b = b.last_secret().expect("secret b");

    for i in 1..=DIRECT_LIMIT as i64 {
        deliver(&registry, 100, &secret_a, &direct_message(i, 7, "/start"));
        wait_until(|| a.sent().len() == i as usize).await;
    }
    deliver(&registry, 200, &secret_b, &direct_message(6, 7, "/start"));
    wait_until(|| registry.metrics().snapshot().events_total == DIRECT_LIMIT as u64 + 1).await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(b.sent().is_empty(), "user 7 got a fresh budget on the second bot");
    assert_eq!(registry.metrics().snapshot().dropped_total, 0);
}
