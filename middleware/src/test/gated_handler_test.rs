//! Unit tests for GatedHandler.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ratelimit::{FairQueue, MemoryQueueStore};
use tokio::sync::Notify;
use wbot_core::{DirectMessage, Handler, HandlerResponse, Sender, Update, UpdateKind};

use crate::GatedHandler;

struct HoldingHandler {
    calls: Arc<AtomicUsize>,
    release: Arc<Notify>,
}

#[async_trait]
impl Handler for HoldingHandler {
    async fn handle(&self, _update: &Update) -> wbot_core::Result<HandlerResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.release.notified().await;
        Ok(HandlerResponse::Reply("done".to_string()))
    }
}

fn direct_from(user_id: Option<i64>) -> Update {
    Update {
        update_id: 1,
        kind: UpdateKind::DirectMessage(DirectMessage {
            message_id: 1,
            chat_id: 9,
            from: user_id.map(|id| Sender {
                id,
                ..Sender::default()
            }),
            text: "/start".to_string(),
        }),
    }
}

fn sender_key(update: &Update) -> Option<String> {
    match &update.kind {
        UpdateKind::DirectMessage(m) => m.from.as_ref().map(|f| f.id.to_string()),
        _ => None,
    }
}

#[tokio::test(start_paused = true)]
async fn test_full_queue_stops_silently() {
    let calls = Arc::new(AtomicUsize::new(0));
    let release = Arc::new(Notify::new());
    let gate = FairQueue::isolation_gate(Arc::new(MemoryQueueStore::new()), "test", 1);
    let handler = Arc::new(GatedHandler::new(
        Arc::new(HoldingHandler {
            calls: calls.clone(),
            release: release.clone(),
        }),
        gate,
        sender_key,
    ));

    let first = {
        let handler = handler.clone();
        tokio::spawn(async move { handler.handle(&direct_from(Some(7))).await })
    };
    tokio::time::sleep(Duration::from_millis(1)).await;

    let dropped = handler.handle(&direct_from(Some(7))).await.unwrap();
    assert_eq!(dropped, HandlerResponse::Stop);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    release.notify_one();
    assert_eq!(
        first.await.unwrap().unwrap(),
        HandlerResponse::Reply("done".to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn test_update_without_key_bypasses_gate() {
    let calls = Arc::new(AtomicUsize::new(0));
    let release = Arc::new(Notify::new());
    let gate = FairQueue::isolation_gate(Arc::new(MemoryQueueStore::new()), "test", 0);
    let handler = GatedHandler::new(
        Arc::new(HoldingHandler {
            calls: calls.clone(),
            release: release.clone(),
        }),
        gate,
        sender_key,
    );

    release.notify_one();
    let response = handler.handle(&direct_from(None)).await.unwrap();

    assert_eq!(response, HandlerResponse::Reply("done".to_string()));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
