//! Runs a handler's handle phase behind a fair queue.

use std::sync::Arc;

use async_trait::async_trait;
use ratelimit::{FairQueue, GateError};
use tracing::debug;
use wbot_core::{Handler, HandlerResponse, Result, Update};

/// Extracts the gate key from an update; None bypasses the gate.
pub type KeyFn = dyn Fn(&Update) -> Option<String> + Send + Sync;

/// Wraps `inner` so its handle phase runs once admitted by `gate` for the update's key.
/// A full queue drops the update silently (Stop, no reply).
pub struct GatedHandler {
    inner: Arc<dyn Handler>,
    gate: FairQueue,
    key: Box<KeyFn>,
}

impl GatedHandler {
    pub fn new(
        inner: Arc<dyn Handler>,
        gate: FairQueue,
        key: impl Fn(&Update) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner,
            gate,
            key: Box::new(key),
        }
    }
}

#[async_trait]
impl Handler for GatedHandler {
    async fn before(&self, update: &Update) -> Result<bool> {
        self.inner.before(update).await
    }

    async fn handle(&self, update: &Update) -> Result<HandlerResponse> {
        let Some(key) = (self.key)(update) else {
            return self.inner.handle(update).await;
        };

        match self.gate.run(&key, self.inner.handle(update)).await {
            Ok(response) => response,
            Err(GateError::Overloaded) => {
                debug!(
                    key = %key,
                    prefix = %self.gate.config().prefix,
                    update_id = update.update_id,
                    "Gate overloaded, dropping update"
                );
                Ok(HandlerResponse::Stop)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn after(&self, update: &Update, response: &HandlerResponse) -> Result<()> {
        self.inner.after(update, response).await
    }
}
