//! Per-tenant update pump.
//!
//! One task per tenant drains its channel in arrival order. Direct messages with a lane are only
//! queued on the pump: the pump takes their place in the sender's rate-limit queue (dropping them
//! when it is full) and moves the wait and the handling to a task of their own, so a throttled
//! user never holds up business updates. A panic while processing an update is caught, logged
//! and counted. Cancellation is checked between updates; detached tasks are aborted on stop.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use handler_chain::HandlerChain;
use ratelimit::{FairQueue, GateError};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, Instrument};
use wbot_core::{
    DirectMessage, HandlerResponse, PlatformClient, Result, TenantId, Update, UpdateKind,
};

use crate::handlers::TenantChains;
use crate::metrics::RuntimeMetrics;

/// Everything a tenant pipeline needs to process updates.
pub struct Pipeline {
    pub tenant_id: TenantId,
    pub chains: TenantChains,
    pub client: Arc<dyn PlatformClient>,
    pub metrics: Arc<RuntimeMetrics>,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Rate-limit key of a direct message: the sender, or the chat when the sender is unknown.
pub(crate) fn sender_key(message: &DirectMessage) -> String {
    message
        .from
        .as_ref()
        .map_or(message.chat_id, |sender| sender.id)
        .to_string()
}

/// Shared by the pump and its detached tasks.
struct Worker {
    tenant_id: TenantId,
    client: Arc<dyn PlatformClient>,
    metrics: Arc<RuntimeMetrics>,
}

impl Worker {
    /// Runs `chain` for one update; errors and panics are logged and counted, never propagated.
    async fn process_isolated(&self, chain: &HandlerChain, update: &Update) {
        let handler = update.kind_name();
        let started = Instant::now();
        match AssertUnwindSafe(self.process(chain, update))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                self.metrics.record_error(self.tenant_id, handler);
                error!(
                    error = %e,
                    update_id = update.update_id,
                    kind = handler,
                    "Handler chain failed"
                );
            }
            Err(payload) => {
                self.metrics.record_panic(self.tenant_id, handler);
                error!(
                    panic = %panic_message(payload.as_ref()),
                    update_id = update.update_id,
                    kind = handler,
                    "Handler panicked, continuing with next update"
                );
            }
        }
        self.metrics
            .record_duration(self.tenant_id, handler, started.elapsed());
    }

    async fn process(&self, chain: &HandlerChain, update: &Update) -> Result<()> {
        let response = chain.handle(update).await?;
        if let (HandlerResponse::Reply(text), UpdateKind::DirectMessage(message)) =
            (&response, &update.kind)
        {
            self.client.send_text(message.chat_id, text).await?;
        }
        Ok(())
    }
}

struct DetachedLane {
    limiter: FairQueue,
    chain: Arc<HandlerChain>,
}

impl Pipeline {
    /// Spawns the pump; it stops when `cancel` fires or every sender is dropped.
    pub fn spawn(
        self,
        updates: mpsc::Receiver<Update>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let span = tracing::info_span!("tenant_pipeline", tenant_id = self.tenant_id);
        tokio::spawn(self.run(updates, cancel).instrument(span))
    }

    async fn run(self, mut updates: mpsc::Receiver<Update>, cancel: CancellationToken) {
        let Pipeline {
            tenant_id,
            chains,
            client,
            metrics,
        } = self;
        let worker = Arc::new(Worker {
            tenant_id,
            client,
            metrics,
        });
        let ordered = chains.ordered;
        let direct = chains.direct.map(|lane| DetachedLane {
            limiter: lane.limiter,
            chain: Arc::new(lane.chain),
        });
        let mut detached = JoinSet::new();

        info!("Pipeline started");
        loop {
            let update = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                Some(_) = detached.join_next(), if !detached.is_empty() => continue,
                next = updates.recv() => match next {
                    Some(update) => update,
                    None => break,
                },
            };
            worker.metrics.record_request(tenant_id, update.kind_name());

            let lane_key = match (&direct, &update.kind) {
                (Some(_), UpdateKind::DirectMessage(message)) => Some(sender_key(message)),
                _ => None,
            };
            let (Some(lane), Some(key)) = (&direct, lane_key) else {
                worker.process_isolated(&ordered, &update).await;
                continue;
            };

            match lane.limiter.enqueue(&key).await {
                Ok(admission) => {
                    let worker = worker.clone();
                    let chain = lane.chain.clone();
                    detached.spawn(
                        async move {
                            let handled = admission
                                .run(worker.process_isolated(&chain, &update))
                                .await;
                            if let Err(e) = handled {
                                worker.metrics.record_error(tenant_id, update.kind_name());
                                error!(
                                    error = %e,
                                    update_id = update.update_id,
                                    "Direct message was not admitted"
                                );
                            }
                        }
                        .in_current_span(),
                    );
                }
                Err(GateError::Overloaded) => {
                    worker.metrics.record_dropped(tenant_id, update.kind_name());
                    debug!(
                        key = %key,
                        update_id = update.update_id,
                        "Rate limit queue full, dropping update"
                    );
                }
                Err(e) => {
                    worker.metrics.record_error(tenant_id, update.kind_name());
                    error!(
                        error = %e,
                        update_id = update.update_id,
                        "Failed to queue direct message"
                    );
                }
            }
        }
        detached.shutdown().await;
        info!("Pipeline stopped");
    }
}
