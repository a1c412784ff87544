//! Fair queue with an optional sliding counter.
//!
//! Per key: reject when the queue is full, enqueue a ticket, wait for the head, then (rate limiter
//! only) count the call in the current window and hold the head until the window has room.
//! The ticket is released when the call finishes, fails or is dropped, and its lease is renewed
//! while it is held.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::error::GateError;
use crate::store::QueueStore;
use crate::ticket::Ticket;

const MISSING_TTL_RETRY: Duration = Duration::from_millis(10);
/// Must stay well below the store's ticket lease.
const LEASE_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowLimit {
    pub limit: u64,
    pub window: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    /// Namespace of the queue and counter keys.
    pub prefix: String,
    pub queue_size: usize,
    /// None: isolation gate (queue only).
    pub window: Option<WindowLimit>,
}

impl GateConfig {
    pub fn rate_limited(prefix: &str, limit: u64, window: Duration, queue_size: usize) -> Self {
        Self {
            prefix: prefix.to_string(),
            queue_size,
            window: Some(WindowLimit { limit, window }),
        }
    }

    pub fn isolation(prefix: &str, queue_size: usize) -> Self {
        Self {
            prefix: prefix.to_string(),
            queue_size,
            window: None,
        }
    }
}

/// Holds a queued ticket; dropping it without [`QueueSlot::release`] releases it in the background.
struct QueueSlot {
    store: Arc<dyn QueueStore>,
    key: String,
    ticket: Ticket,
    released: bool,
}

impl QueueSlot {
    async fn release(mut self) {
        self.released = true;
        if let Err(e) = self.store.remove(&self.key, &self.ticket).await {
            warn!(
                key = %self.key,
                ticket = %self.ticket,
                error = %e,
                "Failed to release queue ticket"
            );
        }
    }

    /// Drives `work` while refreshing the ticket's lease.
    async fn keep_alive<T>(&self, work: impl Future<Output = T>) -> T {
        tokio::pin!(work);
        let mut refresh = tokio::time::interval(LEASE_REFRESH_INTERVAL);
        refresh.tick().await;
        loop {
            tokio::select! {
                output = &mut work => return output,
                _ = refresh.tick() => {
                    if let Err(e) = self.store.touch(&self.key, &self.ticket).await {
                        warn!(
                            key = %self.key,
                            ticket = %self.ticket,
                            error = %e,
                            "Failed to renew queue lease"
                        );
                    }
                }
            }
        }
    }
}

impl Drop for QueueSlot {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let store = self.store.clone();
            let key = std::mem::take(&mut self.key);
            let ticket = self.ticket.clone();
            handle.spawn(async move {
                if let Err(e) = store.remove(&key, &ticket).await {
                    warn!(
                        key = %key,
                        ticket = %ticket,
                        error = %e,
                        "Failed to release abandoned queue ticket"
                    );
                }
            });
        }
    }
}

/// A call with a place in its key's queue. Obtained from [`FairQueue::enqueue`]; the place is
/// kept in arrival order, so an admission can be moved to another task and run there.
pub struct Admission {
    queue: FairQueue,
    key: String,
    slot: QueueSlot,
}

impl Admission {
    /// Waits for the turn of this admission, runs `call` and releases the place.
    /// Waiting is not cancellable other than by dropping the future.
    pub async fn run<F, T>(self, call: F) -> Result<T, GateError>
    where
        F: Future<Output = T>,
    {
        let Admission { queue, key, slot } = self;
        let outcome = slot
            .keep_alive(async {
                queue.admit(&key, &slot).await?;
                Ok::<T, GateError>(call.await)
            })
            .await;
        slot.release().await;
        outcome
    }
}

/// Per-key FIFO gate. Built as a rate limiter ([`FairQueue::rate_limiter`]) or an isolation
/// gate ([`FairQueue::isolation_gate`]).
#[derive(Clone)]
pub struct FairQueue {
    store: Arc<dyn QueueStore>,
    config: Arc<GateConfig>,
}

impl FairQueue {
    pub fn new(store: Arc<dyn QueueStore>, config: GateConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    pub fn rate_limiter(
        store: Arc<dyn QueueStore>,
        prefix: &str,
        limit: u64,
        window: Duration,
        queue_size: usize,
    ) -> Self {
        Self::new(store, GateConfig::rate_limited(prefix, limit, window, queue_size))
    }

    pub fn isolation_gate(store: Arc<dyn QueueStore>, prefix: &str, queue_size: usize) -> Self {
        Self::new(store, GateConfig::isolation(prefix, queue_size))
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    fn queue_key(&self, key: &str) -> String {
        format!("{}:queue:{}", self.config.prefix, key)
    }

    fn counter_key(&self, key: &str) -> String {
        format!("{}:count:{}", self.config.prefix, key)
    }

    /// Takes a place in the queue of `key` without waiting. Fails with
    /// [`GateError::Overloaded`] when the queue is full.
    #[instrument(skip(self), fields(prefix = %self.config.prefix))]
    pub async fn enqueue(&self, key: &str) -> Result<Admission, GateError> {
        let queue_key = self.queue_key(key);
        let ticket = Ticket::next();

        if !self
            .store
            .try_enqueue(&queue_key, &ticket, self.config.queue_size)
            .await?
        {
            debug!(key = %key, queue_size = self.config.queue_size, "Queue full, dropping call");
            return Err(GateError::Overloaded);
        }

        Ok(Admission {
            queue: self.clone(),
            key: key.to_string(),
            slot: QueueSlot {
                store: self.store.clone(),
                key: queue_key,
                ticket,
                released: false,
            },
        })
    }

    /// Runs `call` once admitted for `key`. Fails with [`GateError::Overloaded`] without waiting
    /// when the key's queue is full.
    pub async fn run<F, T>(&self, key: &str, call: F) -> Result<T, GateError>
    where
        F: Future<Output = T>,
    {
        self.enqueue(key).await?.run(call).await
    }

    async fn admit(&self, key: &str, slot: &QueueSlot) -> Result<(), GateError> {
        self.store.wait_until_head(&slot.key, &slot.ticket).await?;

        let Some(WindowLimit { limit, window }) = self.config.window else {
            return Ok(());
        };

        let counter_key = self.counter_key(key);
        loop {
            let count = self.store.incr_window(&counter_key, window).await?;
            if count <= limit {
                return Ok(());
            }
            let wait = self
                .store
                .window_ttl(&counter_key)
                .await?
                .unwrap_or(MISSING_TTL_RETRY);
            debug!(
                key = %key,
                count,
                limit,
                wait_ms = wait.as_millis() as u64,
                "Window exhausted, holding queue head"
            );
            tokio::time::sleep(wait).await;
        }
    }
}
