//! Key-value backends for the fair queue: per-key FIFO lists and expiring counters.
//!
//! Every queued ticket carries a lease. A ticket at the head whose lease ran out belongs to a
//! caller that died without releasing it; the next waiter evicts it.

mod memory;
mod redis;

pub use memory::MemoryQueueStore;
pub use redis::RedisQueueStore;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::GateError;
use crate::ticket::Ticket;

/// Lease of a queued ticket unless refreshed with [`QueueStore::touch`].
pub const DEFAULT_TICKET_LEASE: Duration = Duration::from_secs(30);

#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Appends `ticket` to the queue at `key` unless it already holds `capacity` tickets.
    /// Returns false when the queue is full.
    async fn try_enqueue(
        &self,
        key: &str,
        ticket: &Ticket,
        capacity: usize,
    ) -> Result<bool, GateError>;

    /// Resolves once `ticket` is the head of the queue at `key`. A head with an expired lease
    /// is evicted on the way.
    async fn wait_until_head(&self, key: &str, ticket: &Ticket) -> Result<(), GateError>;

    /// Extends the lease of `ticket`.
    async fn touch(&self, key: &str, ticket: &Ticket) -> Result<(), GateError>;

    /// Removes `ticket` wherever it sits in the queue and wakes the waiters.
    async fn remove(&self, key: &str, ticket: &Ticket) -> Result<(), GateError>;

    /// Increments the counter at `key`. The first increment of a window, or an increment that
    /// finds the counter without an expiry, sets the expiry to `window`.
    async fn incr_window(&self, key: &str, window: Duration) -> Result<u64, GateError>;

    /// Time left until the counter at `key` expires; None if absent or without expiry.
    async fn window_ttl(&self, key: &str) -> Result<Option<Duration>, GateError>;
}
