//! # ratelimit
//!
//! Fair-queue admission per key. [`FairQueue::rate_limiter`] adds a sliding counter (at most
//! `limit` calls per `window`); [`FairQueue::isolation_gate`] only serializes calls per key and
//! bounds the queue. Queues and counters live in a [`QueueStore`]: in-process
//! ([`MemoryQueueStore`]) or Redis ([`RedisQueueStore`]).

mod error;
mod limiter;
mod store;
mod ticket;

pub use error::GateError;
pub use limiter::{Admission, FairQueue, GateConfig, WindowLimit};
pub use store::{MemoryQueueStore, QueueStore, RedisQueueStore, DEFAULT_TICKET_LEASE};
pub use ticket::Ticket;
