//! In-process queue store. Waiters are woken through a per-key [`Notify`].
//!
//! Only the head's lease is tracked: it restarts whenever a ticket reaches the head and on every
//! [`QueueStore::touch`].

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::warn;

use super::{QueueStore, DEFAULT_TICKET_LEASE};
use crate::error::GateError;
use crate::ticket::Ticket;

const COUNTER_PRUNE_THRESHOLD: usize = 1024;

struct Queued {
    ticket: Ticket,
    lease_until: Instant,
}

struct KeyQueue {
    tickets: VecDeque<Queued>,
    changed: Arc<Notify>,
}

impl KeyQueue {
    fn position(&self, ticket: &Ticket) -> Option<usize> {
        self.tickets.iter().position(|q| &q.ticket == ticket)
    }

    /// Restarts the lease of whichever ticket is now at the head.
    fn promote_head(&mut self, lease: Duration) {
        if let Some(head) = self.tickets.front_mut() {
            head.lease_until = Instant::now() + lease;
        }
        self.changed.notify_waiters();
    }
}

fn not_queued(key: &str, ticket: &Ticket) -> GateError {
    GateError::Store(format!("ticket {} is not queued at {}", ticket, key))
}

enum HeadState {
    Acquired,
    Behind {
        changed: Arc<Notify>,
        head_expires: Instant,
    },
}

struct Counter {
    count: u64,
    expires_at: Option<Instant>,
}

impl Counter {
    fn expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

pub struct MemoryQueueStore {
    queues: Mutex<HashMap<String, KeyQueue>>,
    counters: Mutex<HashMap<String, Counter>>,
    lease: Duration,
}

impl Default for MemoryQueueStore {
    fn default() -> Self {
        Self {
            queues: Mutex::default(),
            counters: Mutex::default(),
            lease: DEFAULT_TICKET_LEASE,
        }
    }
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    /// Evicts an expired head that is not `ticket`, then reports where `ticket` stands.
    async fn head_state(&self, key: &str, ticket: &Ticket) -> Result<HeadState, GateError> {
        let mut queues = self.queues.lock().await;
        let queue = queues
            .get_mut(key)
            .filter(|q| q.position(ticket).is_some())
            .ok_or_else(|| not_queued(key, ticket))?;

        loop {
            let Some(head) = queue.tickets.front() else {
                return Err(GateError::Store(format!("queue {} is empty", key)));
            };
            if &head.ticket == ticket {
                return Ok(HeadState::Acquired);
            }
            if head.lease_until > Instant::now() {
                return Ok(HeadState::Behind {
                    changed: queue.changed.clone(),
                    head_expires: head.lease_until,
                });
            }
            warn!(key = %key, ticket = %head.ticket, "Evicting queue head with an expired lease");
            queue.tickets.pop_front();
            queue.promote_head(self.lease);
        }
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn try_enqueue(
        &self,
        key: &str,
        ticket: &Ticket,
        capacity: usize,
    ) -> Result<bool, GateError> {
        let mut queues = self.queues.lock().await;
        let queue = queues.entry(key.to_string()).or_insert_with(|| KeyQueue {
            tickets: VecDeque::new(),
            changed: Arc::new(Notify::new()),
        });
        if queue.tickets.len() >= capacity {
            return Ok(false);
        }
        queue.tickets.push_back(Queued {
            ticket: ticket.clone(),
            lease_until: Instant::now() + self.lease,
        });
        Ok(true)
    }

    async fn wait_until_head(&self, key: &str, ticket: &Ticket) -> Result<(), GateError> {
        loop {
            let HeadState::Behind {
                changed,
                head_expires,
            } = self.head_state(key, ticket).await?
            else {
                return Ok(());
            };

            let notified = changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            // A removal between the first check and enable() would otherwise be missed.
            if let HeadState::Acquired = self.head_state(key, ticket).await? {
                return Ok(());
            }
            tokio::select! {
                _ = notified => {}
                _ = tokio::time::sleep_until(head_expires) => {}
            }
        }
    }

    async fn touch(&self, key: &str, ticket: &Ticket) -> Result<(), GateError> {
        let mut queues = self.queues.lock().await;
        let queued = queues
            .get_mut(key)
            .and_then(|q| q.tickets.iter_mut().find(|q| &q.ticket == ticket))
            .ok_or_else(|| not_queued(key, ticket))?;
        queued.lease_until = Instant::now() + self.lease;
        Ok(())
    }

    async fn remove(&self, key: &str, ticket: &Ticket) -> Result<(), GateError> {
        let mut queues = self.queues.lock().await;
        if let Some(queue) = queues.get_mut(key) {
            if let Some(position) = queue.position(ticket) {
                queue.tickets.remove(position);
                if position == 0 {
                    queue.promote_head(self.lease);
                } else {
                    queue.changed.notify_waiters();
                }
            }
            if queue.tickets.is_empty() {
                queues.remove(key);
            }
        }
        Ok(())
    }

    async fn incr_window(&self, key: &str, window: Duration) -> Result<u64, GateError> {
        let now = Instant::now();
        let mut counters = self.counters.lock().await;
        if counters.len() > COUNTER_PRUNE_THRESHOLD {
            counters.retain(|_, c| !c.expired(now));
        }

        let counter = counters.entry(key.to_string()).or_insert(Counter {
            count: 0,
            expires_at: None,
        });
        if counter.expired(now) {
            counter.count = 0;
            counter.expires_at = None;
        }
        counter.count += 1;
        if counter.count == 1 || counter.expires_at.is_none() {
            counter.expires_at = Some(now + window);
        }
        Ok(counter.count)
    }

    async fn window_ttl(&self, key: &str) -> Result<Option<Duration>, GateError> {
        let now = Instant::now();
        let counters = self.counters.lock().await;
        Ok(counters
            .get(key)
            .and_then(|c| c.expires_at)
            .filter(|at| *at > now)
            .map(|at| at - now))
    }
}
