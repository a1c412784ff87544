//! Redis queue store shared by every process of a deployment.
//!
//! Redis lists carry no change notification, so waiters poll the head at a short interval.
//! Each ticket has a lease key (`{queue}:lease:{ticket}`) refreshed by its owner on every poll
//! and by [`QueueStore::touch`]; the queue list expires with the leases. A head whose lease key
//! is gone was left by a dead process and is removed by the next waiter.

use std::time::Duration;

use async_trait::async_trait;
use fred::prelude::*;
use tracing::{info, warn};

use super::{QueueStore, DEFAULT_TICKET_LEASE};
use crate::error::GateError;
use crate::ticket::Ticket;

const HEAD_POLL_INTERVAL: Duration = Duration::from_millis(50);

fn store_error(err: fred::error::Error) -> GateError {
    GateError::Store(err.to_string())
}

fn lease_key(key: &str, ticket: &str) -> String {
    format!("{}:lease:{}", key, ticket)
}

#[derive(Clone)]
pub struct RedisQueueStore {
    client: Client,
    poll_interval: Duration,
    lease: Duration,
}

impl RedisQueueStore {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            poll_interval: HEAD_POLL_INTERVAL,
            lease: DEFAULT_TICKET_LEASE,
        }
    }

    /// Connects to `redis_url` and waits until the connection is up.
    pub async fn connect(redis_url: &str) -> Result<Self, GateError> {
        let config = Config::from_url(redis_url).map_err(store_error)?;
        let client = Client::new(config, None, None, None);
        client.connect();
        client.wait_for_connect().await.map_err(store_error)?;

        info!("Connected to Redis");
        Ok(Self::new(client))
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    fn lease_millis(&self) -> i64 {
        self.lease.as_millis().max(1) as i64
    }

    async fn set_expiry(&self, key: &str, window: Duration) -> Result<(), GateError> {
        let seconds = window.as_secs().max(1) as i64;
        self.client
            .expire::<(), _>(key, seconds, None)
            .await
            .map_err(store_error)
    }

    /// Refreshes the ticket's lease and the list expiry. False when the lease was already gone.
    async fn renew(&self, key: &str, ticket: &Ticket) -> Result<bool, GateError> {
        let alive: bool = self
            .client
            .pexpire(lease_key(key, ticket.as_str()), self.lease_millis(), None)
            .await
            .map_err(store_error)?;
        self.client
            .pexpire::<(), _>(key, self.lease_millis(), None)
            .await
            .map_err(store_error)?;
        Ok(alive)
    }

    /// Removes `head` from the queue if its lease has expired. Returns true when it was evicted.
    async fn evict_if_stale(&self, key: &str, head: &str) -> Result<bool, GateError> {
        let leased: i64 = self
            .client
            .exists(lease_key(key, head))
            .await
            .map_err(store_error)?;
        if leased > 0 {
            return Ok(false);
        }
        warn!(key = %key, ticket = %head, "Evicting queue head with an expired lease");
        self.client
            .lrem::<i64, _, _>(key, 1, head)
            .await
            .map_err(store_error)?;
        Ok(true)
    }
}

#[async_trait]
impl QueueStore for RedisQueueStore {
    // LLEN then RPUSH is not atomic: concurrent arrivals may overshoot capacity by a few tickets.
    async fn try_enqueue(
        &self,
        key: &str,
        ticket: &Ticket,
        capacity: usize,
    ) -> Result<bool, GateError> {
        let len: i64 = self.client.llen(key).await.map_err(store_error)?;
        if len >= capacity as i64 {
            return Ok(false);
        }
        self.client
            .set::<(), _, _>(
                lease_key(key, ticket.as_str()),
                "1",
                Some(Expiration::PX(self.lease_millis())),
                None,
                false,
            )
            .await
            .map_err(store_error)?;
        self.client
            .rpush::<(), _, _>(key, ticket.as_str())
            .await
            .map_err(store_error)?;
        self.client
            .pexpire::<(), _>(key, self.lease_millis(), None)
            .await
            .map_err(store_error)?;
        Ok(true)
    }

    async fn wait_until_head(&self, key: &str, ticket: &Ticket) -> Result<(), GateError> {
        loop {
            if !self.renew(key, ticket).await? {
                return Err(GateError::Store(format!(
                    "ticket {} lost its lease at {}",
                    ticket, key
                )));
            }
            let head: Option<String> = self.client.lindex(key, 0).await.map_err(store_error)?;
            match head {
                Some(head) if head == ticket.as_str() => return Ok(()),
                Some(head) => {
                    if !self.evict_if_stale(key, &head).await? {
                        tokio::time::sleep(self.poll_interval).await;
                    }
                }
                None => {
                    return Err(GateError::Store(format!(
                        "ticket {} is not queued at {}",
                        ticket, key
                    )))
                }
            }
        }
    }

    async fn touch(&self, key: &str, ticket: &Ticket) -> Result<(), GateError> {
        if self.renew(key, ticket).await? {
            Ok(())
        } else {
            Err(GateError::Store(format!(
                "ticket {} lost its lease at {}",
                ticket, key
            )))
        }
    }

    async fn remove(&self, key: &str, ticket: &Ticket) -> Result<(), GateError> {
        self.client
            .lrem::<i64, _, _>(key, 1, ticket.as_str())
            .await
            .map_err(store_error)?;
        self.client
            .del::<(), _>(lease_key(key, ticket.as_str()))
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn incr_window(&self, key: &str, window: Duration) -> Result<u64, GateError> {
        let count: i64 = self.client.incr(key).await.map_err(store_error)?;
        if count == 1 {
            self.set_expiry(key, window).await?;
        } else {
            let ttl: i64 = self.client.ttl(key).await.map_err(store_error)?;
            if ttl == -1 {
                self.set_expiry(key, window).await?;
            }
        }
        Ok(count.max(0) as u64)
    }

    async fn window_ttl(&self, key: &str) -> Result<Option<Duration>, GateError> {
        let ttl: i64 = self.client.pttl(key).await.map_err(store_error)?;
        Ok((ttl > 0).then(|| Duration::from_millis(ttl as u64)))
    }
}
