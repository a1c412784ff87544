//! Demultiplexes webhook deliveries to tenant pipelines.
//!
//! Each tenant is reachable at `/bot_{tenant_id}`; the route holds the tenant's update channel
//! and the secret the platform echoes in [`SECRET_HEADER`].

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};
use wbot_core::{TenantId, Update};

pub const SECRET_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";
/// Path segment prefix of a tenant route.
pub const ROUTE_PREFIX: &str = "bot_";
/// Pending updates buffered per tenant.
pub const CHANNEL_CAPACITY: usize = 128;

/// Result of one delivery, mapped to an HTTP status by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Queued for the tenant pipeline.
    Accepted,
    /// Payload will never decode; acknowledged so the platform does not resend it.
    Malformed,
    UnknownTenant,
    Unauthorized,
    /// Tenant channel is full; the platform should retry later.
    Busy,
}

struct Route {
    sender: mpsc::Sender<Update>,
    secret: String,
}

#[derive(Default)]
pub struct WebhookRouter {
    routes: RwLock<HashMap<TenantId, Route>>,
}

impl WebhookRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path a tenant's webhook is served under, relative to the base URL.
    pub fn route_path(tenant_id: TenantId) -> String {
        format!("/{}{}", ROUTE_PREFIX, tenant_id)
    }

    /// Tenant id embedded in a `bot_{id}` path segment.
    pub fn parse_route(segment: &str) -> Option<TenantId> {
        segment
            .trim_start_matches('/')
            .strip_prefix(ROUTE_PREFIX)?
            .parse()
            .ok()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<TenantId, Route>> {
        self.routes.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<TenantId, Route>> {
        self.routes.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Installs (or replaces) the route of `tenant_id` and returns the receiving end of its channel.
    pub fn register(&self, tenant_id: TenantId, secret: String) -> mpsc::Receiver<Update> {
        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
        self.write().insert(tenant_id, Route { sender, secret });
        debug!(tenant_id, "Registered webhook route");
        receiver
    }

    /// Returns false if no route existed.
    pub fn deregister(&self, tenant_id: TenantId) -> bool {
        let removed = self.write().remove(&tenant_id).is_some();
        if removed {
            debug!(tenant_id, "Removed webhook route");
        }
        removed
    }

    pub fn contains(&self, tenant_id: TenantId) -> bool {
        self.read().contains_key(&tenant_id)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Routes one delivery for the path segment `hook` (`bot_{id}`).
    pub fn dispatch(&self, hook: &str, secret: Option<&str>, body: &[u8]) -> DispatchOutcome {
        let Some(tenant_id) = Self::parse_route(hook) else {
            debug!(hook, "Webhook path without tenant id");
            return DispatchOutcome::UnknownTenant;
        };

        let sender = {
            let routes = self.read();
            let Some(route) = routes.get(&tenant_id) else {
                debug!(tenant_id, "Webhook for unknown tenant");
                return DispatchOutcome::UnknownTenant;
            };
            if secret != Some(route.secret.as_str()) {
                warn!(tenant_id, "Webhook secret mismatch");
                return DispatchOutcome::Unauthorized;
            }
            route.sender.clone()
        };

        let update = match wbot_telegram::decode_update(body) {
            Ok(update) => update,
            Err(e) => {
                warn!(tenant_id, error = %e, "Dropping malformed webhook payload");
                return DispatchOutcome::Malformed;
            }
        };

        match sender.try_send(update) {
            Ok(()) => DispatchOutcome::Accepted,
            Err(TrySendError::Full(update)) => {
                warn!(tenant_id, update_id = update.update_id, "Tenant channel full");
                DispatchOutcome::Busy
            }
            Err(TrySendError::Closed(_)) => {
                debug!(tenant_id, "Tenant pipeline stopped");
                DispatchOutcome::UnknownTenant
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_path_round_trip() {
        assert_eq!(WebhookRouter::route_path(42), "/bot_42");
        assert_eq!(WebhookRouter::parse_route("bot_42"), Some(42));
        assert_eq!(WebhookRouter::parse_route("/bot_42"), Some(42));
        assert_eq!(WebhookRouter::parse_route("bot_x"), None);
        assert_eq!(WebhookRouter::parse_route("42"), None);
    }

    #[test]
    fn test_register_replaces_and_deregister_reports() {
        let router = WebhookRouter::new();
        let _first = router.register(1, "a".to_string());
        let _second = router.register(1, "b".to_string());
        assert_eq!(router.len(), 1);
        assert!(router.deregister(1));
        assert!(!router.deregister(1));
        assert!(router.is_empty());
    }
}
