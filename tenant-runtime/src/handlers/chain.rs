//! Builds the handler chains of one tenant.
//!
//! Gate keys are connection or user ids, which are unique across tenants, so queues and rate
//! windows are shared by every tenant of the deployment: one user spamming several bots draws
//! from one budget.

use std::sync::Arc;
use std::time::Duration;

use handler_chain::HandlerChain;
use middleware::{GatedHandler, LoggingHandler};
use ratelimit::{FairQueue, QueueStore};
use storage::{ConnectionStore, MessageStore};
use wbot_core::{PlatformClient, TenantId, Update, UpdateKind};

use super::{ArchiveHandler, ConnectionHandler, DeletedHandler, EditedHandler, StartHandler};
use crate::notify::{Notifier, PlatformNotifier};

/// Queue bound per business connection for edited and deleted messages.
pub const BUSINESS_QUEUE_SIZE: usize = 20;
/// Queue bound per business connection for connection updates.
pub const CONNECTION_QUEUE_SIZE: usize = 5;
pub const BUSINESS_GATE_PREFIX: &str = "wbot:business";
pub const CONNECTION_GATE_PREFIX: &str = "wbot:connection";
pub const DIRECT_LIMITER_PREFIX: &str = "wbot:ratelimit";
/// Direct messages admitted per user and window.
pub const DIRECT_LIMIT: u64 = 5;
pub const DIRECT_WINDOW: Duration = Duration::from_secs(10);
pub const DIRECT_QUEUE_SIZE: usize = 3;

/// Direct messages, handled off the tenant's pump once `limiter` admits them.
pub struct DirectLane {
    pub limiter: FairQueue,
    pub chain: HandlerChain,
}

/// The chains a tenant's pipeline runs.
pub struct TenantChains {
    /// Every update without a lane of its own, one at a time in arrival order.
    pub ordered: HandlerChain,
    pub direct: Option<DirectLane>,
}

impl TenantChains {
    /// A single ordered chain for every update.
    pub fn ordered(chain: HandlerChain) -> Self {
        Self {
            ordered: chain,
            direct: None,
        }
    }
}

/// Creates the handler chains run by a tenant's pipeline.
pub trait ChainFactory: Send + Sync {
    fn build(&self, tenant_id: TenantId, client: Arc<dyn PlatformClient>) -> TenantChains;
}

fn edited_key(update: &Update) -> Option<String> {
    match &update.kind {
        UpdateKind::EditedBusinessMessage(message) => Some(message.connection_id.clone()),
        _ => None,
    }
}

fn deleted_key(update: &Update) -> Option<String> {
    match &update.kind {
        UpdateKind::DeletedBusinessMessages(deleted) => Some(deleted.connection_id.clone()),
        _ => None,
    }
}

fn connection_key(update: &Update) -> Option<String> {
    match &update.kind {
        UpdateKind::BusinessConnection(connection) => Some(connection.id.clone()),
        _ => None,
    }
}

/// Wires logging, archiving and the gated edit/delete/connection handlers into the ordered
/// chain, and `/start` into the rate-limited direct lane.
///
/// Edits and deletions of one connection share a queue, so they are handled in arrival order.
#[derive(Clone)]
pub struct BusinessChainFactory {
    store: Arc<dyn MessageStore>,
    connections: Arc<dyn ConnectionStore>,
    queues: Arc<dyn QueueStore>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl BusinessChainFactory {
    pub fn new(
        store: Arc<dyn MessageStore>,
        connections: Arc<dyn ConnectionStore>,
        queues: Arc<dyn QueueStore>,
    ) -> Self {
        Self {
            store,
            connections,
            queues,
            notifier: None,
        }
    }

    /// Uses `notifier` for every tenant instead of one backed by the tenant's client.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }
}

impl ChainFactory for BusinessChainFactory {
    fn build(&self, tenant_id: TenantId, client: Arc<dyn PlatformClient>) -> TenantChains {
        let notifier: Arc<dyn Notifier> = match &self.notifier {
            Some(notifier) => notifier.clone(),
            None => Arc::new(PlatformNotifier::new(client)),
        };

        let business_gate = FairQueue::isolation_gate(
            self.queues.clone(),
            BUSINESS_GATE_PREFIX,
            BUSINESS_QUEUE_SIZE,
        );
        let connection_gate = FairQueue::isolation_gate(
            self.queues.clone(),
            CONNECTION_GATE_PREFIX,
            CONNECTION_QUEUE_SIZE,
        );
        let direct_limiter = FairQueue::rate_limiter(
            self.queues.clone(),
            DIRECT_LIMITER_PREFIX,
            DIRECT_LIMIT,
            DIRECT_WINDOW,
            DIRECT_QUEUE_SIZE,
        );

        let edited = EditedHandler::new(
            self.store.clone(),
            self.connections.clone(),
            notifier.clone(),
        );
        let deleted = DeletedHandler::new(
            self.store.clone(),
            self.connections.clone(),
            notifier.clone(),
        );
        let connection = ConnectionHandler::new(self.connections.clone(), notifier);

        let ordered = HandlerChain::new()
            .add_handler(Arc::new(LoggingHandler::new(tenant_id)))
            .add_handler(Arc::new(ArchiveHandler::new(self.store.clone())))
            .add_handler(Arc::new(GatedHandler::new(
                Arc::new(edited),
                business_gate.clone(),
                edited_key,
            )))
            .add_handler(Arc::new(GatedHandler::new(
                Arc::new(deleted),
                business_gate,
                deleted_key,
            )))
            .add_handler(Arc::new(GatedHandler::new(
                Arc::new(connection),
                connection_gate,
                connection_key,
            )));
        let direct = HandlerChain::new()
            .add_handler(Arc::new(LoggingHandler::new(tenant_id)))
            .add_handler(Arc::new(StartHandler));

        TenantChains {
            ordered,
            direct: Some(DirectLane {
                limiter: direct_limiter,
                chain: direct,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wbot_core::{BusinessConnection, DeletedMessages};

    #[test]
    fn test_keys_select_their_update_kind_only() {
        let connection = Update {
            update_id: 1,
            kind: UpdateKind::BusinessConnection(BusinessConnection {
                id: "bc-1".to_string(),
                owner_user_id: 7,
                enabled: true,
                date: 1,
            }),
        };
        let deleted = Update {
            update_id: 2,
            kind: UpdateKind::DeletedBusinessMessages(DeletedMessages {
                connection_id: "bc-2".to_string(),
                chat: Default::default(),
                message_ids: vec![1],
            }),
        };

        assert_eq!(connection_key(&connection), Some("bc-1".to_string()));
        assert_eq!(edited_key(&connection), None);
        assert_eq!(deleted_key(&connection), None);
        assert_eq!(deleted_key(&deleted), Some("bc-2".to_string()));
        assert_eq!(connection_key(&deleted), None);
    }
}
