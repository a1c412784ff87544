//! Live tenants and their lifecycle.
//!
//! The map is guarded by a read/write lock held only for mutation, never across platform calls.
//! An id under construction is reserved in a pending set so a concurrent add of the same id
//! fails fast with `AlreadyExists`; readers never see pending ids.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use wbot_core::{
    BotCommand, Capability, PlatformClient, PlatformConnector, Result, TenantId, WatchError,
};

use crate::credentials::CredentialProvider;
use crate::handlers::ChainFactory;
use crate::metrics::RuntimeMetrics;
use crate::pipeline::Pipeline;
use crate::router::WebhookRouter;

/// Capabilities a bot account must report to become a tenant.
pub const REQUIRED_CAPABILITIES: [Capability; 1] = [Capability::ConnectToBusiness];

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Read-only view of a live tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantHandle {
    pub id: TenantId,
    /// Platform username of the bot.
    pub display_name: String,
    pub running: bool,
}

struct Tenant {
    id: TenantId,
    display_name: String,
    client: Arc<dyn PlatformClient>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Tenant {
    fn handle(&self) -> TenantHandle {
        TenantHandle {
            id: self.id,
            display_name: self.display_name.clone(),
            running: !self.cancel.is_cancelled() && !self.task.is_finished(),
        }
    }
}

#[derive(Default)]
struct RegistryState {
    tenants: HashMap<TenantId, Tenant>,
    pending: HashSet<TenantId>,
}

/// Collaborators the registry needs to bring a tenant up.
pub struct RegistryDeps {
    pub connector: Arc<dyn PlatformConnector>,
    pub credentials: Arc<dyn CredentialProvider>,
    pub chains: Arc<dyn ChainFactory>,
    pub router: Arc<WebhookRouter>,
    pub metrics: Arc<RuntimeMetrics>,
    /// Public URL the tenant routes are appended to.
    pub webhook_base_url: String,
}

pub struct TenantRegistry {
    state: RwLock<RegistryState>,
    deps: RegistryDeps,
}

/// Pending reservation for one id. Dropped before commit (error or cancelled add), it frees the
/// id and removes the local route if one was installed.
struct Reservation<'a> {
    registry: &'a TenantRegistry,
    id: TenantId,
    route_installed: bool,
    committed: bool,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if self.route_installed {
            self.registry.deps.router.deregister(self.id);
        }
        self.registry.write().pending.remove(&self.id);
    }
}

impl TenantRegistry {
    pub fn new(deps: RegistryDeps) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            deps,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn router(&self) -> &Arc<WebhookRouter> {
        &self.deps.router
    }

    pub fn metrics(&self) -> &Arc<RuntimeMetrics> {
        &self.deps.metrics
    }

    fn webhook_url(&self, tenant_id: TenantId) -> String {
        format!(
            "{}{}",
            self.deps.webhook_base_url.trim_end_matches('/'),
            WebhookRouter::route_path(tenant_id)
        )
    }

    fn reserve(&self, id: TenantId) -> Result<Reservation<'_>> {
        let mut state = self.write();
        if state.tenants.contains_key(&id) || !state.pending.insert(id) {
            return Err(WatchError::AlreadyExists(id));
        }
        Ok(Reservation {
            registry: self,
            id,
            route_installed: false,
            committed: false,
        })
    }

    /// Validates the tenant's credential and capabilities, routes its webhook, starts its
    /// pipeline, and only then makes it visible.
    #[instrument(skip(self))]
    pub async fn add_tenant(&self, id: TenantId) -> Result<TenantHandle> {
        if id <= 0 {
            return Err(WatchError::Validation(format!("Invalid tenant id: {}", id)));
        }
        let mut reservation = self.reserve(id)?;

        let credential = self.deps.credentials.credential(id).await?;
        let client = self.deps.connector.connect(&credential);

        let identity = client.identify().await?;
        if identity.id != id {
            return Err(WatchError::Validation(format!(
                "Credential belongs to bot {}, not {}",
                identity.id, id
            )));
        }
        let missing = identity.missing(&REQUIRED_CAPABILITIES);
        if !missing.is_empty() {
            warn!(tenant_id = id, missing = ?missing, "Bot lacks required capabilities");
            return Err(WatchError::CapabilityUnmet { missing });
        }

        let secret = Uuid::new_v4().simple().to_string();
        let updates = self.deps.router.register(id, secret.clone());
        reservation.route_installed = true;
        client.set_webhook(&self.webhook_url(id), &secret).await?;

        let cancel = CancellationToken::new();
        let pipeline = Pipeline {
            tenant_id: id,
            chains: self.deps.chains.build(id, client.clone()),
            client: client.clone(),
            metrics: self.deps.metrics.clone(),
        };
        let task = pipeline.spawn(updates, cancel.clone());

        let tenant = Tenant {
            id,
            display_name: identity.username,
            client: client.clone(),
            cancel,
            task,
        };
        let handle = tenant.handle();
        {
            let mut state = self.write();
            state.pending.remove(&id);
            if state.tenants.contains_key(&id) {
                drop(state);
                tenant.cancel.cancel();
                return Err(WatchError::AlreadyExists(id));
            }
            state.tenants.insert(id, tenant);
            reservation.committed = true;
        }

        if let Err(e) = client
            .set_commands(&[BotCommand::new("start", "Show bot status")])
            .await
        {
            warn!(tenant_id = id, error = %e, "Failed to publish bot commands");
        }

        info!(tenant_id = id, display_name = %handle.display_name, "Tenant added");
        Ok(handle)
    }

    /// Stops the tenant's pipeline and removes it. Remote webhook removal is best-effort.
    #[instrument(skip(self))]
    pub async fn remove_tenant(&self, id: TenantId) -> Result<TenantHandle> {
        let tenant = self
            .write()
            .tenants
            .remove(&id)
            .ok_or(WatchError::NotFound(id))?;

        tenant.cancel.cancel();
        self.deps.router.deregister(id);
        if let Err(e) = tenant.client.delete_webhook().await {
            warn!(tenant_id = id, error = %e, "Failed to delete remote webhook");
        }

        info!(tenant_id = id, "Tenant removed");
        Ok(TenantHandle {
            id,
            display_name: tenant.display_name,
            running: false,
        })
    }

    pub fn get_tenant(&self, id: TenantId) -> Option<TenantHandle> {
        self.read().tenants.get(&id).map(Tenant::handle)
    }

    /// Live tenants ordered by id.
    pub fn list_tenants(&self) -> Vec<TenantHandle> {
        let mut tenants: Vec<TenantHandle> =
            self.read().tenants.values().map(Tenant::handle).collect();
        tenants.sort_by_key(|t| t.id);
        tenants
    }

    pub fn len(&self) -> usize {
        self.read().tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().tenants.is_empty()
    }

    /// Cancels every pipeline and waits briefly for them to stop. Remote webhooks are kept.
    pub async fn shutdown(&self) {
        let tenants: Vec<Tenant> = self.write().tenants.drain().map(|(_, t)| t).collect();
        for tenant in &tenants {
            tenant.cancel.cancel();
            self.deps.router.deregister(tenant.id);
        }
        for tenant in tenants {
            if tokio::time::timeout(SHUTDOWN_GRACE, tenant.task).await.is_err() {
                warn!(tenant_id = tenant.id, "Pipeline did not stop in time");
            }
        }
        info!("All tenant pipelines stopped");
    }
}
