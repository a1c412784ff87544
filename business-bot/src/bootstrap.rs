//! Wires metrics export, the store, queue store, tenant registry and HTTP server, then serves
//! until Ctrl-C.

use std::sync::Arc;

use anyhow::{Context, Result};
use ratelimit::{MemoryQueueStore, QueueStore, RedisQueueStore};
use storage::SqliteMessageStore;
use tenant_runtime::{
    app, AppState, BusinessChainFactory, ControlPlane, CredentialProvider, RegistryDeps,
    RuntimeMetrics, StaticCredentialProvider, TenantRegistry, WebhookRouter,
};
use tracing::{error, info, instrument, warn};
use wbot_core::init_tracing;
use wbot_telegram::TelegramConnector;

use crate::config::AppConfig;
use crate::observability::{init_metrics, shutdown_metrics};

async fn queue_store(config: &AppConfig) -> Result<Arc<dyn QueueStore>> {
    match &config.redis_url {
        Some(url) => {
            let store = RedisQueueStore::connect(url)
                .await
                .with_context(|| format!("Failed to connect to Redis at {}", url))?;
            info!("Using Redis queue store");
            Ok(Arc::new(store))
        }
        None => {
            info!("REDIS_URL not set, using in-process queue store");
            Ok(Arc::new(MemoryQueueStore::new()))
        }
    }
}

/// Adds every tenant the provider knows; failures are logged and skipped.
async fn add_configured_tenants(registry: &TenantRegistry, credentials: &dyn CredentialProvider) {
    let ids = match credentials.tenant_ids().await {
        Ok(ids) => ids,
        Err(e) => {
            error!(error = %e, "Failed to list configured tenants");
            return;
        }
    };
    for id in ids {
        match registry.add_tenant(id).await {
            Ok(handle) => info!(
                tenant_id = id,
                display_name = %handle.display_name,
                "Configured tenant started"
            ),
            Err(e) => warn!(tenant_id = id, error = %e, "Failed to start configured tenant"),
        }
    }
}

/// Main entry: init logging and metrics, open the store (fatal on failure), start configured
/// tenants, serve HTTP until Ctrl-C, then stop every pipeline and flush metrics.
#[instrument(skip(config))]
pub async fn run(config: AppConfig) -> Result<()> {
    init_tracing(&config.log_file)?;

    info!(
        database_url = %config.database_url,
        listen_addr = %config.listen_addr,
        webhook_base_url = %config.webhook_base_url,
        "Initializing business bot"
    );
    let meter_provider = init_metrics(&config)?;

    let store = Arc::new(
        SqliteMessageStore::new(&config.database_url)
            .await
            .with_context(|| {
                format!("Failed to open message store at {}", config.database_url)
            })?,
    );
    let queues = queue_store(&config).await?;
    let credentials = Arc::new(
        StaticCredentialProvider::parse(&config.tenant_credentials)
            .context("Invalid TENANT_CREDENTIALS")?,
    );

    let router = Arc::new(WebhookRouter::new());
    let registry = Arc::new(TenantRegistry::new(RegistryDeps {
        connector: Arc::new(TelegramConnector::new(config.telegram.api_url.clone())),
        credentials: credentials.clone(),
        chains: Arc::new(BusinessChainFactory::new(
            store.clone(),
            store.clone(),
            queues,
        )),
        router: router.clone(),
        metrics: Arc::new(RuntimeMetrics::new()),
        webhook_base_url: config.webhook_base_url.clone(),
    }));

    add_configured_tenants(&registry, credentials.as_ref()).await;

    let state = AppState {
        router,
        control: ControlPlane::new(registry.clone()),
    };
    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    info!(listen_addr = %config.listen_addr, tenants = registry.len(), "Business bot started");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for Ctrl-C");
            }
            info!("Shutdown requested");
        })
        .await
        .context("HTTP server failed")?;

    registry.shutdown().await;
    store.close().await;
    shutdown_metrics(meter_provider);
    info!("Business bot stopped");
    Ok(())
}
