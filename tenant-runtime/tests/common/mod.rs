//! Shared fakes for tenant-runtime integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use handler_chain::HandlerChain;
use ratelimit::MemoryQueueStore;
use storage::SqliteMessageStore;
use tenant_runtime::{
    BusinessChainFactory, ChainFactory, Notification, Notifier, RegistryDeps, RuntimeMetrics,
    StaticCredentialProvider, TenantChains, TenantRegistry, WebhookRouter,
};
use wbot_core::{
    BotCommand, BotIdentity, Capability, Handler, HandlerResponse, PlatformClient,
    PlatformConnector, Result, TenantId, Update, UpdateKind, WatchError,
};

pub const BASE_URL: &str = "https://hooks.example.test";

/// Platform client that records calls instead of talking to the network.
pub struct FakePlatform {
    pub identity: BotIdentity,
    /// Delay before identify returns, to widen race windows.
    pub identify_delay: Duration,
    /// identify() answers InvalidCredential while set, as for a revoked token.
    pub reject_credential: AtomicBool,
    pub fail_set_webhook: bool,
    pub set_webhook_calls: Mutex<Vec<(String, String)>>,
    pub delete_webhook_calls: AtomicUsize,
    pub sent: Mutex<Vec<(i64, String)>>,
}

impl FakePlatform {
    pub fn new(id: i64, username: &str, capabilities: Vec<Capability>) -> Self {
        Self {
            identity: BotIdentity {
                id,
                username: username.to_string(),
                capabilities,
            },
            identify_delay: Duration::ZERO,
            reject_credential: AtomicBool::new(false),
            fail_set_webhook: false,
            set_webhook_calls: Mutex::new(Vec::new()),
            delete_webhook_calls: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn business(id: i64, username: &str) -> Self {
        Self::new(id, username, vec![Capability::ConnectToBusiness])
    }

    pub fn webhook_count(&self) -> usize {
        self.set_webhook_calls.lock().unwrap().len()
    }

    pub fn last_secret(&self) -> Option<String> {
        self.set_webhook_calls
            .lock()
            .unwrap()
            .last()
            .map(|(_, secret)| secret.clone())
    }

    pub fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlatformClient for FakePlatform {
    async fn identify(&self) -> Result<BotIdentity> {
        if !self.identify_delay.is_zero() {
            tokio::time::sleep(self.identify_delay).await;
        }
        if self.reject_credential.load(Ordering::SeqCst) {
            return Err(WatchError::InvalidCredential("Unauthorized".to_string()));
        }
        Ok(self.identity.clone())
    }

    async fn set_webhook(&self, url: &str, secret: &str) -> Result<()> {
        if self.fail_set_webhook {
            return Err(WatchError::Platform("webhook rejected".to_string()));
        }
        self.set_webhook_calls
            .lock()
            .unwrap()
            .push((url.to_string(), secret.to_string()));
        Ok(())
    }

    async fn delete_webhook(&self) -> Result<()> {
        self.delete_webhook_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn set_commands(&self, _commands: &[BotCommand]) -> Result<()> {
        Ok(())
    }

    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        self.sent.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }
}

/// Hands out pre-built fakes by credential.
#[derive(Default)]
pub struct FakeConnector {
    pub platforms: HashMap<String, Arc<FakePlatform>>,
}

impl FakeConnector {
    pub fn with(mut self, credential: &str, platform: Arc<FakePlatform>) -> Self {
        self.platforms.insert(credential.to_string(), platform);
        self
    }
}

impl PlatformConnector for FakeConnector {
    fn connect(&self, credential: &str) -> Arc<dyn PlatformClient> {
        match self.platforms.get(credential) {
            Some(platform) => platform.clone(),
            None => Arc::new(FakePlatform::business(-1, "unknown")),
        }
    }
}

/// Collects notifications in memory.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn notifications(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// Panics on direct messages whose text is "boom"; counts every other update it sees.
#[derive(Default)]
pub struct PanickingHandler {
    pub handled: AtomicUsize,
}

#[async_trait]
impl Handler for PanickingHandler {
    async fn handle(&self, update: &Update) -> Result<HandlerResponse> {
        if let UpdateKind::DirectMessage(message) = &update.kind {
            if message.text == "boom" {
                panic!("handler exploded");
            }
        }
        self.handled.fetch_add(1, Ordering::SeqCst);
        Ok(HandlerResponse::Stop)
    }
}

/// Builds the same single-handler chain for every tenant, recording which tenants were built.
pub struct FixedChainFactory {
    pub handler: Arc<dyn Handler>,
    pub built: Mutex<Vec<TenantId>>,
}

impl FixedChainFactory {
    pub fn new(handler: Arc<dyn Handler>) -> Self {
        Self {
            handler,
            built: Mutex::new(Vec::new()),
        }
    }
}

impl ChainFactory for FixedChainFactory {
    fn build(&self, tenant_id: TenantId, _client: Arc<dyn PlatformClient>) -> TenantChains {
        self.built.lock().unwrap().push(tenant_id);
        TenantChains::ordered(HandlerChain::new().add_handler(self.handler.clone()))
    }
}

pub fn credentials(pairs: &[(TenantId, &str)]) -> Arc<StaticCredentialProvider> {
    Arc::new(StaticCredentialProvider::new(
        pairs
            .iter()
            .map(|(id, token)| (*id, token.to_string()))
            .collect(),
    ))
}

pub fn registry_with(
    connector: FakeConnector,
    credentials: Arc<StaticCredentialProvider>,
    chains: Arc<dyn ChainFactory>,
) -> TenantRegistry {
    TenantRegistry::new(RegistryDeps {
        connector: Arc::new(connector),
        credentials,
        chains,
        router: Arc::new(WebhookRouter::new()),
        metrics: Arc::new(RuntimeMetrics::new()),
        webhook_base_url: BASE_URL.to_string(),
    })
}

/// Business chain over an in-memory store and queue store, notifying `notifier`.
pub async fn business_chain_factory(
    notifier: Arc<RecordingNotifier>,
) -> (BusinessChainFactory, Arc<SqliteMessageStore>) {
    let store = Arc::new(
        SqliteMessageStore::new("sqlite::memory:")
            .await
            .expect("Failed to create store"),
    );
    let factory = BusinessChainFactory::new(
        store.clone(),
        store.clone(),
        Arc::new(MemoryQueueStore::new()),
    )
    .with_notifier(notifier);
    (factory, store)
}
