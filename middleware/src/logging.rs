//! Handler that logs each update in before() and the outcome in after().

use async_trait::async_trait;
use tracing::{debug, info, instrument};
use wbot_core::{Handler, HandlerResponse, Result, TenantId, Update};

/// Logs each update; always continues.
pub struct LoggingHandler {
    tenant_id: TenantId,
}

impl LoggingHandler {
    pub fn new(tenant_id: TenantId) -> Self {
        Self { tenant_id }
    }
}

#[async_trait]
impl Handler for LoggingHandler {
    #[instrument(skip(self, update))]
    async fn before(&self, update: &Update) -> Result<bool> {
        info!(
            tenant_id = self.tenant_id,
            update_id = update.update_id,
            kind = update.kind_name(),
            connection_id = update.connection_id().unwrap_or("-"),
            "Received update"
        );
        Ok(true)
    }

    #[instrument(skip(self, update, response))]
    async fn after(&self, update: &Update, response: &HandlerResponse) -> Result<()> {
        debug!(
            tenant_id = self.tenant_id,
            update_id = update.update_id,
            response = ?response,
            "Processed update"
        );
        Ok(())
    }
}
