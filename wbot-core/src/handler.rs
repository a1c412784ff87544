//! Handler seam for per-tenant update processing.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Update;

/// Handler result for the chain. `Reply(text)` answers the sender of a direct message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerResponse {
    /// Pass to next handler.
    Continue,
    /// Stop the chain; no response body.
    Stop,
    /// Update not meant for this handler, try next.
    Ignore,
    /// Stop the chain and answer with this text.
    Reply(String),
}

/// Chain runs all before → handle until Stop/Reply → all after (reverse).
#[async_trait]
pub trait Handler: Send + Sync {
    /// Runs before the handle phase. Return false to stop the chain.
    async fn before(&self, _update: &Update) -> Result<bool> {
        Ok(true)
    }
    /// Processes the update. Default: Continue.
    async fn handle(&self, _update: &Update) -> Result<HandlerResponse> {
        Ok(HandlerResponse::Continue)
    }
    /// Runs after the handle phase (reverse order), with the final response.
    async fn after(&self, _update: &Update, _response: &HandlerResponse) -> Result<()> {
        Ok(())
    }
}
