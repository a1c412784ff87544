//! Business handlers for the per-tenant chain and the factory that wires them behind gates.

mod archive;
mod chain;
mod connection;
mod deleted;
mod edited;
mod start;

pub use archive::{ArchiveHandler, MAX_ARCHIVED_TEXT_LEN};
pub use chain::{
    BusinessChainFactory, ChainFactory, DirectLane, TenantChains, BUSINESS_GATE_PREFIX,
    BUSINESS_QUEUE_SIZE, CONNECTION_GATE_PREFIX, CONNECTION_QUEUE_SIZE, DIRECT_LIMIT,
    DIRECT_LIMITER_PREFIX, DIRECT_QUEUE_SIZE, DIRECT_WINDOW,
};
pub use connection::ConnectionHandler;
pub use deleted::{DeletedHandler, DELETED_PAGE_SIZE};
pub use edited::EditedHandler;
pub use start::{StartHandler, STATUS_TEXT};

use storage::ConnectionStore;
use wbot_core::Result;

/// Owner of a business connection and every connection id they ever had.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Owner {
    pub user_id: i64,
    pub connection_ids: Vec<String>,
}

/// None when the connection was never seen.
pub(crate) async fn resolve_owner(
    connections: &dyn ConnectionStore,
    connection_id: &str,
) -> Result<Option<Owner>> {
    let Some(connection) = connections.connection(connection_id).await? else {
        return Ok(None);
    };
    let mut connection_ids = connections
        .connection_ids_for_owner(connection.owner_user_id)
        .await?;
    if !connection_ids.iter().any(|id| id == connection_id) {
        connection_ids.push(connection_id.to_string());
    }
    Ok(Some(Owner {
        user_id: connection.owner_user_id,
        connection_ids,
    }))
}

/// `dd-mm-yyyy hh:mm:ss` in UTC.
pub(crate) fn format_timestamp(unix_seconds: i64) -> String {
    chrono::DateTime::from_timestamp(unix_seconds, 0)
        .map(|dt| dt.format("%d-%m-%Y %H:%M:%S").to_string())
        .unwrap_or_else(|| unix_seconds.to_string())
}
