//! Tenant management for sibling services: add and remove tenants by id.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, instrument};
use wbot_core::{TenantId, WatchError};

use crate::registry::{TenantHandle, TenantRegistry};

/// Status of a failed control-plane call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    AlreadyExists,
    NotFound,
    FailedPrecondition,
    InvalidArgument,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code:?}: {message}")]
pub struct ControlError {
    pub code: StatusCode,
    pub message: String,
    /// Capability flags the bot lacks (FailedPrecondition only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_capabilities: Vec<String>,
}

impl From<WatchError> for ControlError {
    fn from(err: WatchError) -> Self {
        let message = err.to_string();
        let (code, missing_capabilities) = match err {
            WatchError::AlreadyExists(_) => (StatusCode::AlreadyExists, Vec::new()),
            WatchError::NotFound(_) => (StatusCode::NotFound, Vec::new()),
            WatchError::CapabilityUnmet { missing } => (
                StatusCode::FailedPrecondition,
                missing.iter().map(|c| c.as_str().to_string()).collect(),
            ),
            WatchError::Validation(_) => (StatusCode::InvalidArgument, Vec::new()),
            _ => (StatusCode::Internal, Vec::new()),
        };
        Self {
            code,
            message,
            missing_capabilities,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantReply {
    pub id: TenantId,
    pub display_name: String,
}

impl From<TenantHandle> for TenantReply {
    fn from(handle: TenantHandle) -> Self {
        Self {
            id: handle.id,
            display_name: handle.display_name,
        }
    }
}

#[derive(Clone)]
pub struct ControlPlane {
    registry: Arc<TenantRegistry>,
}

impl ControlPlane {
    pub fn new(registry: Arc<TenantRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<TenantRegistry> {
        &self.registry
    }

    #[instrument(skip(self))]
    pub async fn add_tenant(&self, id: TenantId) -> Result<TenantReply, ControlError> {
        self.registry
            .add_tenant(id)
            .await
            .map(TenantReply::from)
            .map_err(|e| log_failure("add", id, e))
    }

    #[instrument(skip(self))]
    pub async fn remove_tenant(&self, id: TenantId) -> Result<TenantReply, ControlError> {
        self.registry
            .remove_tenant(id)
            .await
            .map(TenantReply::from)
            .map_err(|e| log_failure("remove", id, e))
    }
}

fn log_failure(operation: &str, id: TenantId, err: WatchError) -> ControlError {
    let control = ControlError::from(err);
    if control.code == StatusCode::Internal {
        error!(operation, tenant_id = id, error = %control.message, "Control plane call failed");
    }
    control
}

#[cfg(test)]
mod tests {
    use super::*;
    use wbot_core::Capability;

    #[test]
    fn test_error_mapping() {
        assert_eq!(
            ControlError::from(WatchError::AlreadyExists(1)).code,
            StatusCode::AlreadyExists
        );
        assert_eq!(ControlError::from(WatchError::NotFound(1)).code, StatusCode::NotFound);
        assert_eq!(
            ControlError::from(WatchError::Validation("bad".into())).code,
            StatusCode::InvalidArgument
        );
        assert_eq!(
            ControlError::from(WatchError::InvalidCredential("nope".into())).code,
            StatusCode::Internal
        );

        let unmet = ControlError::from(WatchError::CapabilityUnmet {
            missing: vec![Capability::ConnectToBusiness],
        });
        assert_eq!(unmet.code, StatusCode::FailedPrecondition);
        assert_eq!(unmet.missing_capabilities, vec!["can_connect_to_business"]);
    }
}
