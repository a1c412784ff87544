use thiserror::Error;

use crate::types::{Capability, TenantId};

/// Error taxonomy shared by the registry, stores, gates and control plane.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Tenant {0} already exists")]
    AlreadyExists(TenantId),

    #[error("Tenant {0} not found")]
    NotFound(TenantId),

    #[error("Capabilities not met: {}", join_capabilities(.missing))]
    CapabilityUnmet { missing: Vec<Capability> },

    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    #[error("Transient store error: {0}")]
    TransientStore(String),

    #[error("Overloaded")]
    Overloaded,

    #[error("Database error: {0}")]
    Store(String),

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn join_capabilities(missing: &[Capability]) -> String {
    missing
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, WatchError>;
