//! Per-tenant credentials.

use std::collections::HashMap;

use async_trait::async_trait;
use wbot_core::{Result, TenantId, WatchError};

/// Source of tenant credentials (bot tokens).
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Credential for `tenant_id`; `Validation` when none is known.
    async fn credential(&self, tenant_id: TenantId) -> Result<String>;
    /// Every tenant id this provider holds a credential for, ascending.
    async fn tenant_ids(&self) -> Result<Vec<TenantId>>;
}

/// Credentials held in memory, typically parsed from `TENANT_CREDENTIALS`.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialProvider {
    credentials: HashMap<TenantId, String>,
}

impl StaticCredentialProvider {
    pub fn new(credentials: HashMap<TenantId, String>) -> Self {
        Self { credentials }
    }

    /// Parses `id=token` pairs separated by commas. Blank entries are skipped.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut credentials = HashMap::new();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (id, token) = entry.split_once('=').ok_or_else(|| {
                WatchError::Config(format!("Credential entry without '=': {}", entry))
            })?;
            let id: TenantId = id.trim().parse().map_err(|_| {
                WatchError::Config(format!("Credential entry with invalid tenant id: {}", id))
            })?;
            let token = token.trim();
            if token.is_empty() {
                return Err(WatchError::Config(format!(
                    "Credential entry for tenant {} has an empty token",
                    id
                )));
            }
            credentials.insert(id, token.to_string());
        }
        Ok(Self { credentials })
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn credential(&self, tenant_id: TenantId) -> Result<String> {
        self.credentials.get(&tenant_id).cloned().ok_or_else(|| {
            WatchError::Validation(format!("No credential configured for tenant {}", tenant_id))
        })
    }

    async fn tenant_ids(&self) -> Result<Vec<TenantId>> {
        let mut ids: Vec<TenantId> = self.credentials.keys().copied().collect();
        ids.sort_unstable();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_parse_pairs_and_lookup() {
        let provider = StaticCredentialProvider::parse(" 200=tok:b , 100=tok:a,").unwrap();
        assert_eq!(provider.len(), 2);
        assert_eq!(provider.credential(100).await.unwrap(), "tok:a");
        assert_eq!(provider.tenant_ids().await.unwrap(), vec![100, 200]);
    }

    #[tokio::test]
    async fn test_unknown_tenant_is_validation_error() {
        let provider = StaticCredentialProvider::default();
        let err = provider.credential(1).await.unwrap_err();
        assert!(matches!(err, WatchError::Validation(_)));
    }

    #[test]
    fn test_parse_rejects_malformed_entries() {
        assert!(matches!(
            StaticCredentialProvider::parse("100"),
            Err(WatchError::Config(_))
        ));
        assert!(matches!(
            StaticCredentialProvider::parse("abc=tok"),
            Err(WatchError::Config(_))
        ));
        assert!(matches!(
            StaticCredentialProvider::parse("100="),
            Err(WatchError::Config(_))
        ));
    }
}
