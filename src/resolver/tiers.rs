// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Resolver tier strategies.
//!
//! Each tier answers `try_get` with a hit, a miss, or an error. An error
//! means the tier did not answer, which is different from a miss.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::document_store::DocumentStore;
use super::fallback::FallbackResolver;
use crate::storage::{CredentialCache, CredentialDatabase};

/// Tier position, in lookup order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TierKind {
    Cache,
    LocalStore,
    DocumentStore,
    Fallback,
}

impl TierKind {
    /// Remote tiers need the network and are time-bounded.
    pub fn is_remote(self) -> bool {
        matches!(self, TierKind::DocumentStore | TierKind::Fallback)
    }
}

impl fmt::Display for TierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TierKind::Cache => "cache",
            TierKind::LocalStore => "local_store",
            TierKind::DocumentStore => "document_store",
            TierKind::Fallback => "fallback",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum TierError {
    /// Connection failure, timeout or server error.
    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("local storage: {0}")]
    Storage(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait ResolverTier: Send + Sync {
    fn kind(&self) -> TierKind;

    async fn try_get(&self, credential_id: &str) -> Result<Option<String>, TierError>;

    async fn put(&self, credential_id: &str, contract_address: &str) -> Result<(), TierError>;
}

pub struct CacheTier {
    cache: Arc<CredentialCache>,
}

impl CacheTier {
    pub fn new(cache: Arc<CredentialCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl ResolverTier for CacheTier {
    fn kind(&self) -> TierKind {
        TierKind::Cache
    }

    async fn try_get(&self, credential_id: &str) -> Result<Option<String>, TierError> {
        Ok(self.cache.get(credential_id))
    }

    async fn put(&self, credential_id: &str, contract_address: &str) -> Result<(), TierError> {
        self.cache.put(credential_id, contract_address);
        Ok(())
    }
}

pub struct LocalStoreTier {
    db: Arc<CredentialDatabase>,
}

impl LocalStoreTier {
    pub fn new(db: Arc<CredentialDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ResolverTier for LocalStoreTier {
    fn kind(&self) -> TierKind {
        TierKind::LocalStore
    }

    async fn try_get(&self, credential_id: &str) -> Result<Option<String>, TierError> {
        self.db
            .get_mapping(credential_id)
            .map(|m| m.map(|m| m.contract_address))
            .map_err(|e| TierError::Storage(e.to_string()))
    }

    async fn put(&self, credential_id: &str, contract_address: &str) -> Result<(), TierError> {
        self.db
            .upsert_mapping(credential_id, contract_address)
            .map(|_| ())
            .map_err(|e| TierError::Storage(e.to_string()))
    }
}

pub struct DocumentStoreTier {
    store: Arc<dyn DocumentStore>,
}

impl DocumentStoreTier {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ResolverTier for DocumentStoreTier {
    fn kind(&self) -> TierKind {
        TierKind::DocumentStore
    }

    async fn try_get(&self, credential_id: &str) -> Result<Option<String>, TierError> {
        self.store.get(credential_id).await
    }

    async fn put(&self, credential_id: &str, contract_address: &str) -> Result<(), TierError> {
        self.store.upsert(credential_id, contract_address).await
    }
}

/// Read-only legacy lookup service.
pub struct FallbackTier {
    resolver: Arc<dyn FallbackResolver>,
}

impl FallbackTier {
    pub fn new(resolver: Arc<dyn FallbackResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl ResolverTier for FallbackTier {
    fn kind(&self) -> TierKind {
        TierKind::Fallback
    }

    async fn try_get(&self, credential_id: &str) -> Result<Option<String>, TierError> {
        self.resolver.lookup(credential_id).await
    }

    async fn put(&self, _credential_id: &str, _contract_address: &str) -> Result<(), TierError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn tier_order_and_remoteness() {
        let mut kinds = vec![
            TierKind::Fallback,
            TierKind::Cache,
            TierKind::DocumentStore,
            TierKind::LocalStore,
        ];
        kinds.sort();
        assert_eq!(
            kinds,
            vec![
                TierKind::Cache,
                TierKind::LocalStore,
                TierKind::DocumentStore,
                TierKind::Fallback
            ]
        );
        assert!(!TierKind::Cache.is_remote());
        assert!(!TierKind::LocalStore.is_remote());
        assert!(TierKind::DocumentStore.is_remote());
        assert!(TierKind::Fallback.is_remote());
    }

    #[tokio::test]
    async fn local_store_tier_round_trips_through_redb() {
        let dir = tempdir().unwrap();
        let db = Arc::new(CredentialDatabase::open(&dir.path().join("wallet.redb")).unwrap());
        let tier = LocalStoreTier::new(db.clone());

        assert_eq!(tier.try_get("cred-1").await.unwrap(), None);
        tier.put("cred-1", "CADDR").await.unwrap();
        assert_eq!(tier.try_get("cred-1").await.unwrap().as_deref(), Some("CADDR"));
        assert!(db.get_mapping("cred-1").unwrap().is_some());
    }

    #[tokio::test]
    async fn cache_tier_reads_shared_cache() {
        let cache = Arc::new(CredentialCache::new(4));
        let tier = CacheTier::new(cache.clone());
        cache.put("cred-1", "CADDR");
        assert_eq!(tier.try_get("cred-1").await.unwrap().as_deref(), Some("CADDR"));
    }
}
