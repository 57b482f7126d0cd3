// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Credential Resolution
//!
//! Maps an opaque platform credential id to the contract wallet address it
//! was bound to at creation.
//!
//! ## Tiers
//!
//! | Order | Tier | Network |
//! |-------|------|---------|
//! | 1 | In-memory LRU cache | No |
//! | 2 | Local redb store | No |
//! | 3 | Remote document store | Yes |
//! | 4 | Remote fallback service | Yes |
//!
//! Lookups stop at the first hit and write the mapping back to every
//! earlier tier that missed. A hit from a remote tier also re-upserts the
//! document store, repairing an earlier write-through that never landed.
//!
//! A miss on every tier is `NotFound` only when every tier answered. If any
//! tier could not be reached the result is `Transient`.

pub mod document_store;
pub mod fallback;
pub mod tiers;
pub mod worker;

pub use document_store::{DocumentStore, MappingDocument, RestDocumentStore};
pub use fallback::{FallbackResolver, FallbackResolverClient};
pub use tiers::{
    CacheTier, DocumentStoreTier, FallbackTier, LocalStoreTier, ResolverTier, TierError, TierKind,
};
pub use worker::BindRetryWorker;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{WalletError, WalletResult};
use crate::ledger::validate_contract;
use crate::storage::{CredentialCache, CredentialDatabase};

/// Where a bind ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindStatus {
    /// Written locally and to the document store.
    Synced,
    /// Written locally; the document store write is queued for retry.
    PendingRemote,
    /// Written locally; no document store is configured.
    LocalOnly,
}

pub struct CredentialResolver {
    cache: Arc<CredentialCache>,
    db: Arc<CredentialDatabase>,
    /// Sorted by [`TierKind`].
    tiers: Vec<Arc<dyn ResolverTier>>,
    remote_timeout: Duration,
}

impl CredentialResolver {
    /// Resolver over the two local tiers. Remote tiers are added with
    /// [`with_document_store`](Self::with_document_store) and
    /// [`with_fallback`](Self::with_fallback).
    pub fn new(
        cache: Arc<CredentialCache>,
        db: Arc<CredentialDatabase>,
        remote_timeout: Duration,
    ) -> Self {
        let tiers: Vec<Arc<dyn ResolverTier>> = vec![
            Arc::new(CacheTier::new(cache.clone())),
            Arc::new(LocalStoreTier::new(db.clone())),
        ];
        Self {
            cache,
            db,
            tiers,
            remote_timeout,
        }
    }

    pub fn with_document_store(self, store: Arc<dyn DocumentStore>) -> Self {
        self.with_tier(Arc::new(DocumentStoreTier::new(store)))
    }

    pub fn with_fallback(self, resolver: Arc<dyn FallbackResolver>) -> Self {
        self.with_tier(Arc::new(FallbackTier::new(resolver)))
    }

    /// Add or replace a tier, keeping lookup order.
    pub fn with_tier(mut self, tier: Arc<dyn ResolverTier>) -> Self {
        self.tiers.retain(|t| t.kind() != tier.kind());
        self.tiers.push(tier);
        self.tiers.sort_by_key(|t| t.kind());
        self
    }

    /// Resolve a credential id to its contract address.
    pub async fn resolve(&self, credential_id: &str) -> WalletResult<String> {
        let mut missed: Vec<&Arc<dyn ResolverTier>> = Vec::new();
        let mut unanswered: Vec<String> = Vec::new();

        for tier in &self.tiers {
            let kind = tier.kind();
            let answer = self
                .bounded(kind, tier.try_get(credential_id))
                .await
                .and_then(|hit| checked_answer(kind, hit));
            match answer {
                Ok(Some(address)) => {
                    tracing::debug!(
                        credential_id = %credential_id,
                        tier = %kind,
                        "Credential resolved"
                    );
                    self.write_through(credential_id, &address, &missed).await;
                    if kind.is_remote() {
                        self.repair_document_store(credential_id, &address).await;
                    }
                    return Ok(address);
                }
                Ok(None) => {
                    tracing::debug!(credential_id = %credential_id, tier = %kind, "Tier miss");
                    missed.push(tier);
                }
                Err(e) => {
                    tracing::warn!(
                        credential_id = %credential_id,
                        tier = %kind,
                        error = %e,
                        "Tier did not answer"
                    );
                    unanswered.push(format!("{kind}: {e}"));
                    // Lower tiers must not answer for an unreachable source of truth.
                    if kind == TierKind::DocumentStore {
                        break;
                    }
                }
            }
        }

        if unanswered.is_empty() {
            tracing::info!(credential_id = %credential_id, "Credential not bound on any tier");
            Err(WalletError::NotFound {
                credential_id: credential_id.to_string(),
            })
        } else {
            Err(WalletError::Transient(unanswered.join("; ")))
        }
    }

    /// Bind a freshly created wallet to its credential.
    ///
    /// The local store and cache are written first. A document store failure
    /// queues the write durably instead of failing the bind.
    pub async fn bind(&self, credential_id: &str, contract_address: &str) -> WalletResult<BindStatus> {
        validate_contract(contract_address)?;

        if let Some(existing) = self.db.get_mapping(credential_id)? {
            if existing.contract_address != contract_address {
                return Err(WalletError::MappingConflict {
                    credential_id: credential_id.to_string(),
                    existing: existing.contract_address,
                });
            }
        }

        self.db.upsert_mapping(credential_id, contract_address)?;
        self.cache.put(credential_id, contract_address);

        let Some(document_tier) = self.document_tier() else {
            tracing::info!(credential_id = %credential_id, "Credential bound locally");
            return Ok(BindStatus::LocalOnly);
        };

        match self
            .bounded(
                TierKind::DocumentStore,
                document_tier.put(credential_id, contract_address),
            )
            .await
        {
            Ok(()) => {
                tracing::info!(
                    credential_id = %credential_id,
                    contract_address = %contract_address,
                    "Credential bound"
                );
                self.db.clear_pending_bind(credential_id)?;
                Ok(BindStatus::Synced)
            }
            Err(e) => {
                tracing::warn!(
                    credential_id = %credential_id,
                    error = %e,
                    "Document store write failed, queued for retry"
                );
                self.db.enqueue_pending_bind(credential_id, contract_address)?;
                Ok(BindStatus::PendingRemote)
            }
        }
    }

    /// Make the local tiers agree with the document store.
    ///
    /// The document store wins on divergence. If it has no mapping but the
    /// local store does, the local mapping is pushed up. Returns the address
    /// both sides now agree on, if any.
    pub async fn reconcile(&self, credential_id: &str) -> WalletResult<Option<String>> {
        let document_tier = self
            .document_tier()
            .ok_or_else(|| WalletError::Config("no document store configured".to_string()))?;

        let remote = self
            .bounded(TierKind::DocumentStore, document_tier.try_get(credential_id))
            .await
            .and_then(|hit| checked_answer(TierKind::DocumentStore, hit))
            .map_err(|e| WalletError::Transient(format!("{}: {e}", TierKind::DocumentStore)))?;
        let local = self.db.get_mapping(credential_id)?.map(|m| m.contract_address);

        match (remote, local) {
            (Some(remote), local) => {
                if local.as_deref() != Some(remote.as_str()) {
                    tracing::warn!(
                        credential_id = %credential_id,
                        local = ?local,
                        remote = %remote,
                        "Local mapping diverged from document store, overwriting"
                    );
                    self.db.upsert_mapping(credential_id, &remote)?;
                }
                self.cache.put(credential_id, &remote);
                Ok(Some(remote))
            }
            (None, Some(local)) => {
                self.bounded(
                    TierKind::DocumentStore,
                    document_tier.put(credential_id, &local),
                )
                .await
                .map_err(|e| WalletError::Transient(format!("{}: {e}", TierKind::DocumentStore)))?;
                self.db.clear_pending_bind(credential_id)?;
                tracing::info!(credential_id = %credential_id, "Pushed local mapping to document store");
                Ok(Some(local))
            }
            (None, None) => {
                self.cache.invalidate(credential_id);
                Ok(None)
            }
        }
    }

    /// Drop every cached mapping.
    pub fn invalidate_cache(&self) {
        self.cache.clear();
    }

    /// Retry queued document store writes. Returns how many landed.
    pub async fn retry_pending_binds(&self) -> WalletResult<usize> {
        let Some(document_tier) = self.document_tier() else {
            return Ok(0);
        };

        let pending = self.db.pending_binds()?;
        let mut flushed = 0;
        for (credential_id, contract_address) in &pending {
            match self
                .bounded(
                    TierKind::DocumentStore,
                    document_tier.put(credential_id, contract_address),
                )
                .await
            {
                Ok(()) => {
                    self.db.clear_pending_bind(credential_id)?;
                    flushed += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        credential_id = %credential_id,
                        error = %e,
                        "Pending bind still failing"
                    );
                }
            }
        }

        if !pending.is_empty() {
            tracing::info!(
                flushed,
                remaining = pending.len() - flushed,
                "Retried pending binds"
            );
        }
        Ok(flushed)
    }

    fn document_tier(&self) -> Option<&Arc<dyn ResolverTier>> {
        self.tiers
            .iter()
            .find(|t| t.kind() == TierKind::DocumentStore)
    }

    async fn write_through(
        &self,
        credential_id: &str,
        address: &str,
        missed: &[&Arc<dyn ResolverTier>],
    ) {
        // The document store is handled by the repair upsert.
        for tier in missed.iter().filter(|t| t.kind() != TierKind::DocumentStore) {
            let kind = tier.kind();
            if let Err(e) = self.bounded(kind, tier.put(credential_id, address)).await {
                tracing::warn!(
                    credential_id = %credential_id,
                    tier = %kind,
                    error = %e,
                    "Write-through failed"
                );
            }
        }
    }

    async fn repair_document_store(&self, credential_id: &str, address: &str) {
        let Some(document_tier) = self.document_tier() else {
            return;
        };
        if let Err(e) = self
            .bounded(TierKind::DocumentStore, document_tier.put(credential_id, address))
            .await
        {
            tracing::warn!(
                credential_id = %credential_id,
                error = %e,
                "Document store repair upsert failed"
            );
        }
    }

    /// Apply the remote timeout to calls against remote tiers.
    async fn bounded<T>(
        &self,
        kind: TierKind,
        call: impl Future<Output = Result<T, TierError>>,
    ) -> Result<T, TierError> {
        if !kind.is_remote() {
            return call.await;
        }
        match tokio::time::timeout(self.remote_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(TierError::Unavailable(format!(
                "timed out after {}ms",
                self.remote_timeout.as_millis()
            ))),
        }
    }
}

/// Remote answers must be contract addresses before anything is written
/// through. Local tiers only ever hold validated binds.
fn checked_answer(kind: TierKind, hit: Option<String>) -> Result<Option<String>, TierError> {
    match hit {
        Some(address) if kind.is_remote() => match validate_contract(&address) {
            Ok(()) => Ok(Some(address)),
            Err(e) => Err(TierError::InvalidResponse(e.to_string())),
        },
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::ledger::{encode_strkey, AddressKind};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeDocumentStore {
        docs: Mutex<HashMap<String, String>>,
        offline: AtomicBool,
        hang: AtomicBool,
        upserts: AtomicUsize,
    }

    #[async_trait]
    impl DocumentStore for FakeDocumentStore {
        async fn get(&self, credential_id: &str) -> Result<Option<String>, TierError> {
            if self.hang.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            if self.offline.load(Ordering::SeqCst) {
                return Err(TierError::Unavailable("connection refused".into()));
            }
            Ok(self.docs.lock().unwrap().get(credential_id).cloned())
        }

        async fn upsert(&self, credential_id: &str, contract_address: &str) -> Result<(), TierError> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(TierError::Unavailable("connection refused".into()));
            }
            self.upserts.fetch_add(1, Ordering::SeqCst);
            self.docs
                .lock()
                .unwrap()
                .insert(credential_id.into(), contract_address.into());
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeFallback {
        answers: HashMap<String, String>,
        offline: bool,
    }

    #[async_trait]
    impl FallbackResolver for FakeFallback {
        async fn lookup(&self, credential_id: &str) -> Result<Option<String>, TierError> {
            if self.offline {
                return Err(TierError::Unavailable("connection refused".into()));
            }
            Ok(self.answers.get(credential_id).cloned())
        }
    }

    struct Fixture {
        _dir: TempDir,
        cache: Arc<CredentialCache>,
        db: Arc<CredentialDatabase>,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(CredentialDatabase::open(&dir.path().join("wallet.redb")).unwrap());
        Fixture {
            _dir: dir,
            cache: Arc::new(CredentialCache::new(16)),
            db,
        }
    }

    impl Fixture {
        fn resolver(&self) -> CredentialResolver {
            CredentialResolver::new(self.cache.clone(), self.db.clone(), Duration::from_millis(200))
        }
    }

    fn contract(byte: u8) -> String {
        encode_strkey(AddressKind::Contract, &[byte; 32])
    }

    #[tokio::test]
    async fn bind_then_resolve_from_every_tier() {
        let fx = fixture();
        let docs = Arc::new(FakeDocumentStore::default());
        let resolver = fx.resolver().with_document_store(docs.clone());
        let addr = contract(1);

        assert_eq!(resolver.bind("cred-1", &addr).await.unwrap(), BindStatus::Synced);
        assert_eq!(fx.cache.get("cred-1").as_deref(), Some(addr.as_str()));
        assert_eq!(
            fx.db.get_mapping("cred-1").unwrap().unwrap().contract_address,
            addr
        );
        assert_eq!(docs.docs.lock().unwrap().get("cred-1"), Some(&addr));
        assert_eq!(resolver.resolve("cred-1").await.unwrap(), addr);
    }

    #[tokio::test]
    async fn local_hit_populates_cache_without_remote_calls() {
        let fx = fixture();
        let docs = Arc::new(FakeDocumentStore::default());
        docs.offline.store(true, Ordering::SeqCst);
        let resolver = fx.resolver().with_document_store(docs.clone());
        let addr = contract(2);
        fx.db.upsert_mapping("cred-2", &addr).unwrap();

        assert_eq!(resolver.resolve("cred-2").await.unwrap(), addr);
        assert_eq!(fx.cache.get("cred-2").as_deref(), Some(addr.as_str()));
        assert_eq!(docs.upserts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fallback_hit_writes_through_and_repairs_document_store() {
        let fx = fixture();
        let docs = Arc::new(FakeDocumentStore::default());
        let addr = contract(3);
        let fallback = Arc::new(FakeFallback {
            answers: HashMap::from([("cred-3".to_string(), addr.clone())]),
            offline: false,
        });
        let resolver = fx
            .resolver()
            .with_fallback(fallback)
            .with_document_store(docs.clone());

        assert_eq!(resolver.resolve("cred-3").await.unwrap(), addr);
        assert_eq!(fx.cache.get("cred-3").as_deref(), Some(addr.as_str()));
        assert!(fx.db.get_mapping("cred-3").unwrap().is_some());
        assert_eq!(docs.docs.lock().unwrap().get("cred-3"), Some(&addr));
        assert_eq!(docs.upserts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn document_store_hit_is_reupserted() {
        let fx = fixture();
        let docs = Arc::new(FakeDocumentStore::default());
        let addr = contract(4);
        docs.docs.lock().unwrap().insert("cred-4".into(), addr.clone());
        let resolver = fx.resolver().with_document_store(docs.clone());

        assert_eq!(resolver.resolve("cred-4").await.unwrap(), addr);
        assert_eq!(docs.upserts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn all_tiers_answering_miss_is_not_found() {
        let fx = fixture();
        let resolver = fx
            .resolver()
            .with_document_store(Arc::new(FakeDocumentStore::default()))
            .with_fallback(Arc::new(FakeFallback::default()));

        let err = resolver.resolve("unbound").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn unreachable_remote_tier_is_transient() {
        let fx = fixture();
        let resolver = fx
            .resolver()
            .with_document_store(Arc::new(FakeDocumentStore::default()))
            .with_fallback(Arc::new(FakeFallback {
                answers: HashMap::new(),
                offline: true,
            }));

        let err = resolver.resolve("unbound").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transient);
    }

    #[tokio::test]
    async fn offline_document_store_is_not_overridden_by_fallback() {
        let fx = fixture();
        let docs = Arc::new(FakeDocumentStore::default());
        let bound = contract(20);
        let stale = contract(21);
        docs.docs.lock().unwrap().insert("cred".into(), bound.clone());
        docs.offline.store(true, Ordering::SeqCst);
        let resolver = fx
            .resolver()
            .with_document_store(docs.clone())
            .with_fallback(Arc::new(FakeFallback {
                answers: HashMap::from([("cred".to_string(), stale.clone())]),
                offline: false,
            }));

        let err = resolver.resolve("cred").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transient);
        assert!(fx.cache.get("cred").is_none());
        assert!(fx.db.get_mapping("cred").unwrap().is_none());

        docs.offline.store(false, Ordering::SeqCst);
        resolver.invalidate_cache();
        assert_eq!(resolver.resolve("cred").await.unwrap(), bound);
        assert_eq!(docs.docs.lock().unwrap().get("cred"), Some(&bound));
    }

    #[tokio::test]
    async fn invalid_remote_answer_is_transient_and_never_written() {
        let fx = fixture();
        let docs = Arc::new(FakeDocumentStore::default());
        let account = encode_strkey(AddressKind::Account, &[22; 32]);
        let resolver = fx
            .resolver()
            .with_document_store(docs.clone())
            .with_fallback(Arc::new(FakeFallback {
                answers: HashMap::from([
                    ("html".to_string(), "<html>oops</html>".to_string()),
                    ("account".to_string(), account),
                ]),
                offline: false,
            }));

        for credential_id in ["html", "account"] {
            let err = resolver.resolve(credential_id).await.unwrap_err();
            assert!(
                matches!(err, WalletError::Transient(ref m) if m.contains("invalid response")),
                "{credential_id}: {err}"
            );
            assert!(fx.cache.get(credential_id).is_none());
            assert!(fx.db.get_mapping(credential_id).unwrap().is_none());
            assert!(docs.docs.lock().unwrap().get(credential_id).is_none());
        }
        assert_eq!(docs.upserts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_document_store_answer_is_not_reconciled() {
        let fx = fixture();
        let docs = Arc::new(FakeDocumentStore::default());
        docs.docs
            .lock()
            .unwrap()
            .insert("cred".into(), "not-an-address".into());
        let addr = contract(23);
        fx.db.upsert_mapping("cred", &addr).unwrap();
        let resolver = fx.resolver().with_document_store(docs);

        let err = resolver.reconcile("cred").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transient);
        assert_eq!(fx.db.get_mapping("cred").unwrap().unwrap().contract_address, addr);
    }

    #[tokio::test]
    async fn slow_remote_tier_times_out_as_transient() {
        let fx = fixture();
        let docs = Arc::new(FakeDocumentStore::default());
        docs.hang.store(true, Ordering::SeqCst);
        let resolver = fx.resolver().with_document_store(docs);

        let err = resolver.resolve("cred").await.unwrap_err();
        assert!(matches!(err, WalletError::Transient(ref m) if m.contains("timed out")));
    }

    #[tokio::test]
    async fn bind_with_offline_document_store_queues_and_retries() {
        let fx = fixture();
        let docs = Arc::new(FakeDocumentStore::default());
        docs.offline.store(true, Ordering::SeqCst);
        let resolver = fx.resolver().with_document_store(docs.clone());
        let addr = contract(5);

        assert_eq!(
            resolver.bind("cred-5", &addr).await.unwrap(),
            BindStatus::PendingRemote
        );
        assert_eq!(resolver.resolve("cred-5").await.unwrap(), addr);
        assert_eq!(fx.db.pending_binds().unwrap().len(), 1);

        assert_eq!(resolver.retry_pending_binds().await.unwrap(), 0);

        docs.offline.store(false, Ordering::SeqCst);
        assert_eq!(resolver.retry_pending_binds().await.unwrap(), 1);
        assert!(fx.db.pending_binds().unwrap().is_empty());
        assert_eq!(docs.docs.lock().unwrap().get("cred-5"), Some(&addr));
    }

    #[tokio::test]
    async fn bind_rejects_remap_and_non_contract_addresses() {
        let fx = fixture();
        let resolver = fx.resolver();
        resolver.bind("cred-6", &contract(6)).await.unwrap();

        let err = resolver.bind("cred-6", &contract(7)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MappingConflict);

        assert_eq!(
            resolver.bind("cred-6", &contract(6)).await.unwrap(),
            BindStatus::LocalOnly
        );

        let account = encode_strkey(AddressKind::Account, &[6; 32]);
        let err = resolver.bind("cred-8", &account).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAddress);
    }

    #[tokio::test]
    async fn reconcile_prefers_document_store() {
        let fx = fixture();
        let docs = Arc::new(FakeDocumentStore::default());
        let resolver = fx.resolver().with_document_store(docs.clone());
        let stale = contract(8);
        let authoritative = contract(9);
        fx.db.upsert_mapping("cred-9", &stale).unwrap();
        fx.cache.put("cred-9", &stale);
        docs.docs
            .lock()
            .unwrap()
            .insert("cred-9".into(), authoritative.clone());

        assert_eq!(
            resolver.reconcile("cred-9").await.unwrap().as_deref(),
            Some(authoritative.as_str())
        );
        assert_eq!(
            fx.db.get_mapping("cred-9").unwrap().unwrap().contract_address,
            authoritative
        );
        assert_eq!(resolver.resolve("cred-9").await.unwrap(), authoritative);
    }

    #[tokio::test]
    async fn reconcile_pushes_local_only_mapping() {
        let fx = fixture();
        let docs = Arc::new(FakeDocumentStore::default());
        let resolver = fx.resolver().with_document_store(docs.clone());
        let addr = contract(10);
        fx.db.upsert_mapping("cred-10", &addr).unwrap();

        assert_eq!(
            resolver.reconcile("cred-10").await.unwrap().as_deref(),
            Some(addr.as_str())
        );
        assert_eq!(docs.docs.lock().unwrap().get("cred-10"), Some(&addr));
        assert!(resolver.reconcile("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reconcile_without_document_store_is_config_error() {
        let fx = fixture();
        let err = fx.resolver().reconcile("cred").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[tokio::test]
    async fn invalidate_cache_drops_everything() {
        let fx = fixture();
        let resolver = fx.resolver();
        fx.cache.put("a", "CA");
        fx.cache.put("b", "CB");
        resolver.invalidate_cache();
        assert!(fx.cache.is_empty());
    }
}
