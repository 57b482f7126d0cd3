// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fakes and wiring for end-to-end wallet tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::Semaphore;

use relational_stellar_wallet::ledger::{
    encode_strkey, AddressKind, LedgerClient, LedgerError, STELLAR_TESTNET,
};
use relational_stellar_wallet::payments::PaymentOrchestrator;
use relational_stellar_wallet::relay::{RelayResponse, SponsorshipRelay};
use relational_stellar_wallet::resolver::{
    CredentialResolver, DocumentStore, FallbackResolver, TierError,
};
use relational_stellar_wallet::session::{
    Assertion, ContractWalletDeployer, NewCredential, PlatformCredentials, PlatformError,
    WalletSession,
};
use relational_stellar_wallet::signer::{ConnectorError, SignerConnector, TransactionSigner};
use relational_stellar_wallet::storage::{CredentialCache, CredentialDatabase};
use relational_stellar_wallet::submission::SubmissionRouter;
use relational_stellar_wallet::WalletResult;

pub fn account(byte: u8) -> String {
    encode_strkey(AddressKind::Account, &[byte; 32])
}

pub fn contract(byte: u8) -> String {
    encode_strkey(AddressKind::Contract, &[byte; 32])
}

// =============================================================================
// External signer
// =============================================================================

pub struct FakeConnector {
    pub account: String,
    pub prompts: AtomicUsize,
    pub signatures: AtomicUsize,
    pub authorized: Mutex<Option<String>>,
}

impl FakeConnector {
    pub fn new(account: String) -> Self {
        Self {
            account,
            prompts: AtomicUsize::new(0),
            signatures: AtomicUsize::new(0),
            authorized: Mutex::new(None),
        }
    }
}

#[async_trait]
impl SignerConnector for FakeConnector {
    async fn select_account(&self) -> Result<String, ConnectorError> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        *self.authorized.lock().unwrap() = Some(self.account.clone());
        Ok(self.account.clone())
    }

    async fn connected_account(&self) -> Result<Option<String>, ConnectorError> {
        Ok(self.authorized.lock().unwrap().clone())
    }

    async fn sign_transaction(
        &self,
        envelope_base64: &str,
        _network_passphrase: &str,
        address: &str,
    ) -> Result<Value, ConnectorError> {
        self.signatures.fetch_add(1, Ordering::SeqCst);
        // Append a fake 64-byte signature to the envelope.
        let mut signed = STANDARD
            .decode(envelope_base64)
            .map_err(|e| ConnectorError::Rejected(e.to_string()))?;
        signed.extend_from_slice(&[0xAB; 64]);
        Ok(json!({ "signedTxXdr": STANDARD.encode(signed), "signerAddress": address }))
    }
}

// =============================================================================
// Platform passkeys
// =============================================================================

pub struct FakePlatform {
    pub credential_id: String,
    pub prompts: AtomicUsize,
    /// When set, assertions block until a permit is added.
    pub gate: Option<Semaphore>,
}

impl FakePlatform {
    pub fn new(credential_id: &str) -> Self {
        Self {
            credential_id: credential_id.to_string(),
            prompts: AtomicUsize::new(0),
            gate: None,
        }
    }

    pub fn gated(credential_id: &str) -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new(credential_id)
        }
    }
}

#[async_trait]
impl PlatformCredentials for FakePlatform {
    fn is_supported(&self) -> bool {
        true
    }

    async fn create_credential(&self, _display_name: &str) -> Result<NewCredential, PlatformError> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        Ok(NewCredential {
            credential_id: self.credential_id.clone(),
            public_key: vec![4; 65],
        })
    }

    async fn get_assertion(
        &self,
        _challenge: &[u8],
        _credential_id: Option<&str>,
    ) -> Result<Assertion, PlatformError> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await;
        }
        Ok(Assertion {
            credential_id: self.credential_id.clone(),
            authenticator_data: vec![1; 37],
            client_data_json: br#"{"type":"webauthn.get"}"#.to_vec(),
            signature: vec![2; 64],
        })
    }
}

pub struct FakeDeployer {
    pub address: String,
}

#[async_trait]
impl ContractWalletDeployer for FakeDeployer {
    async fn deploy(&self, _credential: &NewCredential) -> WalletResult<String> {
        Ok(self.address.clone())
    }
}

// =============================================================================
// Ledger and relay
// =============================================================================

pub struct FakeLedger {
    pub sequence: i64,
    pub submit_result: Mutex<Result<String, LedgerError>>,
    pub sequence_calls: AtomicUsize,
    pub submissions: AtomicUsize,
}

impl FakeLedger {
    pub fn accepting(hash: &str) -> Self {
        Self::with_result(Ok(hash.to_string()))
    }

    pub fn rejecting(message: &str) -> Self {
        Self::with_result(Err(LedgerError::Rejected(message.to_string())))
    }

    fn with_result(result: Result<String, LedgerError>) -> Self {
        Self {
            sequence: 41,
            submit_result: Mutex::new(result),
            sequence_calls: AtomicUsize::new(0),
            submissions: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LedgerClient for FakeLedger {
    async fn account_sequence(&self, _account: &str) -> Result<i64, LedgerError> {
        self.sequence_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.sequence)
    }

    async fn submit_transaction(&self, _envelope: &[u8]) -> Result<String, LedgerError> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        self.submit_result.lock().unwrap().clone()
    }
}

pub struct FakeRelay {
    pub response: RelayResponse,
    pub submissions: AtomicUsize,
    pub last_envelope: Mutex<Option<Vec<u8>>>,
}

impl FakeRelay {
    pub fn accepting(hash: &str, credits: u64) -> Self {
        Self {
            response: RelayResponse::accepted(Some(hash.to_string()), Some(credits)),
            submissions: AtomicUsize::new(0),
            last_envelope: Mutex::new(None),
        }
    }
}

#[async_trait]
impl SponsorshipRelay for FakeRelay {
    async fn submit(&self, envelope: &[u8]) -> RelayResponse {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        *self.last_envelope.lock().unwrap() = Some(envelope.to_vec());
        self.response.clone()
    }

    async fn get_credits(&self) -> u64 {
        self.response.credits_remaining.unwrap_or(0)
    }
}

// =============================================================================
// Document store
// =============================================================================

#[derive(Default)]
pub struct SharedDocumentStore {
    pub docs: Mutex<HashMap<String, String>>,
    pub offline: AtomicBool,
    pub reads: AtomicUsize,
}

#[async_trait]
impl DocumentStore for SharedDocumentStore {
    async fn get(&self, credential_id: &str) -> Result<Option<String>, TierError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(TierError::Unavailable("connection refused".into()));
        }
        Ok(self.docs.lock().unwrap().get(credential_id).cloned())
    }

    async fn upsert(&self, credential_id: &str, contract_address: &str) -> Result<(), TierError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(TierError::Unavailable("connection refused".into()));
        }
        self.docs
            .lock()
            .unwrap()
            .insert(credential_id.to_string(), contract_address.to_string());
        Ok(())
    }
}

// =============================================================================
// Wiring
// =============================================================================

/// One "device": its own local database and cache.
/// Legacy lookup service with scripted answers.
#[derive(Default)]
pub struct ScriptedFallback {
    pub answers: Mutex<HashMap<String, String>>,
    pub lookups: AtomicUsize,
}

impl ScriptedFallback {
    pub fn answer(&self, credential_id: &str, body: &str) {
        self.answers
            .lock()
            .unwrap()
            .insert(credential_id.into(), body.into());
    }
}

#[async_trait]
impl FallbackResolver for ScriptedFallback {
    async fn lookup(&self, credential_id: &str) -> Result<Option<String>, TierError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.answers.lock().unwrap().get(credential_id).cloned())
    }
}

pub struct Device {
    pub dir: TempDir,
    pub db: Arc<CredentialDatabase>,
    pub cache: Arc<CredentialCache>,
}

impl Device {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(CredentialDatabase::open(&dir.path().join("wallet.redb")).unwrap());
        Self {
            dir,
            db,
            cache: Arc::new(CredentialCache::new(64)),
        }
    }

    /// Simulate a process restart: reopen the database, empty cache.
    pub fn restart(self) -> Self {
        let Device { dir, db, .. } = self;
        drop(db);
        let db = Arc::new(CredentialDatabase::open(&dir.path().join("wallet.redb")).unwrap());
        Self {
            dir,
            db,
            cache: Arc::new(CredentialCache::new(64)),
        }
    }

    pub fn resolver(&self, docs: Option<Arc<SharedDocumentStore>>) -> Arc<CredentialResolver> {
        let resolver =
            CredentialResolver::new(self.cache.clone(), self.db.clone(), Duration::from_secs(1));
        Arc::new(match docs {
            Some(docs) => resolver.with_document_store(docs),
            None => resolver,
        })
    }

    pub fn resolver_with_fallback(
        &self,
        docs: Arc<SharedDocumentStore>,
        fallback: Arc<ScriptedFallback>,
    ) -> Arc<CredentialResolver> {
        Arc::new(
            CredentialResolver::new(self.cache.clone(), self.db.clone(), Duration::from_secs(1))
                .with_document_store(docs)
                .with_fallback(fallback),
        )
    }
}

pub struct Wallet {
    pub session: Arc<WalletSession>,
    pub payments: PaymentOrchestrator,
    pub connector: Arc<FakeConnector>,
    pub platform: Arc<FakePlatform>,
    pub ledger: Arc<FakeLedger>,
    pub relay: Arc<FakeRelay>,
}

pub fn wallet(
    device: &Device,
    resolver: Arc<CredentialResolver>,
    platform: Arc<FakePlatform>,
    ledger: Arc<FakeLedger>,
    relay: Arc<FakeRelay>,
) -> Wallet {
    let connector = Arc::new(FakeConnector::new(account(1)));
    let session = Arc::new(WalletSession::new(
        connector.clone(),
        platform.clone(),
        Arc::new(FakeDeployer {
            address: contract(7),
        }),
        resolver,
        device.db.clone(),
    ));
    let signer = Arc::new(TransactionSigner::new(
        STELLAR_TESTNET,
        connector.clone(),
        platform.clone(),
    ));
    let router = Arc::new(SubmissionRouter::new(ledger.clone(), relay.clone()));
    let payments = PaymentOrchestrator::new(
        STELLAR_TESTNET,
        session.clone(),
        signer,
        router,
        ledger.clone(),
    );
    Wallet {
        session,
        payments,
        connector,
        platform,
        ledger,
        relay,
    }
}
