// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Wallet Session
//!
//! Owns the single connected wallet of the process and its connection
//! state machine.
//!
//! ```text
//! Disconnected --connect--> Connecting --ok--> Connected
//!                               |  \--cancel / error--> Disconnected
//!                               \--unusable wallet--> Failed(reason)
//! any --disconnect--> Disconnected
//! ```
//!
//! ## Concurrency
//!
//! Connect, create and restore share one in-flight guard; a second call
//! while one runs fails with `SessionBusy`. `disconnect` never waits for the
//! guard. It cancels the in-flight call's token, and that call then returns
//! `UserCancelled` without touching the session.
//!
//! State transitions and descriptor writes happen under the state lock, and
//! the abort token is checked under the same lock, so a disconnect can never
//! be overwritten by a connect that finished late.

pub mod platform;

pub use platform::{
    Assertion, ContractWalletDeployer, NewCredential, PlatformCredentials, PlatformError,
};

use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{WalletError, WalletResult};
use crate::ledger::{parse_address, AddressKind};
use crate::models::{ActiveWallet, ConnectionState, SessionDescriptor, WalletModality};
use crate::resolver::{BindStatus, CredentialResolver};
use crate::signer::SignerConnector;
use crate::storage::SessionStore;

/// Result of the startup silent reconnect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    Restored(ActiveWallet),
    NothingPersisted,
    /// A descriptor existed but could not be restored and was removed.
    Cleared(String),
}

#[derive(Debug, Default)]
struct SessionInner {
    state: ConnectionState,
    wallet: Option<ActiveWallet>,
}

pub struct WalletSession {
    connector: Arc<dyn SignerConnector>,
    platform: Arc<dyn PlatformCredentials>,
    deployer: Arc<dyn ContractWalletDeployer>,
    resolver: Arc<CredentialResolver>,
    store: Arc<dyn SessionStore>,
    inner: RwLock<SessionInner>,
    in_flight: Mutex<()>,
    abort: StdMutex<CancellationToken>,
}

impl WalletSession {
    pub fn new(
        connector: Arc<dyn SignerConnector>,
        platform: Arc<dyn PlatformCredentials>,
        deployer: Arc<dyn ContractWalletDeployer>,
        resolver: Arc<CredentialResolver>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            connector,
            platform,
            deployer,
            resolver,
            store,
            inner: RwLock::new(SessionInner::default()),
            in_flight: Mutex::new(()),
            abort: StdMutex::new(CancellationToken::new()),
        }
    }

    pub async fn state(&self) -> ConnectionState {
        self.inner.read().await.state.clone()
    }

    /// The connected wallet, if the session is `Connected`.
    pub async fn active_wallet(&self) -> Option<ActiveWallet> {
        let inner = self.inner.read().await;
        match inner.state {
            ConnectionState::Connected => inner.wallet.clone(),
            _ => None,
        }
    }

    pub fn is_embedded_supported(&self) -> bool {
        self.platform.is_supported()
    }

    /// Connect through the external keypair signer.
    pub async fn connect_keypair(&self) -> WalletResult<ActiveWallet> {
        let _guard = self.in_flight.try_lock().map_err(|_| WalletError::SessionBusy)?;
        let token = self.begin_connect().await?;
        let result = self.select_keypair(&token).await;
        self.finish_connect(&token, result, false).await
    }

    /// Connect the embedded wallet bound to the user's passkey.
    ///
    /// Fails with `NotFound` when the credential has no wallet yet; the
    /// caller should then offer [`create_embedded`](Self::create_embedded).
    pub async fn connect_embedded(&self) -> WalletResult<ActiveWallet> {
        let _guard = self.in_flight.try_lock().map_err(|_| WalletError::SessionBusy)?;
        let token = self.begin_connect().await?;
        let result = self.assert_and_resolve(&token).await;
        self.finish_connect(&token, result, false).await
    }

    /// Register a new passkey, deploy its contract wallet and bind them.
    pub async fn create_embedded(&self, display_name: &str) -> WalletResult<ActiveWallet> {
        let _guard = self.in_flight.try_lock().map_err(|_| WalletError::SessionBusy)?;
        let token = self.begin_connect().await?;
        let result = self.create_and_bind(&token, display_name).await;
        self.finish_connect(&token, result, false).await
    }

    /// Drop the session, its cached mappings and the persisted descriptor.
    /// Aborts any in-flight connect.
    pub async fn disconnect(&self) {
        let mut inner = self.inner.write().await;
        {
            let mut token = self.abort.lock().unwrap_or_else(PoisonError::into_inner);
            token.cancel();
            *token = CancellationToken::new();
        }

        let was = std::mem::take(&mut *inner);
        self.resolver.invalidate_cache();
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear persisted session descriptor");
        }
        info!(previous_state = ?was.state, "Wallet disconnected");
    }

    /// Silently reconnect the wallet persisted by a previous run. Never
    /// prompts the user.
    pub async fn restore(&self) -> WalletResult<RestoreOutcome> {
        let _guard = self.in_flight.try_lock().map_err(|_| WalletError::SessionBusy)?;

        let descriptor = match self.store.load() {
            Ok(Some(descriptor)) => descriptor,
            Ok(None) => {
                debug!("No persisted session to restore");
                return Ok(RestoreOutcome::NothingPersisted);
            }
            Err(e) => {
                warn!(error = %e, "Unreadable session descriptor, clearing");
                if let Err(e) = self.store.clear() {
                    warn!(error = %e, "Failed to clear session descriptor");
                }
                return Ok(RestoreOutcome::Cleared(e.to_string()));
            }
        };

        let token = self.begin_connect().await?;
        let result = self.silent_reconnect(&token, &descriptor).await;
        match self.finish_connect(&token, result, true).await {
            Ok(wallet) => Ok(RestoreOutcome::Restored(wallet)),
            Err(e) => Ok(RestoreOutcome::Cleared(e.to_string())),
        }
    }

    async fn begin_connect(&self) -> WalletResult<CancellationToken> {
        let mut inner = self.inner.write().await;
        if !inner.state.can_begin_connect() {
            return Err(match inner.state {
                ConnectionState::Connected => WalletError::AlreadyConnected,
                _ => WalletError::SessionBusy,
            });
        }
        inner.state = ConnectionState::Connecting;
        inner.wallet = None;
        debug!("Wallet connect started");

        let token = self.abort.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(token.clone())
    }

    /// Apply a connect result, unless a disconnect aborted it.
    ///
    /// `silent` connects never enter `Failed`: any error leaves the session
    /// `Disconnected` with the descriptor removed.
    async fn finish_connect(
        &self,
        token: &CancellationToken,
        result: WalletResult<ActiveWallet>,
        silent: bool,
    ) -> WalletResult<ActiveWallet> {
        let mut inner = self.inner.write().await;
        if token.is_cancelled() {
            debug!("Discarding result of aborted connect");
            return Err(WalletError::UserCancelled);
        }

        match result {
            Ok(wallet) => {
                if let Err(e) = self.store.save(&SessionDescriptor::from_wallet(&wallet)) {
                    warn!(error = %e, "Failed to persist session descriptor");
                }
                inner.state = ConnectionState::Connected;
                inner.wallet = Some(wallet.clone());
                info!(
                    modality = %wallet.modality,
                    address = %wallet.address,
                    "Wallet connected"
                );
                Ok(wallet)
            }
            Err(e) => {
                inner.wallet = None;
                match (&e, silent) {
                    (WalletError::SessionFailed(reason), false) => {
                        warn!(reason = %reason, "Wallet session failed");
                        inner.state = ConnectionState::Failed(reason.clone());
                    }
                    _ => {
                        if e.is_silent() {
                            debug!("Wallet connect cancelled by the user");
                        } else {
                            warn!(error = %e, silent, "Wallet connect failed");
                        }
                        inner.state = ConnectionState::Disconnected;
                    }
                }
                if silent {
                    if let Err(e) = self.store.clear() {
                        warn!(error = %e, "Failed to clear session descriptor");
                    }
                }
                Err(e)
            }
        }
    }

    async fn select_keypair(&self, token: &CancellationToken) -> WalletResult<ActiveWallet> {
        let address = until_aborted(token, self.connector.select_account()).await??;
        keypair_wallet(address)
    }

    async fn assert_and_resolve(&self, token: &CancellationToken) -> WalletResult<ActiveWallet> {
        if !self.platform.is_supported() {
            return Err(WalletError::PlatformUnsupported);
        }

        let challenge = Uuid::new_v4();
        let assertion =
            until_aborted(token, self.platform.get_assertion(challenge.as_bytes(), None)).await??;
        let credential_id = assertion.credential_id;

        self.flush_pending_binds().await;
        let address = until_aborted(token, self.resolver.resolve(&credential_id)).await??;
        embedded_wallet(credential_id, address)
    }

    async fn create_and_bind(
        &self,
        token: &CancellationToken,
        display_name: &str,
    ) -> WalletResult<ActiveWallet> {
        if !self.platform.is_supported() {
            return Err(WalletError::PlatformUnsupported);
        }

        let credential =
            until_aborted(token, self.platform.create_credential(display_name)).await??;
        let address = until_aborted(token, self.deployer.deploy(&credential)).await??;

        // Bind even when aborted from here on: the contract is deployed.
        let status = self
            .resolver
            .bind(&credential.credential_id, &address)
            .await?;
        if status == BindStatus::PendingRemote {
            info!(
                credential_id = %credential.credential_id,
                "Wallet created, remote bind pending"
            );
        }
        embedded_wallet(credential.credential_id, address)
    }

    async fn silent_reconnect(
        &self,
        token: &CancellationToken,
        descriptor: &SessionDescriptor,
    ) -> WalletResult<ActiveWallet> {
        match descriptor.modality {
            WalletModality::Keypair => {
                match until_aborted(token, self.connector.connected_account()).await?? {
                    Some(account) if account == descriptor.address => keypair_wallet(account),
                    Some(account) => Err(WalletError::SessionFailed(format!(
                        "signer now authorizes {account}, not {}",
                        descriptor.address
                    ))),
                    None => Err(WalletError::SessionFailed(format!(
                        "signer no longer authorizes {}",
                        descriptor.address
                    ))),
                }
            }
            WalletModality::EmbeddedContract => {
                let credential_id = descriptor.credential_id.clone().ok_or_else(|| {
                    WalletError::SessionFailed("persisted session has no credential id".to_string())
                })?;
                self.flush_pending_binds().await;
                let address = until_aborted(token, self.resolver.resolve(&credential_id)).await??;
                if address != descriptor.address {
                    return Err(WalletError::SessionFailed(format!(
                        "credential now resolves to {address}, not {}",
                        descriptor.address
                    )));
                }
                embedded_wallet(credential_id, address)
            }
        }
    }

    async fn flush_pending_binds(&self) {
        match self.resolver.retry_pending_binds().await {
            Ok(0) => {}
            Ok(flushed) => info!(flushed, "Flushed pending binds on connect"),
            Err(e) => warn!(error = %e, "Failed to retry pending binds"),
        }
    }
}

/// Run `call` unless `token` is cancelled first.
async fn until_aborted<T>(
    token: &CancellationToken,
    call: impl Future<Output = T>,
) -> WalletResult<T> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(WalletError::UserCancelled),
        out = call => Ok(out),
    }
}

fn keypair_wallet(address: String) -> WalletResult<ActiveWallet> {
    match parse_address(&address) {
        Ok(AddressKind::Account) => Ok(ActiveWallet {
            modality: WalletModality::Keypair,
            address,
            credential_id: None,
        }),
        Ok(AddressKind::Contract) => Err(WalletError::SessionFailed(format!(
            "signer selected contract address {address}, expected an account"
        ))),
        Err(e) => Err(WalletError::SessionFailed(format!(
            "signer selected an unusable address: {e}"
        ))),
    }
}

fn embedded_wallet(credential_id: String, address: String) -> WalletResult<ActiveWallet> {
    match parse_address(&address) {
        Ok(AddressKind::Contract) => Ok(ActiveWallet {
            modality: WalletModality::EmbeddedContract,
            address,
            credential_id: Some(credential_id),
        }),
        Ok(AddressKind::Account) => Err(WalletError::SessionFailed(format!(
            "credential {credential_id} maps to account {address}, expected a contract"
        ))),
        Err(e) => Err(WalletError::SessionFailed(format!(
            "credential {credential_id} maps to an unusable address: {e}"
        ))),
    }
}
