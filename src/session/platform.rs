// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Platform passkey API and contract wallet deployment collaborators.

use async_trait::async_trait;

use crate::error::{WalletError, WalletResult};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    #[error("user cancelled the passkey prompt")]
    Cancelled,

    #[error("passkeys are not supported on this platform")]
    Unsupported,

    #[error("{0}")]
    Failed(String),
}

impl From<PlatformError> for WalletError {
    fn from(e: PlatformError) -> Self {
        match e {
            PlatformError::Cancelled => WalletError::UserCancelled,
            PlatformError::Unsupported => WalletError::PlatformUnsupported,
            PlatformError::Failed(message) => WalletError::Signer(message),
        }
    }
}

/// A freshly registered platform credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCredential {
    pub credential_id: String,
    /// Uncompressed P-256 public key the contract wallet will verify against.
    pub public_key: Vec<u8>,
}

/// A signed assertion from an existing credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assertion {
    pub credential_id: String,
    pub authenticator_data: Vec<u8>,
    pub client_data_json: Vec<u8>,
    pub signature: Vec<u8>,
}

/// Biometric credential API of the host platform.
#[async_trait]
pub trait PlatformCredentials: Send + Sync {
    fn is_supported(&self) -> bool;

    async fn create_credential(&self, display_name: &str) -> Result<NewCredential, PlatformError>;

    /// Ask the user to assert over `challenge`. With `credential_id` unset
    /// the platform lets the user pick any discoverable credential.
    async fn get_assertion(
        &self,
        challenge: &[u8],
        credential_id: Option<&str>,
    ) -> Result<Assertion, PlatformError>;
}

/// Deploys a contract wallet controlled by a passkey.
#[async_trait]
pub trait ContractWalletDeployer: Send + Sync {
    /// Returns the contract address (`C...`).
    async fn deploy(&self, credential: &NewCredential) -> WalletResult<String>;
}
