// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! External keypair signer connector.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::WalletError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectorError {
    #[error("user cancelled the signer prompt")]
    Cancelled,

    /// The signer refused the request (wrong network, locked, policy).
    #[error("signer rejected the request: {0}")]
    Rejected(String),

    #[error("signer unavailable: {0}")]
    Unavailable(String),
}

impl From<ConnectorError> for WalletError {
    fn from(e: ConnectorError) -> Self {
        match e {
            ConnectorError::Cancelled => WalletError::UserCancelled,
            other => WalletError::Signer(other.to_string()),
        }
    }
}

/// Bridge to an external wallet holding the account keypair.
#[async_trait]
pub trait SignerConnector: Send + Sync {
    /// Prompt the user to pick an account.
    async fn select_account(&self) -> Result<String, ConnectorError>;

    /// Account the signer has already authorized, without prompting.
    async fn connected_account(&self) -> Result<Option<String>, ConnectorError>;

    /// Sign a base64 envelope. The raw response is decoded by the caller
    /// because connectors disagree on its shape.
    async fn sign_transaction(
        &self,
        envelope_base64: &str,
        network_passphrase: &str,
        address: &str,
    ) -> Result<Value, ConnectorError>;
}
