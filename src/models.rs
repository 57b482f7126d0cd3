// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared value types passed between the session, signer and router.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::submission::FailureClass;

/// How the user authorizes transactions. Fixed for the life of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletModality {
    /// External signer holding a classic account keypair.
    Keypair,
    /// Deployed contract wallet authorized by a platform passkey.
    EmbeddedContract,
}

impl fmt::Display for WalletModality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletModality::Keypair => write!(f, "keypair"),
            WalletModality::EmbeddedContract => write!(f, "embedded_contract"),
        }
    }
}

/// Session connection state machine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Unusable until `disconnect()` or a fresh connect.
    Failed(String),
}

impl ConnectionState {
    /// Whether a connect or create call may start from this state.
    pub fn can_begin_connect(&self) -> bool {
        matches!(self, ConnectionState::Disconnected | ConnectionState::Failed(_))
    }
}

/// The connected wallet as seen by signing and payment code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveWallet {
    pub modality: WalletModality,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_id: Option<String>,
}

/// Descriptor persisted locally so the next process start can reconnect
/// silently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescriptor {
    pub address: String,
    pub modality: WalletModality,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_id: Option<String>,
    pub saved_at: DateTime<Utc>,
}

impl SessionDescriptor {
    pub fn from_wallet(wallet: &ActiveWallet) -> Self {
        Self {
            address: wallet.address.clone(),
            modality: wallet.modality,
            credential_id: wallet.credential_id.clone(),
            saved_at: Utc::now(),
        }
    }
}

/// Credential id → contract address binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialMapping {
    pub credential_id: String,
    pub contract_address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CredentialMapping {
    pub fn new(credential_id: impl Into<String>, contract_address: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            credential_id: credential_id.into(),
            contract_address: contract_address.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Signed transaction produced by either modality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEnvelope {
    /// Envelope bytes as handed to the signer.
    pub raw_transaction: Vec<u8>,
    /// Envelope bytes ready for submission.
    pub signed_transaction: Vec<u8>,
    pub signer_address: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionMethod {
    Direct,
    Relayed,
}

/// Result of one routed submission. Returned to the caller, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    pub method: SubmissionMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    /// Underlying ledger or relay message, unmodified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_class: Option<FailureClass>,
    /// Relay credit count observed with this submission, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits_remaining: Option<u64>,
}

impl SubmissionOutcome {
    pub fn succeeded(method: SubmissionMethod, transaction_hash: Option<String>) -> Self {
        Self {
            success: true,
            transaction_hash,
            method,
            error: None,
            message: None,
            failure_class: None,
            credits_remaining: None,
        }
    }

    pub fn failed(
        method: SubmissionMethod,
        message: impl Into<String>,
        failure_class: FailureClass,
    ) -> Self {
        Self {
            success: false,
            transaction_hash: None,
            method,
            error: Some(ErrorKind::SubmissionFailed),
            message: Some(message.into()),
            failure_class: Some(failure_class),
            credits_remaining: None,
        }
    }

    pub fn with_credits(mut self, credits: Option<u64>) -> Self {
        self.credits_remaining = credits;
        self
    }
}
