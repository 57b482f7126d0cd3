// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use serde::{Deserialize, Serialize};

use crate::ledger::LedgerError;
use crate::storage::StoreError;

/// Stable classification of a [`WalletError`], carried in submission
/// outcomes and used by callers to pick a user-facing reaction.
///
/// `SubmissionFailed` has no error variant: rejected submissions come back
/// as a failed `SubmissionOutcome`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UserCancelled,
    NotFound,
    Transient,
    MalformedSignerResponse,
    Signer,
    SubmissionFailed,
    InvalidAddress,
    InvalidAmount,
    InvalidPayment,
    InvalidEnvelope,
    SessionBusy,
    NotConnected,
    AlreadyConnected,
    SessionFailed,
    PlatformUnsupported,
    MappingConflict,
    Ledger,
    Storage,
    Config,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    /// The user dismissed a signer or passkey prompt. Never shown as an error.
    #[error("request cancelled by the user")]
    UserCancelled,

    /// The credential on this device is not bound to any deployed wallet.
    #[error("no wallet is bound to credential {credential_id}; create a new wallet instead")]
    NotFound { credential_id: String },

    #[error("remote lookup unavailable: {0}")]
    Transient(String),

    #[error("signer returned an unrecognized response: {0}")]
    MalformedSignerResponse(String),

    /// The signer or platform authenticator failed for a reason other than
    /// user cancellation.
    #[error("signer error: {0}")]
    Signer(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid payment: {0}")]
    InvalidPayment(String),

    #[error("Invalid transaction envelope: {0}")]
    InvalidEnvelope(String),

    #[error("a wallet connection is already in progress")]
    SessionBusy,

    #[error("no wallet connected")]
    NotConnected,

    #[error("a wallet is already connected; disconnect first")]
    AlreadyConnected,

    #[error("wallet session unusable: {0}")]
    SessionFailed(String),

    #[error("passkeys are not supported on this platform")]
    PlatformUnsupported,

    #[error("credential {credential_id} is already bound to {existing}")]
    MappingConflict {
        credential_id: String,
        existing: String,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Internal(String),
}

pub type WalletResult<T> = Result<T, WalletError>;

impl WalletError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WalletError::UserCancelled => ErrorKind::UserCancelled,
            WalletError::NotFound { .. } => ErrorKind::NotFound,
            WalletError::Transient(_) => ErrorKind::Transient,
            WalletError::MalformedSignerResponse(_) => ErrorKind::MalformedSignerResponse,
            WalletError::Signer(_) => ErrorKind::Signer,
            WalletError::InvalidAddress(_) => ErrorKind::InvalidAddress,
            WalletError::InvalidAmount(_) => ErrorKind::InvalidAmount,
            WalletError::InvalidPayment(_) => ErrorKind::InvalidPayment,
            WalletError::InvalidEnvelope(_) => ErrorKind::InvalidEnvelope,
            WalletError::SessionBusy => ErrorKind::SessionBusy,
            WalletError::NotConnected => ErrorKind::NotConnected,
            WalletError::AlreadyConnected => ErrorKind::AlreadyConnected,
            WalletError::SessionFailed(_) => ErrorKind::SessionFailed,
            WalletError::PlatformUnsupported => ErrorKind::PlatformUnsupported,
            WalletError::MappingConflict { .. } => ErrorKind::MappingConflict,
            WalletError::Ledger(e) if e.is_connectivity() => ErrorKind::Transient,
            WalletError::Ledger(_) => ErrorKind::Ledger,
            WalletError::Storage(_) => ErrorKind::Storage,
            WalletError::Config(_) => ErrorKind::Config,
            WalletError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether the caller should stay silent about this error.
    pub fn is_silent(&self) -> bool {
        matches!(self, WalletError::UserCancelled)
    }

    /// Whether the connect flow should switch to wallet creation.
    pub fn requires_wallet_creation(&self) -> bool {
        matches!(self, WalletError::NotFound { .. })
    }
}
