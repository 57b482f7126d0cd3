// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Stellar ledger integration.
//!
//! This module provides:
//! - Network configuration (testnet / mainnet)
//! - StrKey address validation for accounts (`G...`) and contracts (`C...`)
//! - Amount parsing and formatting at the ledger's 7-decimal precision
//! - The transaction envelope model and its network-bound hash
//! - A Horizon client for sequence lookups and direct submission

pub mod address;
pub mod amount;
pub mod client;
pub mod transactions;
pub mod types;

pub use address::{
    account_public_key, encode_strkey, parse_address, validate_account, validate_contract,
    AddressKind,
};
pub use amount::{format_amount, normalize_amount, parse_amount};
pub use client::{HorizonClient, LedgerClient, LedgerError};
pub use transactions::{
    EnvelopeFormat, Operation, PasskeyAuthorization, Transaction, TransactionEnvelope,
};
pub use types::*;
