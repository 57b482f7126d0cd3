// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! StrKey address validation.
//!
//! Account ids start with `G`, contract ids with `C`. Any other StrKey
//! (seeds, muxed accounts, pre-auth hashes) is rejected.

use stellar_strkey::{ed25519, Contract, Strkey};

use crate::error::{WalletError, WalletResult};

/// Encoded length of a 32-byte key.
const STRKEY_LEN: usize = 56;

/// What an address identifies on the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    /// Classic account controlled by an ed25519 keypair (`G...`).
    Account,
    /// Smart contract (`C...`).
    Contract,
}

/// Decode and checksum-verify an address, returning its kind.
pub fn parse_address(address: &str) -> WalletResult<AddressKind> {
    if address.len() != STRKEY_LEN {
        return Err(WalletError::InvalidAddress(format!(
            "`{address}` must be {STRKEY_LEN} characters"
        )));
    }

    match Strkey::from_string(address) {
        Ok(Strkey::PublicKeyEd25519(_)) => Ok(AddressKind::Account),
        Ok(Strkey::Contract(_)) => Ok(AddressKind::Contract),
        Ok(_) => Err(WalletError::InvalidAddress(format!(
            "`{address}` is neither an account nor a contract address"
        ))),
        Err(_) => Err(WalletError::InvalidAddress(format!(
            "`{address}` is not a valid StrKey"
        ))),
    }
}

/// Require a classic account address.
pub fn validate_account(address: &str) -> WalletResult<()> {
    account_public_key(address).map(|_| ())
}

/// Require a contract address.
pub fn validate_contract(address: &str) -> WalletResult<()> {
    match parse_address(address)? {
        AddressKind::Contract => Ok(()),
        AddressKind::Account => Err(WalletError::InvalidAddress(format!(
            "`{address}` is an account, expected a contract"
        ))),
    }
}

/// Raw ed25519 key behind an account address.
pub fn account_public_key(address: &str) -> WalletResult<[u8; 32]> {
    match parse_address(address)? {
        AddressKind::Account => ed25519::PublicKey::from_string(address)
            .map(|key| key.0)
            .map_err(|_| WalletError::InvalidAddress(format!("`{address}` is not a valid StrKey"))),
        AddressKind::Contract => Err(WalletError::InvalidAddress(format!(
            "`{address}` is a contract, expected an account"
        ))),
    }
}

/// Encode a 32-byte payload as a StrKey of the given kind.
pub fn encode_strkey(kind: AddressKind, payload: &[u8; 32]) -> String {
    match kind {
        AddressKind::Account => ed25519::PublicKey(*payload).to_string(),
        AddressKind::Contract => Contract(*payload).to_string(),
    }
}
