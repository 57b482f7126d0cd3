// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger types and constants.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::address::validate_account;
use crate::error::{WalletError, WalletResult};

/// Stellar network configuration.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Network name for display
    pub name: &'static str,
    /// Passphrase bound into every transaction hash
    pub passphrase: &'static str,
    /// Horizon endpoint URL
    pub horizon_url: &'static str,
    /// Block explorer URL
    pub explorer_url: &'static str,
}

/// Stellar public network.
pub const STELLAR_MAINNET: NetworkConfig = NetworkConfig {
    name: "Stellar Mainnet",
    passphrase: "Public Global Stellar Network ; September 2015",
    horizon_url: "https://horizon.stellar.org",
    explorer_url: "https://stellar.expert/explorer/public",
};

/// Stellar test network.
pub const STELLAR_TESTNET: NetworkConfig = NetworkConfig {
    name: "Stellar Testnet",
    passphrase: "Test SDF Network ; September 2015",
    horizon_url: "https://horizon-testnet.stellar.org",
    explorer_url: "https://stellar.expert/explorer/testnet",
};

impl NetworkConfig {
    pub fn explorer_tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{tx_hash}", self.explorer_url)
    }
}

/// Native asset code.
pub const NATIVE_ASSET_CODE: &str = "XLM";

/// Decimal places of every ledger amount.
pub const AMOUNT_DECIMALS: u32 = 7;

/// 1 XLM = 10^7 stroops.
pub const STROOPS_PER_UNIT: i64 = 10_000_000;

/// Base fee per operation in stroops.
pub const BASE_FEE_STROOPS: u32 = 100;

/// Seconds a built transaction stays valid.
pub const TX_VALIDITY_SECS: i64 = 300;

/// Maximum byte length of a text memo.
pub const MEMO_TEXT_MAX_BYTES: usize = 28;

/// Asset being transferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Asset {
    Native,
    Credit { code: String, issuer: String },
}

impl Asset {
    /// Parse `XLM` / `native` or `CODE:ISSUER`.
    pub fn parse(raw: &str) -> WalletResult<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case(NATIVE_ASSET_CODE) || raw.eq_ignore_ascii_case("native") {
            return Ok(Asset::Native);
        }

        let (code, issuer) = raw.split_once(':').ok_or_else(|| {
            WalletError::InvalidPayment(format!(
                "unknown currency `{raw}` (expected XLM or CODE:ISSUER)"
            ))
        })?;

        if code.is_empty() || code.len() > 12 || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(WalletError::InvalidPayment(format!(
                "asset code `{code}` must be 1-12 alphanumeric characters"
            )));
        }
        validate_account(issuer)?;

        Ok(Asset::Credit {
            code: code.to_string(),
            issuer: issuer.to_string(),
        })
    }

    pub fn code(&self) -> &str {
        match self {
            Asset::Native => NATIVE_ASSET_CODE,
            Asset::Credit { code, .. } => code,
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Native => write!(f, "{NATIVE_ASSET_CODE}"),
            Asset::Credit { code, issuer } => write!(f, "{code}:{issuer}"),
        }
    }
}

/// Transaction memo.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Memo {
    #[default]
    None,
    Text(String),
}

impl Memo {
    /// Build a text memo, rejecting values over the ledger limit.
    pub fn text(raw: Option<&str>) -> WalletResult<Self> {
        match raw.map(str::trim).filter(|m| !m.is_empty()) {
            None => Ok(Memo::None),
            Some(text) if text.len() > MEMO_TEXT_MAX_BYTES => Err(WalletError::InvalidPayment(
                format!("memo exceeds {MEMO_TEXT_MAX_BYTES} bytes"),
            )),
            Some(text) => Ok(Memo::Text(text.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::address::{encode_strkey, AddressKind};

    #[test]
    fn parse_native_asset() {
        assert_eq!(Asset::parse("XLM").unwrap(), Asset::Native);
        assert_eq!(Asset::parse("native").unwrap(), Asset::Native);
        assert_eq!(Asset::parse("xlm").unwrap().code(), "XLM");
    }

    #[test]
    fn parse_credit_asset() {
        let issuer = encode_strkey(AddressKind::Account, &[7u8; 32]);
        let asset = Asset::parse(&format!("USDC:{issuer}")).unwrap();
        assert_eq!(asset.code(), "USDC");
        assert_eq!(asset.to_string(), format!("USDC:{issuer}"));
    }

    #[test]
    fn parse_credit_asset_rejects_bad_parts() {
        let issuer = encode_strkey(AddressKind::Account, &[7u8; 32]);
        assert!(Asset::parse("EURO").is_err());
        assert!(Asset::parse(&format!("TOOLONGASSETCODE:{issuer}")).is_err());
        assert!(Asset::parse("USDC:GNOTANADDRESS").is_err());
    }

    #[test]
    fn memo_limits() {
        assert_eq!(Memo::text(None).unwrap(), Memo::None);
        assert_eq!(Memo::text(Some("  ")).unwrap(), Memo::None);
        assert_eq!(Memo::text(Some("rent")).unwrap(), Memo::Text("rent".into()));
        assert!(Memo::text(Some(&"x".repeat(29))).is_err());
    }

    #[test]
    fn explorer_url() {
        assert_eq!(
            STELLAR_TESTNET.explorer_tx_url("abc"),
            "https://stellar.expert/explorer/testnet/tx/abc"
        );
    }
}
