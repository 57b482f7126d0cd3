// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction building and the envelope handed to signers.
//!
//! ## Envelope formats
//!
//! | Operation | Bytes | Hash |
//! |-----------|-------|------|
//! | `Payment` | Stellar XDR `TransactionEnvelope` (v1, unsigned) | Stellar transaction hash |
//! | `ContractTransfer` | JSON contract call consumed by the relay | `sha256(network_id \|\| CONTRACT_CALL \|\| tx)` |
//!
//! Classic payments go to Horizon and external signers, so they are real XDR.
//! Contract wallet transfers are only ever submitted through the sponsorship
//! relay, which owns the Soroban invocation (footprint, fees, sequence) and
//! accepts the call description plus the passkey authorization.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use stellar_xdr::curr as xdr;
use stellar_xdr::curr::{Limits, WriteXdr};

use super::address::account_public_key;
use super::types::{Asset, Memo, BASE_FEE_STROOPS, TX_VALIDITY_SECS};
use crate::error::{WalletError, WalletResult};

/// Domain separator for contract call hashes.
const CONTRACT_CALL: &[u8] = b"CONTRACT_CALL";

/// Single operation carried by a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    /// Classic payment from the source account.
    Payment {
        destination: String,
        asset: Asset,
        amount: i64,
    },
    /// Token transfer invoked on behalf of a contract wallet.
    ContractTransfer {
        asset: Asset,
        from: String,
        to: String,
        amount: i64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBounds {
    pub min_time: i64,
    pub max_time: i64,
}

/// Unsigned transaction body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub source_account: String,
    pub fee: u32,
    /// `None` when the relay supplies the source account and sequence.
    pub sequence: Option<i64>,
    pub time_bounds: TimeBounds,
    pub memo: Memo,
    pub operation: Operation,
}

impl Transaction {
    /// Build a single-operation transaction valid for `TX_VALIDITY_SECS`.
    ///
    /// `current_sequence` is the account's sequence as reported by the
    /// ledger; the transaction consumes the next one.
    pub fn single_operation(
        source_account: impl Into<String>,
        current_sequence: Option<i64>,
        operation: Operation,
        memo: Memo,
        now: DateTime<Utc>,
    ) -> WalletResult<Self> {
        let sequence = current_sequence
            .map(|seq| {
                seq.checked_add(1).ok_or_else(|| {
                    WalletError::InvalidEnvelope("account sequence overflow".to_string())
                })
            })
            .transpose()?;

        Ok(Self {
            source_account: source_account.into(),
            fee: BASE_FEE_STROOPS,
            sequence,
            time_bounds: TimeBounds {
                min_time: 0,
                max_time: now.timestamp() + TX_VALIDITY_SECS,
            },
            memo,
            operation,
        })
    }
}

/// Passkey assertion attached to a contract-wallet envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasskeyAuthorization {
    /// Contract wallet that is authorizing.
    pub address: String,
    pub credential_id: String,
    /// Base64 of the authenticator data.
    pub authenticator_data: String,
    /// Base64 of the client data JSON.
    pub client_data_json: String,
    /// Base64 of the signature.
    pub signature: String,
}

impl PasskeyAuthorization {
    pub fn new(
        address: impl Into<String>,
        credential_id: impl Into<String>,
        authenticator_data: &[u8],
        client_data_json: &[u8],
        signature: &[u8],
    ) -> Self {
        Self {
            address: address.into(),
            credential_id: credential_id.into(),
            authenticator_data: STANDARD.encode(authenticator_data),
            client_data_json: STANDARD.encode(client_data_json),
            signature: STANDARD.encode(signature),
        }
    }
}

/// Wire format of an envelope, decided by its operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeFormat {
    Xdr,
    ContractCall,
}

/// Signable representation of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEnvelope {
    pub tx: Transaction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passkey_auth: Option<PasskeyAuthorization>,
}

impl TransactionEnvelope {
    pub fn new(tx: Transaction) -> Self {
        Self {
            tx,
            passkey_auth: None,
        }
    }

    pub fn format(&self) -> EnvelopeFormat {
        match self.tx.operation {
            Operation::Payment { .. } => EnvelopeFormat::Xdr,
            Operation::ContractTransfer { .. } => EnvelopeFormat::ContractCall,
        }
    }

    pub fn encode(&self) -> WalletResult<Vec<u8>> {
        match self.format() {
            EnvelopeFormat::Xdr => {
                if self.passkey_auth.is_some() {
                    return Err(WalletError::InvalidEnvelope(
                        "classic payments cannot carry a passkey authorization".to_string(),
                    ));
                }
                self.to_xdr_envelope()?
                    .to_xdr(Limits::none())
                    .map_err(xdr_error)
            }
            EnvelopeFormat::ContractCall => serde_json::to_vec(self)
                .map_err(|e| WalletError::InvalidEnvelope(e.to_string())),
        }
    }

    /// Decode a contract call envelope. XDR envelopes are opaque once built
    /// and only travel through the signer and Horizon.
    pub fn decode(bytes: &[u8]) -> WalletResult<Self> {
        let envelope: Self = serde_json::from_slice(bytes)
            .map_err(|e| WalletError::InvalidEnvelope(format!("not a contract call: {e}")))?;
        if envelope.format() != EnvelopeFormat::ContractCall {
            return Err(WalletError::InvalidEnvelope(
                "classic payments are encoded as XDR".to_string(),
            ));
        }
        Ok(envelope)
    }

    /// Hash signed by every authorizer, bound to the network passphrase.
    pub fn hash(&self, network_passphrase: &str) -> WalletResult<[u8; 32]> {
        let network_id: [u8; 32] = Sha256::digest(network_passphrase.as_bytes()).into();

        match self.format() {
            EnvelopeFormat::Xdr => {
                let payload = xdr::TransactionSignaturePayload {
                    network_id: xdr::Hash(network_id),
                    tagged_transaction: xdr::TransactionSignaturePayloadTaggedTransaction::Tx(
                        self.to_xdr_transaction()?,
                    ),
                };
                let bytes = payload.to_xdr(Limits::none()).map_err(xdr_error)?;
                Ok(Sha256::digest(&bytes).into())
            }
            EnvelopeFormat::ContractCall => {
                let tx_bytes = serde_json::to_vec(&self.tx)
                    .map_err(|e| WalletError::InvalidEnvelope(e.to_string()))?;
                let mut hasher = Sha256::new();
                hasher.update(network_id);
                hasher.update(CONTRACT_CALL);
                hasher.update(&tx_bytes);
                Ok(hasher.finalize().into())
            }
        }
    }

    pub fn hash_hex(&self, network_passphrase: &str) -> WalletResult<String> {
        self.hash(network_passphrase).map(hex::encode)
    }

    /// Attach a passkey authorization, replacing any previous one.
    pub fn authorize_with_passkey(&mut self, auth: PasskeyAuthorization) {
        self.passkey_auth = Some(auth);
    }

    pub fn is_authorized(&self) -> bool {
        self.passkey_auth.is_some()
    }

    fn to_xdr_envelope(&self) -> WalletResult<xdr::TransactionEnvelope> {
        Ok(xdr::TransactionEnvelope::Tx(xdr::TransactionV1Envelope {
            tx: self.to_xdr_transaction()?,
            signatures: xdr::VecM::default(),
        }))
    }

    fn to_xdr_transaction(&self) -> WalletResult<xdr::Transaction> {
        let tx = &self.tx;
        let Operation::Payment {
            destination,
            asset,
            amount,
        } = &tx.operation
        else {
            return Err(WalletError::InvalidEnvelope(
                "contract calls have no XDR form".to_string(),
            ));
        };
        let sequence = tx.sequence.ok_or_else(|| {
            WalletError::InvalidEnvelope("classic payments need a sequence number".to_string())
        })?;

        let memo = match &tx.memo {
            Memo::None => xdr::Memo::None,
            Memo::Text(text) => xdr::Memo::Text(
                xdr::StringM::try_from(text.as_bytes().to_vec()).map_err(xdr_error)?,
            ),
        };

        let operation = xdr::Operation {
            source_account: None,
            body: xdr::OperationBody::Payment(xdr::PaymentOp {
                destination: muxed_account(destination)?,
                asset: xdr_asset(asset)?,
                amount: *amount,
            }),
        };

        Ok(xdr::Transaction {
            source_account: muxed_account(&tx.source_account)?,
            fee: tx.fee,
            seq_num: xdr::SequenceNumber(sequence),
            cond: xdr::Preconditions::Time(xdr::TimeBounds {
                min_time: time_point(tx.time_bounds.min_time)?,
                max_time: time_point(tx.time_bounds.max_time)?,
            }),
            memo,
            operations: vec![operation].try_into().map_err(xdr_error)?,
            ext: xdr::TransactionExt::V0,
        })
    }
}

fn muxed_account(address: &str) -> WalletResult<xdr::MuxedAccount> {
    Ok(xdr::MuxedAccount::Ed25519(xdr::Uint256(
        account_public_key(address)?,
    )))
}

fn xdr_asset(asset: &Asset) -> WalletResult<xdr::Asset> {
    let Asset::Credit { code, issuer } = asset else {
        return Ok(xdr::Asset::Native);
    };
    let issuer = xdr::AccountId(xdr::PublicKey::PublicKeyTypeEd25519(xdr::Uint256(
        account_public_key(issuer)?,
    )));

    // Codes are right-padded with zero bytes.
    let bytes = code.as_bytes();
    match bytes.len() {
        1..=4 => {
            let mut asset_code = [0u8; 4];
            asset_code[..bytes.len()].copy_from_slice(bytes);
            Ok(xdr::Asset::CreditAlphanum4(xdr::AlphaNum4 {
                asset_code: xdr::AssetCode4(asset_code),
                issuer,
            }))
        }
        5..=12 => {
            let mut asset_code = [0u8; 12];
            asset_code[..bytes.len()].copy_from_slice(bytes);
            Ok(xdr::Asset::CreditAlphanum12(xdr::AlphaNum12 {
                asset_code: xdr::AssetCode12(asset_code),
                issuer,
            }))
        }
        _ => Err(WalletError::InvalidEnvelope(format!(
            "asset code `{code}` must be 1-12 characters"
        ))),
    }
}

fn time_point(secs: i64) -> WalletResult<xdr::TimePoint> {
    u64::try_from(secs)
        .map(xdr::TimePoint)
        .map_err(|_| WalletError::InvalidEnvelope(format!("negative time bound {secs}")))
}

fn xdr_error(e: xdr::Error) -> WalletError {
    WalletError::InvalidEnvelope(format!("XDR encoding failed: {e}"))
}
