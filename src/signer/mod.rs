// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Transaction Signing
//!
//! Both modalities produce the same [`SignedEnvelope`].
//!
//! - **Keypair**: the envelope goes to the external signer connector and the
//!   response is normalized by [`decode_signer_response`].
//! - **EmbeddedContract**: the user asserts with their passkey over the
//!   network-bound transaction hash, and the assertion is attached to the
//!   envelope as the contract wallet's authorization.
//!
//! Signing never submits.

pub mod connector;
pub mod response;

pub use connector::{ConnectorError, SignerConnector};
pub use response::{decode_signer_response, DecodedSignature, SignerResponse, MIN_SIGNED_PAYLOAD_LEN};

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::error::{WalletError, WalletResult};
use crate::ledger::{NetworkConfig, PasskeyAuthorization, TransactionEnvelope};
use crate::models::{ActiveWallet, SignedEnvelope, WalletModality};
use crate::session::PlatformCredentials;

pub struct TransactionSigner {
    network: NetworkConfig,
    connector: Arc<dyn SignerConnector>,
    platform: Arc<dyn PlatformCredentials>,
}

impl TransactionSigner {
    pub fn new(
        network: NetworkConfig,
        connector: Arc<dyn SignerConnector>,
        platform: Arc<dyn PlatformCredentials>,
    ) -> Self {
        Self {
            network,
            connector,
            platform,
        }
    }

    /// Sign `unsigned_envelope` with the connected wallet.
    pub async fn sign(
        &self,
        wallet: &ActiveWallet,
        unsigned_envelope: &[u8],
    ) -> WalletResult<SignedEnvelope> {
        match wallet.modality {
            WalletModality::Keypair => self.sign_with_keypair(wallet, unsigned_envelope).await,
            WalletModality::EmbeddedContract => {
                self.sign_with_passkey(wallet, unsigned_envelope).await
            }
        }
    }

    async fn sign_with_keypair(
        &self,
        wallet: &ActiveWallet,
        unsigned_envelope: &[u8],
    ) -> WalletResult<SignedEnvelope> {
        let response = self
            .connector
            .sign_transaction(
                &STANDARD.encode(unsigned_envelope),
                self.network.passphrase,
                &wallet.address,
            )
            .await?;

        let decoded = decode_signer_response(&response)?;
        if let Some(signer) = decoded.signer_address.as_deref() {
            if signer != wallet.address {
                return Err(WalletError::MalformedSignerResponse(format!(
                    "signed by {signer}, expected {}",
                    wallet.address
                )));
            }
        }

        Ok(SignedEnvelope {
            raw_transaction: unsigned_envelope.to_vec(),
            signed_transaction: decoded.signed_transaction,
            signer_address: Some(wallet.address.clone()),
        })
    }

    async fn sign_with_passkey(
        &self,
        wallet: &ActiveWallet,
        unsigned_envelope: &[u8],
    ) -> WalletResult<SignedEnvelope> {
        let credential_id = wallet.credential_id.as_deref().ok_or_else(|| {
            WalletError::SessionFailed("embedded wallet has no credential id".to_string())
        })?;

        let mut envelope = TransactionEnvelope::decode(unsigned_envelope)?;
        let hash = envelope.hash(self.network.passphrase)?;

        let assertion = self
            .platform
            .get_assertion(&hash, Some(credential_id))
            .await?;
        if assertion.credential_id != credential_id {
            return Err(WalletError::MalformedSignerResponse(format!(
                "assertion from credential {}, expected {credential_id}",
                assertion.credential_id
            )));
        }
        if assertion.signature.is_empty() {
            return Err(WalletError::MalformedSignerResponse(
                "assertion carries no signature".to_string(),
            ));
        }

        envelope.authorize_with_passkey(PasskeyAuthorization::new(
            wallet.address.clone(),
            credential_id,
            &assertion.authenticator_data,
            &assertion.client_data_json,
            &assertion.signature,
        ));
        let signed_transaction = envelope.encode()?;
        if signed_transaction.len() < MIN_SIGNED_PAYLOAD_LEN {
            return Err(WalletError::MalformedSignerResponse(format!(
                "signed envelope is only {} bytes",
                signed_transaction.len()
            )));
        }

        tracing::debug!(
            address = %wallet.address,
            tx_hash = %hex::encode(hash),
            "Envelope authorized with passkey"
        );
        Ok(SignedEnvelope {
            raw_transaction: unsigned_envelope.to_vec(),
            signed_transaction,
            signer_address: Some(wallet.address.clone()),
        })
    }
}
