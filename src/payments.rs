// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Payments
//!
//! Builds a single-operation payment for the connected wallet, signs it and
//! routes it.
//!
//! Validation order is fixed and every check runs before any network call
//! except the sequence lookup:
//!
//! 1. Sender and recipient addresses (`InvalidAddress`)
//! 2. Amount, at most 7 decimal places and positive (`InvalidAmount`)
//! 3. Currency and memo (`InvalidPayment`)
//! 4. Account sequence (keypair wallets only)

use std::sync::Arc;

use chrono::Utc;

use crate::error::{WalletError, WalletResult};
use crate::ledger::{
    format_amount, parse_address, parse_amount, validate_account, validate_contract,
    Asset, LedgerClient, Memo, NetworkConfig, Operation, Transaction, TransactionEnvelope,
};
use crate::models::{ActiveWallet, SubmissionOutcome, WalletModality};
use crate::session::WalletSession;
use crate::signer::TransactionSigner;
use crate::submission::SubmissionRouter;

/// A validated, unsigned payment.
#[derive(Debug, Clone)]
pub struct PreparedPayment {
    pub wallet: ActiveWallet,
    pub envelope: TransactionEnvelope,
    pub stroops: i64,
}

impl PreparedPayment {
    /// Canonical amount string, trailing zeros trimmed.
    pub fn amount(&self) -> String {
        format_amount(self.stroops)
    }
}

pub struct PaymentOrchestrator {
    network: NetworkConfig,
    session: Arc<WalletSession>,
    signer: Arc<TransactionSigner>,
    router: Arc<SubmissionRouter>,
    ledger: Arc<dyn LedgerClient>,
}

impl PaymentOrchestrator {
    pub fn new(
        network: NetworkConfig,
        session: Arc<WalletSession>,
        signer: Arc<TransactionSigner>,
        router: Arc<SubmissionRouter>,
        ledger: Arc<dyn LedgerClient>,
    ) -> Self {
        Self {
            network,
            session,
            signer,
            router,
            ledger,
        }
    }

    /// Pay `amount` of `currency` to `recipient` from the connected wallet.
    ///
    /// Validation and signing failures are errors. Once signed, the result
    /// of submission is always an `Ok` outcome, successful or not.
    pub async fn pay(
        &self,
        amount: &str,
        currency: &str,
        recipient: &str,
        memo: Option<&str>,
    ) -> WalletResult<SubmissionOutcome> {
        let prepared = self.prepare(amount, currency, recipient, memo).await?;
        let unsigned = prepared.envelope.encode()?;
        let signed = self.signer.sign(&prepared.wallet, &unsigned).await?;
        let outcome = self.router.submit(&signed, prepared.wallet.modality).await;

        if outcome.success {
            tracing::info!(
                from = %prepared.wallet.address,
                to = %recipient,
                amount = %prepared.amount(),
                method = ?outcome.method,
                explorer = ?outcome
                    .transaction_hash
                    .as_deref()
                    .map(|hash| self.network.explorer_tx_url(hash)),
                "Payment submitted"
            );
        } else {
            tracing::warn!(
                from = %prepared.wallet.address,
                to = %recipient,
                method = ?outcome.method,
                error = ?outcome.message,
                "Payment failed"
            );
        }
        Ok(outcome)
    }

    /// Validate and build the unsigned payment.
    pub async fn prepare(
        &self,
        amount: &str,
        currency: &str,
        recipient: &str,
        memo: Option<&str>,
    ) -> WalletResult<PreparedPayment> {
        let wallet = self
            .session
            .active_wallet()
            .await
            .ok_or(WalletError::NotConnected)?;

        let recipient = recipient.trim();
        validate_parties(&wallet, recipient)?;

        let stroops = parse_amount(amount)?;
        if stroops == 0 {
            return Err(WalletError::InvalidAmount(
                "amount must be greater than zero".to_string(),
            ));
        }
        let asset = Asset::parse(currency)?;
        let memo = Memo::text(memo)?;

        let (sequence, operation) = match wallet.modality {
            WalletModality::Keypair => {
                let sequence = self.ledger.account_sequence(&wallet.address).await?;
                (
                    Some(sequence),
                    Operation::Payment {
                        destination: recipient.to_string(),
                        asset,
                        amount: stroops,
                    },
                )
            }
            // The relay supplies the fee-paying source account and sequence.
            WalletModality::EmbeddedContract => (
                None,
                Operation::ContractTransfer {
                    asset,
                    from: wallet.address.clone(),
                    to: recipient.to_string(),
                    amount: stroops,
                },
            ),
        };

        let tx = Transaction::single_operation(
            wallet.address.clone(),
            sequence,
            operation,
            memo,
            Utc::now(),
        )?;

        Ok(PreparedPayment {
            wallet,
            envelope: TransactionEnvelope::new(tx),
            stroops,
        })
    }
}

fn validate_parties(wallet: &ActiveWallet, recipient: &str) -> WalletResult<()> {
    match wallet.modality {
        WalletModality::Keypair => {
            validate_account(&wallet.address)?;
            // Classic payments can only credit accounts.
            validate_account(recipient)?;
        }
        WalletModality::EmbeddedContract => {
            validate_contract(&wallet.address)?;
            parse_address(recipient)?;
        }
    }

    if recipient == wallet.address {
        return Err(WalletError::InvalidAddress(
            "sender and recipient are the same".to_string(),
        ));
    }
    Ok(())
}
