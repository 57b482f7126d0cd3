// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Submission Routing
//!
//! Sends a signed envelope to the ledger directly or through the fee
//! sponsorship relay.
//!
//! | Modality | Path |
//! |----------|------|
//! | `EmbeddedContract` | Relay only. A relay failure is final. |
//! | `Keypair` | Direct first. A fee-related failure gets exactly one relay retry. |

pub mod classify;

pub use classify::{classify_failure, FailureClass, FEE_FAILURE_KEYWORDS};

use std::sync::Arc;

use crate::ledger::LedgerClient;
use crate::models::{SignedEnvelope, SubmissionMethod, SubmissionOutcome, WalletModality};
use crate::relay::SponsorshipRelay;

pub struct SubmissionRouter {
    ledger: Arc<dyn LedgerClient>,
    relay: Arc<dyn SponsorshipRelay>,
}

impl SubmissionRouter {
    pub fn new(ledger: Arc<dyn LedgerClient>, relay: Arc<dyn SponsorshipRelay>) -> Self {
        Self { ledger, relay }
    }

    /// Route a signed envelope. Never errors; failures are in the outcome.
    pub async fn submit(
        &self,
        envelope: &SignedEnvelope,
        modality: WalletModality,
    ) -> SubmissionOutcome {
        match modality {
            WalletModality::EmbeddedContract => self.submit_relayed(envelope).await,
            WalletModality::Keypair => self.submit_direct_with_fallback(envelope).await,
        }
    }

    async fn submit_direct_with_fallback(&self, envelope: &SignedEnvelope) -> SubmissionOutcome {
        let error = match self
            .ledger
            .submit_transaction(&envelope.signed_transaction)
            .await
        {
            Ok(hash) => {
                tracing::info!(hash = %hash, method = "direct", "Transaction submitted");
                return SubmissionOutcome::succeeded(SubmissionMethod::Direct, Some(hash));
            }
            Err(e) => e.to_string(),
        };

        let class = classify_failure(&error);
        if !class.is_fee_related() {
            tracing::warn!(error = %error, "Direct submission failed");
            return SubmissionOutcome::failed(SubmissionMethod::Direct, error, class);
        }

        tracing::info!(
            error = %error,
            "Direct submission failed on fees, retrying through the sponsorship relay"
        );
        self.submit_relayed(envelope).await
    }

    async fn submit_relayed(&self, envelope: &SignedEnvelope) -> SubmissionOutcome {
        let response = self.relay.submit(&envelope.signed_transaction).await;
        if response.success {
            tracing::info!(
                hash = ?response.transaction_hash,
                credits_remaining = ?response.credits_remaining,
                method = "relayed",
                "Transaction submitted"
            );
            return SubmissionOutcome::succeeded(
                SubmissionMethod::Relayed,
                response.transaction_hash,
            )
            .with_credits(response.credits_remaining);
        }

        let error = response
            .error
            .unwrap_or_else(|| "relay rejected the transaction".to_string());
        tracing::warn!(error = %error, "Relayed submission failed");
        let class = classify_failure(&error);
        SubmissionOutcome::failed(SubmissionMethod::Relayed, error, class)
            .with_credits(response.credits_remaining)
    }
}
