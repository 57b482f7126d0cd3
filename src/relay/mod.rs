// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fee sponsorship relay.
//!
//! The relay submits transactions on the user's behalf and pays the network
//! fee, metering usage with a credit balance it owns. The client never
//! returns an error: every failure is reported inside [`RelayResponse`].

pub mod client;
pub mod credits;

pub use client::FeeSponsorshipClient;
pub use credits::{CreditSnapshot, CreditTracker};

use async_trait::async_trait;

/// Outcome of one relayed submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayResponse {
    pub success: bool,
    pub transaction_hash: Option<String>,
    pub error: Option<String>,
    pub credits_remaining: Option<u64>,
}

impl RelayResponse {
    pub fn accepted(transaction_hash: Option<String>, credits_remaining: Option<u64>) -> Self {
        Self {
            success: true,
            transaction_hash,
            error: None,
            credits_remaining,
        }
    }

    pub fn rejected(error: impl Into<String>, credits_remaining: Option<u64>) -> Self {
        Self {
            success: false,
            transaction_hash: None,
            error: Some(error.into()),
            credits_remaining,
        }
    }
}

/// Submission path through the sponsorship relay.
#[async_trait]
pub trait SponsorshipRelay: Send + Sync {
    async fn submit(&self, envelope: &[u8]) -> RelayResponse;

    /// Current credit balance; `0` when it cannot be determined.
    async fn get_credits(&self) -> u64;
}
