// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Stellar Wallet - dual-modality wallet core
//!
//! Lets a user sign and submit Stellar transactions either through an
//! external keypair signer or through a smart-contract wallet authorized by a
//! platform passkey, and routes the signed envelope to Horizon or to a
//! fee-sponsoring relay.
//!
//! ## Modules
//!
//! - `ledger` - Stellar addresses, amounts, envelopes and the Horizon client
//! - `relay` - Fee sponsorship relay client and credit tracking
//! - `resolver` - Tiered credential id → contract address resolution
//! - `session` - Wallet connection lifecycle for both modalities
//! - `signer` - Signing normalized into one envelope type
//! - `submission` - Direct vs. relayed submission routing
//! - `payments` - Payment building and end-to-end orchestration
//! - `storage` - Embedded redb store and in-process cache

pub mod config;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod models;
pub mod payments;
pub mod relay;
pub mod resolver;
pub mod session;
pub mod signer;
pub mod storage;
pub mod submission;

pub use error::{ErrorKind, WalletError, WalletResult};
pub use models::{
    ActiveWallet, ConnectionState, SignedEnvelope, SubmissionMethod, SubmissionOutcome,
    WalletModality,
};
