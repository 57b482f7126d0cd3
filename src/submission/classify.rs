// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Failure classification for direct submissions.

use serde::{Deserialize, Serialize};

/// Substrings (lowercase) marking a failure the relay can fix by paying.
pub const FEE_FAILURE_KEYWORDS: &[&str] = &["fee", "insufficient", "sponsor"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Recoverable by resubmitting through the sponsorship relay.
    FeeRelated,
    /// Anything else. Retrying on another path will not help.
    Structural,
}

impl FailureClass {
    pub fn is_fee_related(self) -> bool {
        self == FailureClass::FeeRelated
    }
}

/// Classify a free-text ledger error.
pub fn classify_failure(message: &str) -> FailureClass {
    let message = message.to_lowercase();
    if FEE_FAILURE_KEYWORDS.iter().any(|kw| message.contains(kw)) {
        FailureClass::FeeRelated
    } else {
        FailureClass::Structural
    }
}
