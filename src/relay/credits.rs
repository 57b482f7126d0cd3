// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Last-observed sponsorship credit balance.
//!
//! The relay is authoritative. This snapshot is for display only and must
//! not gate submissions.

use std::sync::Mutex;

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreditSnapshot {
    pub credits: u64,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct CreditTracker {
    last: Mutex<Option<CreditSnapshot>>,
}

impl CreditTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, credits: u64) {
        if let Ok(mut last) = self.last.lock() {
            *last = Some(CreditSnapshot {
                credits,
                observed_at: Utc::now(),
            });
        }
    }

    pub fn last(&self) -> Option<CreditSnapshot> {
        self.last.lock().ok().and_then(|last| *last)
    }
}

/// Parse a credit count from a header value or body, tolerating whitespace
/// and fractional values (floored).
pub fn parse_credits(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<u64>() {
        return Some(value);
    }
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v.floor() as u64)
}
