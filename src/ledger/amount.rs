// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Decimal amounts at the ledger's native precision (7 fractional digits).
//!
//! Amounts are never rounded. Extra fractional digits are accepted only when
//! they are zeros; any significant digit past the seventh is rejected.

use super::types::{AMOUNT_DECIMALS, STROOPS_PER_UNIT};
use crate::error::{WalletError, WalletResult};

/// Parse a human-readable amount (e.g. `"10"`, `"1.5"`) into stroops.
pub fn parse_amount(amount: &str) -> WalletResult<i64> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(WalletError::InvalidAmount("amount is empty".to_string()));
    }

    let (whole_str, frac_str) = match amount.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (amount, ""),
    };

    if whole_str.is_empty() && frac_str.is_empty() {
        return Err(WalletError::InvalidAmount(format!("`{amount}` has no digits")));
    }
    if !whole_str.chars().all(|c| c.is_ascii_digit())
        || !frac_str.chars().all(|c| c.is_ascii_digit())
    {
        return Err(WalletError::InvalidAmount(format!(
            "`{amount}` must be a non-negative decimal number"
        )));
    }

    let precision = AMOUNT_DECIMALS as usize;
    let significant_frac = frac_str.trim_end_matches('0');
    if significant_frac.len() > precision {
        return Err(WalletError::InvalidAmount(format!(
            "`{amount}` has more than {precision} decimal places"
        )));
    }

    let whole: i64 = if whole_str.is_empty() {
        0
    } else {
        whole_str
            .parse()
            .map_err(|_| WalletError::InvalidAmount(format!("`{amount}` is too large")))?
    };

    let frac: i64 = if significant_frac.is_empty() {
        0
    } else {
        format!("{significant_frac:0<precision$}")
            .parse()
            .map_err(|_| WalletError::InvalidAmount(format!("`{amount}` has an invalid fraction")))?
    };

    whole
        .checked_mul(STROOPS_PER_UNIT)
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(|| WalletError::InvalidAmount(format!("`{amount}` is too large")))
}

/// Format stroops as a decimal string with trailing zeros trimmed.
pub fn format_amount(stroops: i64) -> String {
    let sign = if stroops < 0 { "-" } else { "" };
    let abs = stroops.unsigned_abs();
    let unit = STROOPS_PER_UNIT as u64;
    let whole = abs / unit;
    let remainder = abs % unit;

    if remainder == 0 {
        return format!("{sign}{whole}");
    }

    let frac = format!("{remainder:0>width$}", width = AMOUNT_DECIMALS as usize);
    format!("{sign}{whole}.{}", frac.trim_end_matches('0'))
}

/// Parse then re-format, yielding the canonical representation.
pub fn normalize_amount(amount: &str) -> WalletResult<String> {
    parse_amount(amount).map(format_amount)
}
