// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Horizon client for sequence lookups and direct submission.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LedgerError {
    #[error("Invalid Horizon URL: {0}")]
    InvalidUrl(String),

    #[error("Horizon unreachable: {0}")]
    Http(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Horizon rejected the transaction. The message keeps the result codes.
    #[error("{0}")]
    Rejected(String),

    #[error("Invalid Horizon response: {0}")]
    InvalidResponse(String),
}

impl LedgerError {
    /// Whether the failure is a connectivity problem rather than an answer.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, LedgerError::Http(_))
    }
}

/// Ledger operations the wallet core needs.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Current sequence number of a classic account.
    async fn account_sequence(&self, account: &str) -> Result<i64, LedgerError>;

    /// Submit a signed envelope, returning the transaction hash.
    async fn submit_transaction(&self, envelope: &[u8]) -> Result<String, LedgerError>;
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    sequence: String,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    hash: String,
}

/// Horizon REST client.
#[derive(Debug, Clone)]
pub struct HorizonClient {
    base_url: String,
    http: Client,
}

impl HorizonClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, LedgerError> {
        let parsed: url::Url = base_url
            .parse()
            .map_err(|e: url::ParseError| LedgerError::InvalidUrl(e.to_string()))?;

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LedgerError::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl LedgerClient for HorizonClient {
    async fn account_sequence(&self, account: &str) -> Result<i64, LedgerError> {
        let response = self
            .http
            .get(format!("{}/accounts/{account}", self.base_url))
            .send()
            .await
            .map_err(|e| LedgerError::Http(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(LedgerError::AccountNotFound(account.to_string()));
        }
        if !response.status().is_success() {
            return Err(LedgerError::Http(format!(
                "HTTP {} from Horizon accounts endpoint",
                response.status()
            )));
        }

        let body: AccountResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(e.to_string()))?;

        body.sequence
            .parse()
            .map_err(|_| LedgerError::InvalidResponse(format!("bad sequence `{}`", body.sequence)))
    }

    async fn submit_transaction(&self, envelope: &[u8]) -> Result<String, LedgerError> {
        let form = [("tx", STANDARD.encode(envelope))];
        let response = self
            .http
            .post(format!("{}/transactions", self.base_url))
            .form(&form)
            .send()
            .await
            .map_err(|e| LedgerError::Http(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let body: SubmitResponse = response
                .json()
                .await
                .map_err(|e| LedgerError::InvalidResponse(e.to_string()))?;
            return Ok(body.hash);
        }

        if status.is_server_error() {
            return Err(LedgerError::Http(format!("HTTP {status} from Horizon")));
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(status = %status, error = %e, "Horizon error body unreadable");
                String::new()
            }
        };
        let message = match serde_json::from_str::<Value>(&body) {
            Ok(problem) => describe_problem(&problem),
            Err(_) if body.trim().is_empty() => format!("HTTP {status}"),
            Err(_) => body,
        };
        tracing::debug!(status = %status, message = %message, "Horizon rejected transaction");
        Err(LedgerError::Rejected(message))
    }
}

/// Render a Horizon problem document as `title: codes (explanation)`.
pub fn describe_problem(problem: &Value) -> String {
    let title = problem
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or("Transaction Failed");

    let mut codes: Vec<String> = Vec::new();
    if let Some(tx_code) = problem
        .pointer("/extras/result_codes/transaction")
        .and_then(Value::as_str)
    {
        codes.push(tx_code.to_string());
    }
    if let Some(ops) = problem
        .pointer("/extras/result_codes/operations")
        .and_then(Value::as_array)
    {
        codes.extend(
            ops.iter()
                .filter_map(Value::as_str)
                .filter(|c| *c != "op_success")
                .map(str::to_string),
        );
    }

    if codes.is_empty() {
        return match problem.get("detail").and_then(Value::as_str) {
            Some(detail) => format!("{title}: {detail}"),
            None => title.to_string(),
        };
    }

    let explained: Vec<String> = codes
        .iter()
        .map(|code| match explain_result_code(code) {
            Some(text) => format!("{code} ({text})"),
            None => code.clone(),
        })
        .collect();
    format!("{title}: {}", explained.join(", "))
}

fn explain_result_code(code: &str) -> Option<&'static str> {
    match code {
        "tx_bad_seq" => Some("bad sequence number"),
        "tx_insufficient_fee" => Some("insufficient fee"),
        "tx_insufficient_balance" => Some("insufficient balance"),
        "tx_fee_bump_inner_failed" => Some("fee bump inner transaction failed"),
        "tx_bad_auth" => Some("bad authorization"),
        "tx_too_late" => Some("transaction expired"),
        "tx_no_source_account" => Some("source account does not exist"),
        "op_underfunded" => Some("insufficient balance to cover payment"),
        "op_no_destination" => Some("destination account does not exist"),
        "op_no_trust" => Some("destination has no trustline for asset"),
        "op_malformed" => Some("malformed operation"),
        _ => None,
    }
}
