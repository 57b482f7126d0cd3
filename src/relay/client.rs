// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP client for the fee sponsorship relay.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::{header::HeaderMap, Client};
use serde_json::Value;
use uuid::Uuid;

use super::credits::{parse_credits, CreditSnapshot, CreditTracker};
use super::{RelayResponse, SponsorshipRelay};
use crate::config::RelayConfig;
use crate::error::{WalletError, WalletResult};

/// Response header carrying the remaining credit count.
pub const CREDITS_HEADER: &str = "x-credits-remaining";

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Fee sponsorship relay client.
#[derive(Debug)]
pub struct FeeSponsorshipClient {
    submit_url: String,
    info_url: String,
    api_key: String,
    /// Optional max fee (stroops) passed to the relay.
    max_fee: Option<u32>,
    credits: CreditTracker,
    http: Client,
}

impl FeeSponsorshipClient {
    /// Create a client for `submit_url`; credits are read from
    /// `{submit_url}/info`.
    pub fn new(submit_url: impl Into<String>, api_key: impl Into<String>) -> WalletResult<Self> {
        Self::with_timeout(submit_url, api_key, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        submit_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> WalletResult<Self> {
        let submit_url = submit_url.into().trim_end_matches('/').to_string();
        url::Url::parse(&submit_url)
            .map_err(|e| WalletError::Config(format!("invalid relay URL: {e}")))?;

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WalletError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            info_url: format!("{submit_url}/info"),
            submit_url,
            api_key: api_key.into(),
            max_fee: None,
            credits: CreditTracker::new(),
            http,
        })
    }

    pub fn from_config(config: &RelayConfig, timeout: Duration) -> WalletResult<Self> {
        let mut client =
            Self::with_timeout(config.submit_url.clone(), config.api_key.clone(), timeout)?;
        if let Some(info_url) = &config.info_url {
            client = client.with_info_url(info_url.clone());
        }
        if let Some(max_fee) = config.max_fee {
            client = client.with_max_fee(max_fee);
        }
        Ok(client)
    }

    /// Override the credit info endpoint.
    pub fn with_info_url(mut self, info_url: impl Into<String>) -> Self {
        self.info_url = info_url.into();
        self
    }

    pub fn with_max_fee(mut self, max_fee: u32) -> Self {
        self.max_fee = Some(max_fee);
        self
    }

    /// Last credit count seen from the relay, if any.
    pub fn last_credits(&self) -> Option<CreditSnapshot> {
        self.credits.last()
    }

    /// Query the relay and return the fresh snapshot.
    pub async fn refresh_credits(&self) -> Option<CreditSnapshot> {
        self.get_credits().await;
        self.credits.last()
    }

    async fn post_envelope(&self, envelope: &[u8]) -> RelayResponse {
        let mut form = vec![("xdr".to_string(), STANDARD.encode(envelope))];
        if let Some(fee) = self.max_fee {
            form.push(("fee".to_string(), fee.to_string()));
        }
        let request_id = Uuid::new_v4().to_string();

        let response = match self
            .http
            .post(&self.submit_url)
            .bearer_auth(&self.api_key)
            .header(REQUEST_ID_HEADER, &request_id)
            .form(&form)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(request_id = %request_id, error = %e, "Relay request failed");
                return RelayResponse::rejected(format!("relay unreachable: {e}"), None);
            }
        };

        let status = response.status();
        let credits = credits_from_headers(response.headers());
        if let Some(credits) = credits {
            self.credits.record(credits);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return RelayResponse::rejected(format!("relay response unreadable: {e}"), credits)
            }
        };
        let json: Option<Value> = serde_json::from_str(&body).ok();

        // `message` only counts as an error on non-2xx responses.
        let error_text = json.as_ref().and_then(|v| {
            v.get("error").and_then(error_field).or_else(|| {
                if status.is_success() {
                    None
                } else {
                    v.get("message").and_then(error_field)
                }
            })
        });

        if status.is_success() && error_text.is_none() {
            let hash = json
                .as_ref()
                .and_then(|v| v.get("hash"))
                .and_then(Value::as_str)
                .map(str::to_string);
            tracing::info!(
                request_id = %request_id,
                hash = ?hash,
                credits_remaining = ?credits,
                "Relay accepted transaction"
            );
            return RelayResponse::accepted(hash, credits);
        }

        let message = error_text.unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("relay returned HTTP {status}")
            } else {
                body.trim().to_string()
            }
        });
        tracing::warn!(
            request_id = %request_id,
            status = %status,
            error = %message,
            "Relay rejected transaction"
        );
        RelayResponse::rejected(message, credits)
    }

    async fn fetch_credits(&self) -> Result<u64, String> {
        let response = self
            .http
            .get(&self.info_url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("HTTP {} from relay info endpoint", response.status()));
        }
        if let Some(credits) = credits_from_headers(response.headers()) {
            return Ok(credits);
        }

        let body = response.text().await.map_err(|e| e.to_string())?;
        credits_from_body(&body).ok_or_else(|| format!("no credit count in `{body}`"))
    }
}

#[async_trait]
impl SponsorshipRelay for FeeSponsorshipClient {
    async fn submit(&self, envelope: &[u8]) -> RelayResponse {
        self.post_envelope(envelope).await
    }

    async fn get_credits(&self) -> u64 {
        match self.fetch_credits().await {
            Ok(credits) => {
                self.credits.record(credits);
                credits
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch relay credits");
                0
            }
        }
    }
}

fn credits_from_headers(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CREDITS_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_credits)
}

/// Accepts `{"credits": n}`, a bare number, or a numeric string.
fn credits_from_body(body: &str) -> Option<u64> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => map.get("credits").and_then(json_credits),
        Ok(value) => json_credits(&value),
        Err(_) => parse_credits(body),
    }
}

fn json_credits(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(|f| parse_credits(&f.to_string()))),
        Value::String(s) => parse_credits(s),
        _ => None,
    }
}

/// Error fields may be a string or a structured object.
fn error_field(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
