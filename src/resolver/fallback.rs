// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Legacy credential resolution service, consulted last.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use super::tiers::TierError;
use crate::error::{WalletError, WalletResult};

#[async_trait]
pub trait FallbackResolver: Send + Sync {
    async fn lookup(&self, credential_id: &str) -> Result<Option<String>, TierError>;
}

/// `GET {base}/{credential_id}` answering with the contract address as
/// plain text, or 404.
pub struct FallbackResolverClient {
    base_url: url::Url,
    http: Client,
}

impl FallbackResolverClient {
    pub fn new(base_url: &str, timeout: Duration) -> WalletResult<Self> {
        let base_url = url::Url::parse(base_url)
            .map_err(|e| WalletError::Config(format!("invalid fallback resolver URL: {e}")))?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WalletError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { base_url, http })
    }
}

#[async_trait]
impl FallbackResolver for FallbackResolverClient {
    async fn lookup(&self, credential_id: &str) -> Result<Option<String>, TierError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| TierError::InvalidResponse("fallback URL cannot be a base".into()))?
            .pop_if_empty()
            .push(credential_id);

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| TierError::Unavailable(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body = response
                    .text()
                    .await
                    .map_err(|e| TierError::InvalidResponse(e.to_string()))?;
                let address = body.trim();
                Ok((!address.is_empty()).then(|| address.to_string()))
            }
            status => Err(TierError::Unavailable(format!(
                "fallback resolver returned HTTP {status}"
            ))),
        }
    }
}
