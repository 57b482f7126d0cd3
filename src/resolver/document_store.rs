// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Remote document store holding the authoritative credential mappings.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use super::tiers::TierError;
use crate::error::{WalletError, WalletResult};

/// Keyed upsert/read of credential id → contract address.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, credential_id: &str) -> Result<Option<String>, TierError>;

    /// Idempotent: writing the same mapping twice is not an error.
    async fn upsert(&self, credential_id: &str, contract_address: &str) -> Result<(), TierError>;
}

/// Wire shape of a stored mapping document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingDocument {
    pub credential_id: String,
    pub contract_address: String,
}

/// Document store over `GET/PUT {base}/credentials/{credential_id}`.
pub struct RestDocumentStore {
    base_url: Url,
    http: Client,
}

impl RestDocumentStore {
    pub fn new(base_url: &str, timeout: Duration) -> WalletResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| WalletError::Config(format!("invalid document store URL: {e}")))?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WalletError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { base_url, http })
    }

    fn document_url(&self, credential_id: &str) -> Result<Url, TierError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| TierError::InvalidResponse("document store URL cannot be a base".into()))?
            .pop_if_empty()
            .push("credentials")
            .push(credential_id);
        Ok(url)
    }
}

#[async_trait]
impl DocumentStore for RestDocumentStore {
    async fn get(&self, credential_id: &str) -> Result<Option<String>, TierError> {
        let response = self
            .http
            .get(self.document_url(credential_id)?)
            .send()
            .await
            .map_err(|e| TierError::Unavailable(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let doc: MappingDocument = response
                    .json()
                    .await
                    .map_err(|e| TierError::InvalidResponse(e.to_string()))?;
                if doc.credential_id != credential_id {
                    return Err(TierError::InvalidResponse(format!(
                        "document for {} returned for {credential_id}",
                        doc.credential_id
                    )));
                }
                Ok(Some(doc.contract_address))
            }
            status => Err(TierError::Unavailable(format!(
                "document store returned HTTP {status}"
            ))),
        }
    }

    async fn upsert(&self, credential_id: &str, contract_address: &str) -> Result<(), TierError> {
        let doc = MappingDocument {
            credential_id: credential_id.to_string(),
            contract_address: contract_address.to_string(),
        };
        let response = self
            .http
            .put(self.document_url(credential_id)?)
            .json(&doc)
            .send()
            .await
            .map_err(|e| TierError::Unavailable(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(TierError::Unavailable(format!(
                "document store returned HTTP {}",
                response.status()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Path, State},
        http::StatusCode as AxumStatus,
        response::IntoResponse,
        routing::get,
        Json, Router,
    };
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    type Docs = Arc<Mutex<HashMap<String, String>>>;

    async fn spawn(docs: Docs) -> String {
        async fn read(State(docs): State<Docs>, Path(id): Path<String>) -> axum::response::Response {
            match docs.lock().unwrap().get(&id) {
                Some(addr) => Json(MappingDocument {
                    credential_id: id,
                    contract_address: addr.clone(),
                })
                .into_response(),
                None => AxumStatus::NOT_FOUND.into_response(),
            }
        }
        async fn write(
            State(docs): State<Docs>,
            Path(id): Path<String>,
            Json(doc): Json<MappingDocument>,
        ) -> AxumStatus {
            docs.lock().unwrap().insert(id, doc.contract_address);
            AxumStatus::NO_CONTENT
        }

        let router = Router::new()
            .route("/v1/credentials/{id}", get(read).put(write))
            .with_state(docs);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/v1")
    }

    #[tokio::test]
    async fn upsert_then_get() {
        let docs = Docs::default();
        let base = spawn(docs.clone()).await;
        let store = RestDocumentStore::new(&base, Duration::from_secs(5)).unwrap();

        assert_eq!(store.get("cred-1").await.unwrap(), None);
        store.upsert("cred-1", "CADDR").await.unwrap();
        store.upsert("cred-1", "CADDR").await.unwrap();
        assert_eq!(store.get("cred-1").await.unwrap().as_deref(), Some("CADDR"));
        assert_eq!(docs.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn credential_ids_are_path_encoded() {
        let docs = Docs::default();
        let base = spawn(docs.clone()).await;
        let store = RestDocumentStore::new(&base, Duration::from_secs(5)).unwrap();

        store.upsert("a/b+c", "CADDR").await.unwrap();
        assert!(docs.lock().unwrap().contains_key("a/b+c"));
        assert_eq!(store.get("a/b+c").await.unwrap().as_deref(), Some("CADDR"));
    }

    #[tokio::test]
    async fn unreachable_store_is_unavailable() {
        let store = RestDocumentStore::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        assert!(matches!(
            store.get("cred-1").await,
            Err(TierError::Unavailable(_))
        ));
        assert!(matches!(
            store.upsert("cred-1", "CADDR").await,
            Err(TierError::Unavailable(_))
        ));
    }
}
