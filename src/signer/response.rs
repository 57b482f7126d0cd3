// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Decoder for the response shapes external signers return.
//!
//! Shapes are tried in a fixed order and the first one yielding a payload
//! of at least [`MIN_SIGNED_PAYLOAD_LEN`] bytes wins:
//!
//! 1. Raw byte array
//! 2. Base64 string
//! 3. `{ "signedTxXdr": "...", "signerAddress": "..." }`
//! 4. `{ "signedTransaction": "..." }`
//! 5. `{ "signed_envelope_xdr": "..." }`
//!
//! Anything else fails closed.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{WalletError, WalletResult};

/// Shortest byte string accepted as a signed envelope.
pub const MIN_SIGNED_PAYLOAD_LEN: usize = 64;

#[derive(Debug, Deserialize)]
struct SignedTxXdr {
    #[serde(rename = "signedTxXdr")]
    signed_tx_xdr: String,
    #[serde(rename = "signerAddress", default)]
    signer_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SignedTransaction {
    #[serde(rename = "signedTransaction")]
    signed_transaction: String,
    #[serde(rename = "signerAddress", default)]
    signer_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SignedEnvelopeXdr {
    signed_envelope_xdr: String,
}

/// One recognized response shape.
#[derive(Debug)]
pub enum SignerResponse {
    Bytes(Vec<u8>),
    Base64(String),
    SignedTxXdr {
        xdr: String,
        signer_address: Option<String>,
    },
    SignedTransaction {
        xdr: String,
        signer_address: Option<String>,
    },
    SignedEnvelopeXdr(String),
}

impl SignerResponse {
    /// Every shape `value` parses as, in priority order.
    fn candidates(value: &Value) -> Vec<SignerResponse> {
        let mut found = Vec::new();
        if let Ok(bytes) = serde_json::from_value::<Vec<u8>>(value.clone()) {
            found.push(SignerResponse::Bytes(bytes));
        }
        if let Some(s) = value.as_str() {
            found.push(SignerResponse::Base64(s.to_string()));
        }
        if let Ok(r) = serde_json::from_value::<SignedTxXdr>(value.clone()) {
            found.push(SignerResponse::SignedTxXdr {
                xdr: r.signed_tx_xdr,
                signer_address: r.signer_address,
            });
        }
        if let Ok(r) = serde_json::from_value::<SignedTransaction>(value.clone()) {
            found.push(SignerResponse::SignedTransaction {
                xdr: r.signed_transaction,
                signer_address: r.signer_address,
            });
        }
        if let Ok(r) = serde_json::from_value::<SignedEnvelopeXdr>(value.clone()) {
            found.push(SignerResponse::SignedEnvelopeXdr(r.signed_envelope_xdr));
        }
        found
    }

    fn payload(&self) -> Option<Vec<u8>> {
        match self {
            SignerResponse::Bytes(bytes) => Some(bytes.clone()),
            SignerResponse::Base64(s)
            | SignerResponse::SignedTxXdr { xdr: s, .. }
            | SignerResponse::SignedTransaction { xdr: s, .. }
            | SignerResponse::SignedEnvelopeXdr(s) => STANDARD.decode(s.trim()).ok(),
        }
    }

    fn signer_address(&self) -> Option<&str> {
        match self {
            SignerResponse::SignedTxXdr { signer_address, .. }
            | SignerResponse::SignedTransaction { signer_address, .. } => signer_address.as_deref(),
            _ => None,
        }
    }

    fn shape(&self) -> &'static str {
        match self {
            SignerResponse::Bytes(_) => "bytes",
            SignerResponse::Base64(_) => "base64",
            SignerResponse::SignedTxXdr { .. } => "signedTxXdr",
            SignerResponse::SignedTransaction { .. } => "signedTransaction",
            SignerResponse::SignedEnvelopeXdr(_) => "signed_envelope_xdr",
        }
    }
}

/// Signed payload extracted from a signer response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSignature {
    pub signed_transaction: Vec<u8>,
    pub signer_address: Option<String>,
}

pub fn decode_signer_response(value: &Value) -> WalletResult<DecodedSignature> {
    for candidate in SignerResponse::candidates(value) {
        match candidate.payload() {
            Some(payload) if payload.len() >= MIN_SIGNED_PAYLOAD_LEN => {
                tracing::debug!(shape = candidate.shape(), len = payload.len(), "Decoded signer response");
                return Ok(DecodedSignature {
                    signer_address: candidate.signer_address().map(str::to_string),
                    signed_transaction: payload,
                });
            }
            Some(payload) => {
                tracing::debug!(
                    shape = candidate.shape(),
                    len = payload.len(),
                    "Signer response shape too short"
                );
            }
            None => {}
        }
    }

    Err(WalletError::MalformedSignerResponse(describe(value)))
}

fn describe(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            format!("object with keys [{}]", keys.join(", "))
        }
        Value::String(s) => format!("string of {} chars", s.len()),
        Value::Array(items) => format!("array of {} items", items.len()),
        other => format!("{other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn payload(byte: u8, len: usize) -> Vec<u8> {
        vec![byte; len]
    }

    #[test]
    fn decodes_each_shape() {
        let bytes = payload(1, 80);
        let b64 = STANDARD.encode(&bytes);

        let from_array = decode_signer_response(&json!(bytes)).unwrap();
        assert_eq!(from_array.signed_transaction, bytes);

        let from_string = decode_signer_response(&json!(b64)).unwrap();
        assert_eq!(from_string.signed_transaction, bytes);

        let from_xdr =
            decode_signer_response(&json!({ "signedTxXdr": b64, "signerAddress": "GABC" }))
                .unwrap();
        assert_eq!(from_xdr.signed_transaction, bytes);
        assert_eq!(from_xdr.signer_address.as_deref(), Some("GABC"));

        let from_tx = decode_signer_response(&json!({ "signedTransaction": b64 })).unwrap();
        assert_eq!(from_tx.signed_transaction, bytes);
        assert_eq!(from_tx.signer_address, None);

        let from_envelope =
            decode_signer_response(&json!({ "signed_envelope_xdr": b64 })).unwrap();
        assert_eq!(from_envelope.signed_transaction, bytes);
    }

    #[test]
    fn earlier_shape_wins_when_several_match() {
        let first = STANDARD.encode(payload(1, 70));
        let second = STANDARD.encode(payload(2, 70));
        let decoded = decode_signer_response(&json!({
            "signedTransaction": second,
            "signedTxXdr": first,
        }))
        .unwrap();
        assert_eq!(decoded.signed_transaction, payload(1, 70));
    }

    #[test]
    fn short_shape_falls_through_to_next() {
        let short = STANDARD.encode(payload(1, 10));
        let long = STANDARD.encode(payload(2, 70));
        let decoded = decode_signer_response(&json!({
            "signedTxXdr": short,
            "signed_envelope_xdr": long,
        }))
        .unwrap();
        assert_eq!(decoded.signed_transaction, payload(2, 70));
    }

    #[test]
    fn fails_closed() {
        for value in [
            json!(null),
            json!(42),
            json!({ "status": "ok" }),
            json!("not base64 !!"),
            json!(STANDARD.encode(payload(1, 63))),
            json!({ "signedTxXdr": STANDARD.encode(payload(1, 8)) }),
            json!([1, 2, 3]),
        ] {
            let err = decode_signer_response(&value).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MalformedSignerResponse, "{value}");
        }
    }

    #[test]
    fn minimum_length_is_inclusive() {
        let exact = STANDARD.encode(payload(5, MIN_SIGNED_PAYLOAD_LEN));
        assert!(decode_signer_response(&json!(exact)).is_ok());
    }
}
