// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults and the loader used by the operator
//! binary and by embedders that prefer environment-driven setup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Directory holding the local redb database | `./data` |
//! | `STELLAR_NETWORK` | `testnet` or `mainnet` | `testnet` |
//! | `HORIZON_URL` | Horizon endpoint override | Network default |
//! | `RELAY_URL` | Fee sponsorship relay submit endpoint | Optional, needed for relay commands |
//! | `RELAY_API_KEY` | Bearer credential for the relay | Required with `RELAY_URL` |
//! | `RELAY_INFO_URL` | Relay credit endpoint override | `{RELAY_URL}/info` |
//! | `RELAY_MAX_FEE` | Max fee hint (stroops) sent with relayed envelopes | None |
//! | `CREDENTIAL_FALLBACK_URL` | Legacy credential resolution service | Optional |
//! | `DOCUMENT_STORE_URL` | Remote credential document store | Optional |
//! | `REMOTE_TIMEOUT_MS` | Per-call timeout for remote tiers | `5000` |
//! | `CREDENTIAL_CACHE_CAPACITY` | In-memory credential cache entries | `256` |
//! | `BIND_RETRY_INTERVAL_SECS` | Pending remote bind retry interval | `60` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{WalletError, WalletResult};
use crate::ledger::{NetworkConfig, STELLAR_MAINNET, STELLAR_TESTNET};
use crate::logging::LogFormat;

/// Environment variable name for the local data directory.
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const STELLAR_NETWORK_ENV: &str = "STELLAR_NETWORK";
pub const HORIZON_URL_ENV: &str = "HORIZON_URL";
pub const RELAY_URL_ENV: &str = "RELAY_URL";
pub const RELAY_API_KEY_ENV: &str = "RELAY_API_KEY";
pub const RELAY_INFO_URL_ENV: &str = "RELAY_INFO_URL";
pub const RELAY_MAX_FEE_ENV: &str = "RELAY_MAX_FEE";
pub const CREDENTIAL_FALLBACK_URL_ENV: &str = "CREDENTIAL_FALLBACK_URL";
pub const DOCUMENT_STORE_URL_ENV: &str = "DOCUMENT_STORE_URL";
pub const REMOTE_TIMEOUT_MS_ENV: &str = "REMOTE_TIMEOUT_MS";
pub const CREDENTIAL_CACHE_CAPACITY_ENV: &str = "CREDENTIAL_CACHE_CAPACITY";
pub const BIND_RETRY_INTERVAL_SECS_ENV: &str = "BIND_RETRY_INTERVAL_SECS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_REMOTE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_CACHE_CAPACITY: usize = 256;
const DEFAULT_BIND_RETRY_INTERVAL_SECS: u64 = 60;

/// Name of the redb file inside `DATA_DIR`.
pub const DATABASE_FILE: &str = "wallet.redb";

/// Relay endpoint and bearer credential.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub submit_url: String,
    pub api_key: String,
    pub info_url: Option<String>,
    pub max_fee: Option<u32>,
}

/// Fully resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct WalletConfig {
    pub data_dir: PathBuf,
    pub network: NetworkConfig,
    pub horizon_url: String,
    /// `None` when `RELAY_URL` is unset; only relay commands need it.
    pub relay: Option<RelayConfig>,
    pub fallback_url: Option<String>,
    pub document_store_url: Option<String>,
    pub remote_timeout: Duration,
    pub cache_capacity: usize,
    pub bind_retry_interval: Duration,
    pub log_format: LogFormat,
}

impl WalletConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> WalletResult<Self> {
        Self::from_vars(Vars(|name: &str| std::env::var(name).ok()))
    }

    fn from_vars<F: Fn(&str) -> Option<String>>(vars: Vars<F>) -> WalletResult<Self> {
        let network = network_from_name(&vars.or_default(STELLAR_NETWORK_ENV, "testnet"))?;
        let horizon_url = validated_url(
            HORIZON_URL_ENV,
            vars.or_default(HORIZON_URL_ENV, network.horizon_url),
        )?;

        let relay = match vars.optional(RELAY_URL_ENV) {
            Some(submit_url) => Some(RelayConfig {
                submit_url: validated_url(RELAY_URL_ENV, submit_url)?,
                api_key: vars.required(RELAY_API_KEY_ENV)?,
                info_url: vars
                    .optional(RELAY_INFO_URL_ENV)
                    .map(|u| validated_url(RELAY_INFO_URL_ENV, u))
                    .transpose()?,
                max_fee: vars.parsed_optional(RELAY_MAX_FEE_ENV)?,
            }),
            None => None,
        };
        let fallback_url = vars
            .optional(CREDENTIAL_FALLBACK_URL_ENV)
            .map(|u| validated_url(CREDENTIAL_FALLBACK_URL_ENV, u))
            .transpose()?;
        let document_store_url = vars
            .optional(DOCUMENT_STORE_URL_ENV)
            .map(|u| validated_url(DOCUMENT_STORE_URL_ENV, u))
            .transpose()?;

        Ok(Self {
            data_dir: PathBuf::from(vars.or_default(DATA_DIR_ENV, DEFAULT_DATA_DIR)),
            network,
            horizon_url,
            relay,
            fallback_url,
            document_store_url,
            remote_timeout: Duration::from_millis(
                vars.parsed(REMOTE_TIMEOUT_MS_ENV, DEFAULT_REMOTE_TIMEOUT_MS)?,
            ),
            cache_capacity: vars.parsed(CREDENTIAL_CACHE_CAPACITY_ENV, DEFAULT_CACHE_CAPACITY)?,
            bind_retry_interval: Duration::from_secs(
                vars.parsed(BIND_RETRY_INTERVAL_SECS_ENV, DEFAULT_BIND_RETRY_INTERVAL_SECS)?,
            ),
            log_format: LogFormat::parse(&vars.or_default(LOG_FORMAT_ENV, "pretty")),
        })
    }

    /// Relay settings, for the commands that talk to the relay.
    pub fn relay(&self) -> WalletResult<&RelayConfig> {
        self.relay.as_ref().ok_or_else(|| {
            WalletError::Config(format!("{RELAY_URL_ENV} is required for relay commands"))
        })
    }

    /// Path of the local redb database.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }
}

/// Map a network name onto its configuration.
pub fn network_from_name(raw: &str) -> WalletResult<NetworkConfig> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "testnet" => Ok(STELLAR_TESTNET),
        "mainnet" | "public" | "pubnet" => Ok(STELLAR_MAINNET),
        other => Err(WalletError::Config(format!(
            "unknown {STELLAR_NETWORK_ENV} `{other}` (expected `testnet` or `mainnet`)"
        ))),
    }
}

/// Variable lookup, trimmed, with empty values treated as unset.
struct Vars<F>(F);

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    fn optional(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, name: &str) -> WalletResult<String> {
        self.optional(name)
            .ok_or_else(|| WalletError::Config(format!("{name} is required")))
    }

    fn or_default(&self, name: &str, default: &str) -> String {
        self.optional(name).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T: std::str::FromStr>(&self, name: &str, default: T) -> WalletResult<T> {
        Ok(self.parsed_optional(name)?.unwrap_or(default))
    }

    fn parsed_optional<T: std::str::FromStr>(&self, name: &str) -> WalletResult<Option<T>> {
        self.optional(name)
            .map(|raw| {
                raw.parse()
                    .map_err(|_| WalletError::Config(format!("{name} has an invalid value `{raw}`")))
            })
            .transpose()
    }
}

fn validated_url(name: &str, raw: String) -> WalletResult<String> {
    let parsed = url::Url::parse(&raw)
        .map_err(|e| WalletError::Config(format!("{name} is not a valid URL: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(raw.trim_end_matches('/').to_string()),
        scheme => Err(WalletError::Config(format!(
            "{name} must use http or https, got `{scheme}`"
        ))),
    }
}
