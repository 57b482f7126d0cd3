// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Operator commands against the configured credential stores and relay.
//!
//! ```text
//! relational-stellar-wallet resolve <credential-id>
//! relational-stellar-wallet bind <credential-id> <contract-address>
//! relational-stellar-wallet reconcile <credential-id>
//! relational-stellar-wallet credits
//! relational-stellar-wallet sequence <account>
//! relational-stellar-wallet retry-binds [--watch]
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use relational_stellar_wallet::config::WalletConfig;
use relational_stellar_wallet::ledger::{validate_account, HorizonClient, LedgerClient};
use relational_stellar_wallet::logging;
use relational_stellar_wallet::relay::{FeeSponsorshipClient, SponsorshipRelay};
use relational_stellar_wallet::resolver::{
    BindRetryWorker, CredentialResolver, FallbackResolverClient, RestDocumentStore,
};
use relational_stellar_wallet::storage::{CredentialCache, CredentialDatabase};
use relational_stellar_wallet::{WalletError, WalletResult};

const USAGE: &str = "usage: relational-stellar-wallet <resolve <credential-id> | bind <credential-id> <contract-address> | reconcile <credential-id> | credits | sequence <account> | retry-binds [--watch]>";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Resolve(String),
    Bind(String, String),
    Reconcile(String),
    Credits,
    Sequence(String),
    RetryBinds { watch: bool },
}

impl Command {
    fn parse(args: &[String]) -> Option<Self> {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        match args.as_slice() {
            ["resolve", id] => Some(Command::Resolve(id.to_string())),
            ["bind", id, address] => Some(Command::Bind(id.to_string(), address.to_string())),
            ["reconcile", id] => Some(Command::Reconcile(id.to_string())),
            ["credits"] => Some(Command::Credits),
            ["sequence", account] => Some(Command::Sequence(account.to_string())),
            ["retry-binds"] => Some(Command::RetryBinds { watch: false }),
            ["retry-binds", "--watch"] => Some(Command::RetryBinds { watch: true }),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = Command::parse(&args) else {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    };

    let config = match WalletConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };
    logging::init(config.log_format);
    info!(
        network = config.network.name,
        horizon_url = %config.horizon_url,
        relay = config.relay.is_some(),
        "Configuration loaded"
    );

    match run(command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, kind = ?e.kind(), "Command failed");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: &WalletConfig) -> WalletResult<()> {
    match command {
        Command::Credits => {
            let relay = FeeSponsorshipClient::from_config(config.relay()?, config.remote_timeout)?;
            let credits = relay.get_credits().await;
            println!("{credits}");
            Ok(())
        }
        Command::Sequence(account) => {
            validate_account(&account)?;
            let horizon = HorizonClient::new(&config.horizon_url, config.remote_timeout)?;
            let sequence = horizon.account_sequence(&account).await?;
            println!("{sequence}");
            Ok(())
        }
        Command::Resolve(credential_id) => {
            let address = build_resolver(config)?.resolve(&credential_id).await?;
            println!("{address}");
            Ok(())
        }
        Command::Bind(credential_id, address) => {
            let status = build_resolver(config)?.bind(&credential_id, &address).await?;
            println!("{status:?}");
            Ok(())
        }
        Command::Reconcile(credential_id) => {
            match build_resolver(config)?.reconcile(&credential_id).await? {
                Some(address) => println!("{address}"),
                None => println!("no mapping"),
            }
            Ok(())
        }
        Command::RetryBinds { watch: false } => {
            let flushed = build_resolver(config)?.retry_pending_binds().await?;
            println!("{flushed}");
            Ok(())
        }
        Command::RetryBinds { watch: true } => {
            let resolver = Arc::new(build_resolver(config)?);
            let shutdown = CancellationToken::new();
            let worker = tokio::spawn(
                BindRetryWorker::new(resolver)
                    .with_interval(config.bind_retry_interval)
                    .run(shutdown.clone()),
            );

            tokio::signal::ctrl_c()
                .await
                .map_err(|e| WalletError::Internal(format!("failed to listen for Ctrl-C: {e}")))?;
            info!("Shutdown requested");
            shutdown.cancel();
            worker
                .await
                .map_err(|e| WalletError::Internal(format!("bind retry worker panicked: {e}")))
        }
    }
}

fn build_resolver(config: &WalletConfig) -> WalletResult<CredentialResolver> {
    let db = Arc::new(CredentialDatabase::open(&config.database_path())?);
    let cache = Arc::new(CredentialCache::new(config.cache_capacity));
    let mut resolver = CredentialResolver::new(cache, db, config.remote_timeout);

    if let Some(url) = &config.document_store_url {
        resolver = resolver.with_document_store(Arc::new(RestDocumentStore::new(
            url,
            config.remote_timeout,
        )?));
    }
    if let Some(url) = &config.fallback_url {
        resolver = resolver.with_fallback(Arc::new(FallbackResolverClient::new(
            url,
            config.remote_timeout,
        )?));
    }
    Ok(resolver)
}
