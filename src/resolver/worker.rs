// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Bind Retry Worker
//!
//! Background task that periodically flushes credential bindings whose
//! document store write failed at creation time. Connects also flush the
//! queue, so this worker only matters for long-lived processes.
//!
//! Stops when its `CancellationToken` is cancelled.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::CredentialResolver;

const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(60);

pub struct BindRetryWorker {
    resolver: Arc<CredentialResolver>,
    interval: Duration,
}

impl BindRetryWorker {
    pub fn new(resolver: Arc<CredentialResolver>) -> Self {
        Self {
            resolver,
            interval: DEFAULT_RETRY_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run until `shutdown` is cancelled.
    ///
    /// ```rust,ignore
    /// tokio::spawn(worker.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Bind retry worker starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Bind retry worker shutting down");
                return;
            }

            if let Err(e) = self.resolver.retry_pending_binds().await {
                warn!(error = %e, "Bind retry sweep failed");
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Bind retry worker shutting down");
                    return;
                }
            }
        }
    }
}
