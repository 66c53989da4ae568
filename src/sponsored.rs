// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Sponsored Transaction Poller
//!
//! Submits a signed operation for fee sponsorship and polls until the
//! platform reports a terminal status. Same bounded fixed-interval loop
//! as [`crate::provisioning`], with a longer default budget to cover
//! on-chain settlement latency.
//!
//! Unlike provisioning, both `SUCCESS` and `FAILED` are **returned**: a
//! failed sponsored transaction is a normal business outcome for callers
//! to present, not an exceptional setup error.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::WalletError;
use crate::models::{PollOptions, SponsoredTransaction, SubmitSponsoredRequest};

/// Default policy: 120 polls at 2-second spacing, about four minutes.
pub const DEFAULT_POLL: PollOptions = PollOptions {
    max_attempts: 120,
    interval: std::time::Duration::from_secs(2),
};

/// Sponsored-transaction legs of the platform API.
#[allow(async_fn_in_trait)]
pub trait SponsoredApi {
    /// Submit a signed operation for sponsorship.
    async fn submit_sponsored(
        &self,
        request: &SubmitSponsoredRequest,
    ) -> Result<SponsoredTransaction, WalletError>;

    /// Fetch the current status of a submitted transaction.
    async fn fetch_sponsored(&self, id: &str) -> Result<SponsoredTransaction, WalletError>;
}

/// Poll a submitted transaction until it reaches a terminal status.
///
/// Returns the terminal record, whether `SUCCESS` or `FAILED`; only
/// transport failures, cancellation, and attempt exhaustion are errors.
pub async fn await_sponsored(
    api: &impl SponsoredApi,
    id: &str,
    opts: PollOptions,
    cancel: &CancellationToken,
) -> Result<SponsoredTransaction, WalletError> {
    info!(
        id,
        max_attempts = opts.max_attempts,
        interval_ms = opts.interval.as_millis() as u64,
        "awaiting sponsored transaction"
    );

    for attempt in 1..=opts.max_attempts {
        if cancel.is_cancelled() {
            return Err(WalletError::Cancelled);
        }

        let transaction = api.fetch_sponsored(id).await?;
        if transaction.status.is_terminal() {
            info!(id, attempt, status = ?transaction.status, "sponsored transaction settled");
            return Ok(transaction);
        }

        if attempt < opts.max_attempts {
            tokio::select! {
                _ = tokio::time::sleep(opts.interval) => {},
                _ = cancel.cancelled() => return Err(WalletError::Cancelled),
            }
        }
    }

    warn!(id, attempts = opts.max_attempts, "sponsored transaction poll timed out");
    Err(WalletError::PollTimeout {
        attempts: opts.max_attempts,
    })
}
