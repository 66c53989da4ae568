// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Wallet Provisioning Poller
//!
//! Requests wallet creation once and polls the status endpoint in a
//! bounded fixed-interval loop until a terminal status. Create-call
//! idempotency is the server's responsibility; the client does not
//! deduplicate.
//!
//! A terminal `FAILED` status throws [`WalletError::WalletFailed`]
//! immediately — failed provisioning is an exceptional setup error, not a
//! business outcome (contrast with [`crate::sponsored`]). Exhausting the
//! attempt budget throws the distinct [`WalletError::PollTimeout`] so
//! callers can offer "try again".

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::WalletError;
use crate::models::{CreateWalletRequest, PollOptions, WalletRecord, WalletStatus};

/// Default policy: 60 polls at 2-second spacing, about two minutes.
pub const DEFAULT_POLL: PollOptions = PollOptions {
    max_attempts: 60,
    interval: std::time::Duration::from_secs(2),
};

/// Provisioning legs of the platform API.
#[allow(async_fn_in_trait)]
pub trait ProvisioningApi {
    /// Request creation of an embedded wallet.
    async fn create_wallet(
        &self,
        request: &CreateWalletRequest,
    ) -> Result<WalletRecord, WalletError>;

    /// Fetch the current provisioning status for a credential.
    async fn fetch_wallet(&self, credential_id: &str) -> Result<WalletRecord, WalletError>;
}

/// Create a wallet and poll until it reaches a terminal status.
///
/// Cancellation stops further scheduled polls; an in-flight request is
/// never aborted.
pub async fn provision_wallet(
    api: &impl ProvisioningApi,
    request: &CreateWalletRequest,
    opts: PollOptions,
    cancel: &CancellationToken,
) -> Result<WalletRecord, WalletError> {
    api.create_wallet(request).await?;
    info!(
        credential_id = %request.credential_id,
        max_attempts = opts.max_attempts,
        interval_ms = opts.interval.as_millis() as u64,
        "wallet provisioning requested"
    );

    for attempt in 1..=opts.max_attempts {
        if cancel.is_cancelled() {
            return Err(WalletError::Cancelled);
        }

        let record = api.fetch_wallet(&request.credential_id).await?;
        match record.status {
            WalletStatus::Success => {
                info!(attempt, "wallet provisioned");
                return Ok(record);
            }
            WalletStatus::Failed => {
                warn!(attempt, "wallet provisioning failed");
                return Err(WalletError::WalletFailed);
            }
            WalletStatus::Pending | WalletStatus::Processing => {}
        }

        if attempt < opts.max_attempts {
            tokio::select! {
                _ = tokio::time::sleep(opts.interval) => {},
                _ = cancel.cancelled() => return Err(WalletError::Cancelled),
            }
        }
    }

    warn!(
        attempts = opts.max_attempts,
        "wallet provisioning timed out"
    );
    Err(WalletError::PollTimeout {
        attempts: opts.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct ScriptedApi {
        statuses: Mutex<VecDeque<WalletStatus>>,
        creates: AtomicU32,
        fetches: AtomicU32,
    }

    impl ScriptedApi {
        fn with_statuses(statuses: &[WalletStatus]) -> Self {
            Self {
                statuses: Mutex::new(statuses.iter().copied().collect()),
                creates: AtomicU32::new(0),
                fetches: AtomicU32::new(0),
            }
        }

        fn fetches(&self) -> u32 {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    impl ProvisioningApi for ScriptedApi {
        async fn create_wallet(
            &self,
            _request: &CreateWalletRequest,
        ) -> Result<WalletRecord, WalletError> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            Ok(WalletRecord {
                contract_address: None,
                status: WalletStatus::Pending,
            })
        }

        async fn fetch_wallet(&self, _credential_id: &str) -> Result<WalletRecord, WalletError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let status = self
                .statuses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(WalletStatus::Pending);
            Ok(WalletRecord {
                contract_address: matches!(status, WalletStatus::Success)
                    .then(|| "CCONTRACT".to_string()),
                status,
            })
        }
    }

    fn request() -> CreateWalletRequest {
        CreateWalletRequest {
            public_key: "PK1".into(),
            credential_id: "C1".into(),
        }
    }

    fn instant(max_attempts: u32) -> PollOptions {
        PollOptions {
            max_attempts,
            interval: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn immediate_success_stops_after_one_poll() {
        let api = ScriptedApi::with_statuses(&[WalletStatus::Success]);
        let record = provision_wallet(&api, &request(), instant(60), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(record.status, WalletStatus::Success);
        assert_eq!(api.fetches(), 1);
    }

    #[tokio::test]
    async fn pending_then_success_resolves_after_three_polls() {
        let api = ScriptedApi::with_statuses(&[
            WalletStatus::Pending,
            WalletStatus::Pending,
            WalletStatus::Success,
        ]);
        let record = provision_wallet(&api, &request(), instant(3), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(record.status, WalletStatus::Success);
        assert_eq!(record.contract_address.as_deref(), Some("CCONTRACT"));
        assert_eq!(api.fetches(), 3);
        assert_eq!(api.creates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn forever_pending_times_out_after_exactly_max_attempts() {
        let api = ScriptedApi::with_statuses(&[]);
        let err = provision_wallet(&api, &request(), instant(5), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::PollTimeout { attempts: 5 }));
        assert_eq!(api.fetches(), 5);
    }

    #[tokio::test]
    async fn failed_status_throws_immediately() {
        let api = ScriptedApi::with_statuses(&[
            WalletStatus::Pending,
            WalletStatus::Failed,
            WalletStatus::Success,
        ]);
        let err = provision_wallet(&api, &request(), instant(60), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::WalletFailed));
        // No polls beyond the FAILED response.
        assert_eq!(api.fetches(), 2);
    }

    #[tokio::test]
    async fn cancelled_token_stops_polling() {
        let api = ScriptedApi::with_statuses(&[]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = provision_wallet(&api, &request(), instant(60), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::Cancelled));
        assert_eq!(api.fetches(), 0);
    }
}
