// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Destination Preflight Checker
//!
//! Read-only checks against the ledger RPC before a transfer is built:
//! does the destination account exist, and does it hold (or natively
//! hold) a trustline for the target asset. Both checks are expensive
//! network round trips and are only performed when the caller invokes
//! them explicitly.
//!
//! The RPC does not expose structured error codes, so missing accounts
//! and trustlines are classified by case-insensitive substrings of the
//! error body (plus the 404 status). The substrings are a versioned
//! fallback pinned to the current RPC release; see
//! [`classify_account_error`] and [`classify_trustline_error`].

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::warn;

use crate::config::{env_or_default, validate_base_url, HORIZON_BASE_URL_ENV};
use crate::error::WalletError;
use crate::models::{DestinationStatus, TrustlineStatus};

const DEFAULT_BASE_URL: &str = "https://horizon-testnet.stellar.org";

/// Code of the ledger's native asset, which needs no trustline.
pub const NATIVE_ASSET_CODE: &str = "XLM";

/// Per-request timeout.
const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Client for the read-only ledger RPC.
#[derive(Debug, Clone)]
pub struct LedgerClient {
    base_url: String,
    http: Client,
}

impl LedgerClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, WalletError> {
        let base_url = base_url.into();
        validate_base_url(&base_url)?;

        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| WalletError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { base_url, http })
    }

    /// Build the client from `HORIZON_BASE_URL`.
    pub fn from_env() -> Result<Self, WalletError> {
        Self::new(env_or_default(HORIZON_BASE_URL_ENV, DEFAULT_BASE_URL))
    }

    /// Check that the destination account exists on the ledger.
    ///
    /// A lookup error classified as "account not found" yields
    /// [`DestinationStatus::Missing`]; any other failure is returned as an
    /// error, not swallowed.
    pub async fn check_destination(
        &self,
        account_id: &str,
    ) -> Result<DestinationStatus, WalletError> {
        if account_id.is_empty() {
            return Err(WalletError::MissingInput("destination account"));
        }

        match self.fetch_account(account_id).await {
            Ok(_) => Ok(DestinationStatus::Exists),
            Err(WalletError::Api { status, ref body }) if classify_account_error(status, body) => {
                Ok(DestinationStatus::Missing)
            }
            Err(e) => {
                warn!(account_id, error = %e, "destination check failed");
                Err(e)
            }
        }
    }

    /// Check that the destination holds a trustline for the asset.
    ///
    /// The native asset (no issuer) is always present, with no network
    /// call. For issued assets the account's balances are inspected for a
    /// matching entry; an absent entry, or an error classified as a
    /// missing account/trustline, yields [`TrustlineStatus::Missing`].
    pub async fn check_trustline(
        &self,
        account_id: &str,
        asset_code: &str,
        asset_issuer: Option<&str>,
    ) -> Result<TrustlineStatus, WalletError> {
        if account_id.is_empty() {
            return Err(WalletError::MissingInput("destination account"));
        }
        if asset_code.is_empty() {
            return Err(WalletError::MissingInput("asset code"));
        }

        let Some(issuer) = asset_issuer else {
            return Ok(TrustlineStatus::Present);
        };
        if asset_code.eq_ignore_ascii_case(NATIVE_ASSET_CODE)
            || asset_code.eq_ignore_ascii_case("native")
        {
            return Ok(TrustlineStatus::Present);
        }

        match self.fetch_account(account_id).await {
            Ok(account) => {
                if has_trustline(&account, asset_code, issuer) {
                    Ok(TrustlineStatus::Present)
                } else {
                    Ok(TrustlineStatus::Missing)
                }
            }
            Err(WalletError::Api { status, ref body })
                if classify_trustline_error(status, body) =>
            {
                Ok(TrustlineStatus::Missing)
            }
            Err(e) => {
                warn!(account_id, asset_code, error = %e, "trustline check failed");
                Err(e)
            }
        }
    }

    async fn fetch_account(&self, account_id: &str) -> Result<Value, WalletError> {
        let url = format!(
            "{}/accounts/{account_id}",
            self.base_url.trim_end_matches('/')
        );

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| WalletError::Transport(format!("account lookup failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WalletError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| WalletError::InvalidResponse(format!("account lookup invalid JSON: {e}")))
    }
}

/// Whether an account-lookup failure means the account does not exist.
///
/// Pinned to the current RPC release: a 404, or the free-text
/// "account not found" message its wrapper emits.
pub(crate) fn classify_account_error(status: u16, body: &str) -> bool {
    status == 404 || body.to_ascii_lowercase().contains("account not found")
}

/// Whether a balance-lookup failure means the trustline is absent.
pub(crate) fn classify_trustline_error(status: u16, body: &str) -> bool {
    if status == 404 {
        return true;
    }
    let lower = body.to_ascii_lowercase();
    lower.contains("not found") || lower.contains("trustline")
}

/// Whether the account JSON holds a balance entry for the issued asset.
fn has_trustline(account: &Value, asset_code: &str, asset_issuer: &str) -> bool {
    account
        .get("balances")
        .and_then(Value::as_array)
        .map(|balances| {
            balances.iter().any(|balance| {
                balance.get("asset_code").and_then(Value::as_str) == Some(asset_code)
                    && balance.get("asset_issuer").and_then(Value::as_str) == Some(asset_issuer)
            })
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn account_errors_classify_case_insensitively() {
        assert!(classify_account_error(500, "Account Not Found"));
        assert!(classify_account_error(400, "ACCOUNT NOT FOUND: GABC"));
        assert!(classify_account_error(404, "Resource Missing"));
        assert!(!classify_account_error(500, "internal error"));
        assert!(!classify_account_error(429, "rate limited"));
    }

    #[test]
    fn trustline_errors_classify_on_both_substrings() {
        assert!(classify_trustline_error(400, "no trustline for asset"));
        assert!(classify_trustline_error(400, "balance Not Found"));
        assert!(classify_trustline_error(404, ""));
        assert!(!classify_trustline_error(500, "ledger unavailable"));
    }

    #[test]
    fn balance_entry_matching() {
        let account = json!({
            "balances": [
                { "asset_type": "native", "balance": "10.0" },
                { "asset_code": "USDC", "asset_issuer": "GISSUER", "balance": "5.0" }
            ]
        });
        assert!(has_trustline(&account, "USDC", "GISSUER"));
        assert!(!has_trustline(&account, "USDC", "GOTHER"));
        assert!(!has_trustline(&account, "EURC", "GISSUER"));
        assert!(!has_trustline(&json!({}), "USDC", "GISSUER"));
    }

    #[tokio::test]
    async fn native_asset_needs_no_network_call() {
        // Bogus port: a network attempt would error, proving the
        // short-circuit if this returns Present.
        let client = LedgerClient::new("http://127.0.0.1:1").unwrap();
        let status = client
            .check_trustline("GDEST", NATIVE_ASSET_CODE, None)
            .await
            .unwrap();
        assert_eq!(status, TrustlineStatus::Present);
    }

    #[tokio::test]
    async fn empty_inputs_fail_fast() {
        let client = LedgerClient::new("http://127.0.0.1:1").unwrap();
        assert!(matches!(
            client.check_destination("").await,
            Err(WalletError::MissingInput("destination account"))
        ));
        assert!(matches!(
            client.check_trustline("GDEST", "", None).await,
            Err(WalletError::MissingInput("asset code"))
        ));
    }
}
