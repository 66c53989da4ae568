// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # SEP Authentication Chain
//!
//! Fiat-to-asset funding: a contract-account challenge authentication
//! (SEP-45 style) followed by an interactive deposit handshake (SEP-24
//! style). The two calls are strictly sequential — the deposit leg only
//! runs once authentication yields its short-lived token, and that token
//! never outlives the call chain.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::config::{env_required, validate_base_url, ANCHOR_BASE_URL_ENV};
use crate::error::WalletError;
use crate::models::DepositSession;

/// Per-request timeout.
const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Short-lived token from the challenge authentication.
#[derive(Debug, Deserialize)]
struct AuthTokenResponse {
    token: String,
}

/// Client for the SEP anchor endpoints.
#[derive(Debug, Clone)]
pub struct SepClient {
    base_url: String,
    http: Client,
}

impl SepClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, WalletError> {
        let base_url = base_url.into();
        validate_base_url(&base_url)?;

        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| WalletError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { base_url, http })
    }

    /// Build the client from `ANCHOR_BASE_URL`.
    pub fn from_env() -> Result<Self, WalletError> {
        Self::new(env_required(ANCHOR_BASE_URL_ENV)?)
    }

    /// Start an interactive deposit for the given asset.
    ///
    /// Both identifiers are mandatory preconditions, validated before any
    /// network call; a missing one fails fast and is not retryable.
    pub async fn deposit_with_asset_code(
        &self,
        asset_code: &str,
        contract_address: &str,
        credential_id: &str,
    ) -> Result<DepositSession, WalletError> {
        if contract_address.is_empty() {
            return Err(WalletError::MissingInput("contract address"));
        }
        if credential_id.is_empty() {
            return Err(WalletError::MissingInput("credential id"));
        }
        if asset_code.is_empty() {
            return Err(WalletError::MissingInput("asset code"));
        }

        let auth_token = self.authenticate(contract_address, credential_id).await?;
        let deposit = self
            .interactive_deposit(&auth_token, asset_code, contract_address)
            .await?;
        info!(asset_code, "interactive deposit started");
        Ok(deposit)
    }

    /// Challenge authentication scoped to the wallet's contract account.
    async fn authenticate(
        &self,
        contract_address: &str,
        credential_id: &str,
    ) -> Result<String, WalletError> {
        let payload = json!({
            "account": contract_address,
            "credential_id": credential_id,
        });

        let response: AuthTokenResponse = self.post_json("/auth", None, &payload).await?;
        if response.token.trim().is_empty() {
            return Err(WalletError::InvalidResponse(
                "auth response did not include token".to_string(),
            ));
        }
        Ok(response.token)
    }

    /// Interactive deposit handshake using the auth token.
    async fn interactive_deposit(
        &self,
        auth_token: &str,
        asset_code: &str,
        contract_address: &str,
    ) -> Result<DepositSession, WalletError> {
        let payload = json!({
            "asset_code": asset_code,
            "account": contract_address,
        });

        self.post_json(
            "/sep24/transactions/deposit/interactive",
            Some(auth_token),
            &payload,
        )
        .await
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        bearer: Option<&str>,
        payload: &serde_json::Value,
    ) -> Result<T, WalletError> {
        let mut request = self
            .http
            .post(format!("{}{}", self.base_url.trim_end_matches('/'), path))
            .json(payload);
        if let Some(token) = bearer {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| WalletError::Transport(format!("POST {path} failed: {e}")))?;

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
            .map_err(|e| WalletError::InvalidResponse(format!("POST {path} invalid JSON: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_preconditions_fail_before_any_network_call() {
        // Bogus port: a network attempt would surface as Transport.
        let client = SepClient::new("http://127.0.0.1:1").unwrap();

        let err = client
            .deposit_with_asset_code("USDC", "", "cred-1")
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::MissingInput("contract address")));

        let err = client
            .deposit_with_asset_code("USDC", "CWALLET", "")
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::MissingInput("credential id")));

        let err = client
            .deposit_with_asset_code("", "CWALLET", "cred-1")
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::MissingInput("asset code")));
    }
}
