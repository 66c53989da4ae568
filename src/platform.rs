// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP client for the disbursement platform's embedded-wallet API.
//!
//! Every request carries the tenant-scoping header; requests that act on
//! behalf of an authenticated wallet additionally read the current token
//! from the session store at call time and send it as a bearer. A token
//! refreshed mid-flight by the lifecycle manager is therefore picked up
//! by the next call, not the one already in progress.
//!
//! A `401` from any endpoint raises the shared expiry signal and maps to
//! [`WalletError::SessionExpired`].

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::config::{
    env_or_default, env_required, validate_base_url, WALLET_API_BASE_URL_ENV,
    WALLET_TENANT_NAME_ENV,
};
use crate::error::WalletError;
use crate::models::{
    CeremonyAttestation, CreateWalletRequest, PasskeyChallenge, PasskeyRegistration,
    SponsoredTransaction, SubmitSponsoredRequest, WalletRecord,
};
use crate::passkey::CeremonyBackend;
use crate::provisioning::ProvisioningApi;
use crate::session::manager::{ExpirySignal, TokenRefresher};
use crate::sponsored::SponsoredApi;
use crate::store::SessionStore;

const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Tenant-scoping header sent on every platform request.
const TENANT_HEADER: &str = "SDP-Tenant-Name";

/// Per-request timeout.
const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Token payloads returned by the authentication and refresh endpoints.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

/// Client for the embedded-wallet endpoints of the platform API.
#[derive(Clone)]
pub struct PlatformClient {
    base_url: String,
    tenant: String,
    http: Client,
    store: Arc<dyn SessionStore>,
    expiry: ExpirySignal,
}

impl PlatformClient {
    pub fn new(
        base_url: impl Into<String>,
        tenant: impl Into<String>,
        store: Arc<dyn SessionStore>,
        expiry: ExpirySignal,
    ) -> Result<Self, WalletError> {
        let base_url = base_url.into();
        validate_base_url(&base_url)?;

        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| WalletError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            tenant: tenant.into(),
            http,
            store,
            expiry,
        })
    }

    /// Build the client from `WALLET_API_BASE_URL` / `WALLET_TENANT_NAME`.
    pub fn from_env(
        store: Arc<dyn SessionStore>,
        expiry: ExpirySignal,
    ) -> Result<Self, WalletError> {
        let base_url = env_or_default(WALLET_API_BASE_URL_ENV, DEFAULT_BASE_URL);
        let tenant = env_required(WALLET_TENANT_NAME_ENV)?;
        Self::new(base_url, tenant, store, expiry)
    }

    // =========================================================================
    // Passkey ceremony legs
    // =========================================================================

    pub async fn registration_start(
        &self,
        identity_token: &str,
    ) -> Result<PasskeyChallenge, WalletError> {
        let value = self
            .post_json(
                "/embedded-wallets/passkey/registration/start",
                Some(identity_token),
                &json!({}),
            )
            .await?;
        Ok(PasskeyChallenge(value))
    }

    pub async fn registration_finish(
        &self,
        identity_token: &str,
        attestation: &CeremonyAttestation,
    ) -> Result<PasskeyRegistration, WalletError> {
        let value = self
            .post_json(
                "/embedded-wallets/passkey/registration/finish",
                Some(identity_token),
                &attestation.0,
            )
            .await?;
        parse_response(value)
    }

    pub async fn authentication_start(&self) -> Result<PasskeyChallenge, WalletError> {
        let value = self
            .post_json(
                "/embedded-wallets/passkey/authentication/start",
                None,
                &json!({}),
            )
            .await?;
        Ok(PasskeyChallenge(value))
    }

    pub async fn authentication_finish(
        &self,
        assertion: &CeremonyAttestation,
    ) -> Result<String, WalletError> {
        let value = self
            .post_json(
                "/embedded-wallets/passkey/authentication/finish",
                None,
                &assertion.0,
            )
            .await?;
        let response: TokenResponse = parse_response(value)?;
        Ok(response.token)
    }

    // =========================================================================
    // Wallet provisioning
    // =========================================================================

    pub async fn create_wallet(
        &self,
        request: &CreateWalletRequest,
    ) -> Result<WalletRecord, WalletError> {
        let token = self.session_token()?;
        let payload = serde_json::to_value(request)
            .map_err(|e| WalletError::InvalidResponse(format!("serialize body failed: {e}")))?;
        let value = self
            .post_json("/embedded-wallets", Some(&token), &payload)
            .await?;
        parse_response(value)
    }

    pub async fn fetch_wallet(&self, credential_id: &str) -> Result<WalletRecord, WalletError> {
        let token = self.session_token()?;
        let value = self
            .get_json(&format!("/embedded-wallets/{credential_id}"), Some(&token))
            .await?;
        parse_response(value)
    }

    // =========================================================================
    // Sponsored transactions
    // =========================================================================

    pub async fn submit_sponsored(
        &self,
        request: &SubmitSponsoredRequest,
    ) -> Result<SponsoredTransaction, WalletError> {
        let token = self.session_token()?;
        let payload = serde_json::to_value(request)
            .map_err(|e| WalletError::InvalidResponse(format!("serialize body failed: {e}")))?;
        let value = self
            .post_json(
                "/embedded-wallets/sponsored-transactions",
                Some(&token),
                &payload,
            )
            .await?;
        let transaction: SponsoredTransaction = parse_response(value)?;
        info!(id = %transaction.id, "sponsored transaction submitted");
        Ok(transaction)
    }

    pub async fn fetch_sponsored(&self, id: &str) -> Result<SponsoredTransaction, WalletError> {
        let token = self.session_token()?;
        let value = self
            .get_json(
                &format!("/embedded-wallets/sponsored-transactions/{id}"),
                Some(&token),
            )
            .await?;
        parse_response(value)
    }

    // =========================================================================
    // Session refresh
    // =========================================================================

    pub async fn refresh_session_token(&self, token: &str) -> Result<String, WalletError> {
        let value = self
            .post_json(
                "/embedded-wallets/passkey/authentication/refresh",
                Some(token),
                &json!({}),
            )
            .await?;
        let response: TokenResponse = parse_response(value)?;
        Ok(response.token)
    }

    // =========================================================================
    // Plumbing
    // =========================================================================

    /// Read the current session token fresh from the store.
    fn session_token(&self) -> Result<String, WalletError> {
        self.store
            .load()?
            .map(|session| session.token)
            .filter(|token| !token.is_empty())
            .ok_or(WalletError::MissingInput("session token"))
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn get_json(&self, path: &str, bearer: Option<&str>) -> Result<Value, WalletError> {
        let mut request = self
            .http
            .get(self.endpoint(path))
            .header(TENANT_HEADER, &self.tenant);
        if let Some(token) = bearer {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| WalletError::Transport(format!("GET {path} failed: {e}")))?;
        self.read_response(response, path).await
    }

    async fn post_json(
        &self,
        path: &str,
        bearer: Option<&str>,
        payload: &Value,
    ) -> Result<Value, WalletError> {
        let mut request = self
            .http
            .post(self.endpoint(path))
            .header(TENANT_HEADER, &self.tenant)
            .json(payload);
        if let Some(token) = bearer {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| WalletError::Transport(format!("POST {path} failed: {e}")))?;
        self.read_response(response, path).await
    }

    async fn read_response(
        &self,
        response: reqwest::Response,
        path: &str,
    ) -> Result<Value, WalletError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.error_for(status.as_u16(), body));
        }
        response
            .json()
            .await
            .map_err(|e| WalletError::InvalidResponse(format!("{path} invalid JSON: {e}")))
    }

    /// Map a non-2xx response; a 401 raises the expiry signal.
    fn error_for(&self, status: u16, body: String) -> WalletError {
        if status == 401 {
            self.expiry.raise();
            return WalletError::SessionExpired;
        }
        WalletError::Api { status, body }
    }
}

fn parse_response<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, WalletError> {
    serde_json::from_value(value)
        .map_err(|e| WalletError::InvalidResponse(format!("unexpected response shape: {e}")))
}

// =============================================================================
// Orchestration trait impls
// =============================================================================

impl TokenRefresher for PlatformClient {
    async fn refresh_token(&self, token: &str) -> Result<String, WalletError> {
        self.refresh_session_token(token).await
    }
}

impl CeremonyBackend for PlatformClient {
    async fn registration_start(&self, identity_token: &str) -> Result<PasskeyChallenge, WalletError> {
        PlatformClient::registration_start(self, identity_token).await
    }

    async fn registration_finish(
        &self,
        identity_token: &str,
        attestation: &CeremonyAttestation,
    ) -> Result<PasskeyRegistration, WalletError> {
        PlatformClient::registration_finish(self, identity_token, attestation).await
    }

    async fn authentication_start(&self) -> Result<PasskeyChallenge, WalletError> {
        PlatformClient::authentication_start(self).await
    }

    async fn authentication_finish(
        &self,
        assertion: &CeremonyAttestation,
    ) -> Result<String, WalletError> {
        PlatformClient::authentication_finish(self, assertion).await
    }
}

impl ProvisioningApi for PlatformClient {
    async fn create_wallet(&self, request: &CreateWalletRequest) -> Result<WalletRecord, WalletError> {
        PlatformClient::create_wallet(self, request).await
    }

    async fn fetch_wallet(&self, credential_id: &str) -> Result<WalletRecord, WalletError> {
        PlatformClient::fetch_wallet(self, credential_id).await
    }
}

impl SponsoredApi for PlatformClient {
    async fn submit_sponsored(
        &self,
        request: &SubmitSponsoredRequest,
    ) -> Result<SponsoredTransaction, WalletError> {
        PlatformClient::submit_sponsored(self, request).await
    }

    async fn fetch_sponsored(&self, id: &str) -> Result<SponsoredTransaction, WalletError> {
        PlatformClient::fetch_sponsored(self, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PersistedSession;
    use crate::store::MemorySessionStore;

    fn client_with_store(store: Arc<dyn SessionStore>) -> (PlatformClient, ExpirySignal) {
        let expiry = ExpirySignal::new();
        let client = PlatformClient::new(
            "https://api.example.com/",
            "tenant-a",
            store,
            expiry.clone(),
        )
        .unwrap();
        (client, expiry)
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let (client, _) = client_with_store(Arc::new(MemorySessionStore::new()));
        assert_eq!(
            client.endpoint("/embedded-wallets"),
            "https://api.example.com/embedded-wallets"
        );
    }

    #[test]
    fn unauthorized_raises_expiry_signal_once() {
        let (client, expiry) = client_with_store(Arc::new(MemorySessionStore::new()));
        let mut rx = expiry.subscribe();

        assert!(matches!(
            client.error_for(401, "expired".into()),
            WalletError::SessionExpired
        ));
        assert!(matches!(
            client.error_for(401, "expired".into()),
            WalletError::SessionExpired
        ));

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn other_statuses_surface_the_body() {
        let (client, expiry) = client_with_store(Arc::new(MemorySessionStore::new()));
        let err = client.error_for(422, "asset not enabled".into());
        assert!(matches!(
            err,
            WalletError::Api { status: 422, ref body } if body == "asset not enabled"
        ));
        assert!(!expiry.is_raised());
    }

    #[test]
    fn session_token_read_fresh_from_store() {
        let store = Arc::new(MemorySessionStore::new());
        let (client, _) = client_with_store(store.clone());

        assert!(matches!(
            client.session_token(),
            Err(WalletError::MissingInput("session token"))
        ));

        store.save(&PersistedSession::with_token("tok-1")).unwrap();
        assert_eq!(client.session_token().unwrap(), "tok-1");

        // Last-write-wins: the next call observes the refreshed token.
        store.save(&PersistedSession::with_token("tok-2")).unwrap();
        assert_eq!(client.session_token().unwrap(), "tok-2");
    }

    #[test]
    fn rejects_invalid_base_url() {
        let result = PlatformClient::new(
            "not a url",
            "tenant-a",
            Arc::new(MemorySessionStore::new()),
            ExpirySignal::new(),
        );
        assert!(matches!(result, Err(WalletError::MissingConfig(_))));
    }
}
