// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Credential Ceremony Client
//!
//! Two-phase start/finish pipelines around a platform-authenticator
//! ceremony. Each public operation is a strict three-step pipeline:
//!
//! 1. fetch the one-time challenge from the platform,
//! 2. hand it to the authenticator ([`PasskeyAuthenticator`]) exactly once,
//! 3. submit the ceremony result back to finish the handshake.
//!
//! The authenticator is an external collaborator and is never retried
//! here: a cancelled or failed ceremony is a terminal, user-facing
//! failure. Nothing is persisted until step 3 succeeds, so an abandoned
//! ceremony leaves no partial state (server-side challenge expiry covers
//! the rest).

use tracing::info;

use crate::error::WalletError;
use crate::models::{CeremonyAttestation, PasskeyChallenge, PasskeyRegistration};

/// Narrow interface over the platform authenticator.
///
/// The challenge is taken by value: server-issued ceremony options are
/// consumed exactly once per attempt.
#[allow(async_fn_in_trait)]
pub trait PasskeyAuthenticator {
    /// Run the registration ceremony (credential creation).
    async fn create_credential(
        &self,
        challenge: PasskeyChallenge,
    ) -> Result<CeremonyAttestation, WalletError>;

    /// Run the authentication ceremony (credential assertion).
    async fn get_credential(
        &self,
        challenge: PasskeyChallenge,
    ) -> Result<CeremonyAttestation, WalletError>;
}

/// Server legs of the ceremony, implemented by the platform client.
#[allow(async_fn_in_trait)]
pub trait CeremonyBackend {
    async fn registration_start(
        &self,
        identity_token: &str,
    ) -> Result<PasskeyChallenge, WalletError>;

    async fn registration_finish(
        &self,
        identity_token: &str,
        attestation: &CeremonyAttestation,
    ) -> Result<PasskeyRegistration, WalletError>;

    async fn authentication_start(&self) -> Result<PasskeyChallenge, WalletError>;

    async fn authentication_finish(
        &self,
        assertion: &CeremonyAttestation,
    ) -> Result<String, WalletError>;
}

/// Register a new passkey credential under the given identity token.
pub async fn register(
    backend: &impl CeremonyBackend,
    authenticator: &impl PasskeyAuthenticator,
    identity_token: &str,
) -> Result<PasskeyRegistration, WalletError> {
    if identity_token.is_empty() {
        return Err(WalletError::MissingInput("identity token"));
    }

    let challenge = backend.registration_start(identity_token).await?;
    let attestation = authenticator.create_credential(challenge).await?;
    let registration = backend
        .registration_finish(identity_token, &attestation)
        .await?;
    info!(
        credential_id = %registration.credential_id,
        "passkey registration completed"
    );
    Ok(registration)
}

/// Authenticate with an existing passkey; returns the session token.
pub async fn authenticate(
    backend: &impl CeremonyBackend,
    authenticator: &impl PasskeyAuthenticator,
) -> Result<String, WalletError> {
    let challenge = backend.authentication_start().await?;
    let assertion = authenticator.get_credential(challenge).await?;
    backend.authentication_finish(&assertion).await
}
