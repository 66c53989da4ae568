// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Wallet Data Models
//!
//! Request/response structures for the platform API plus the session
//! representations. Two session shapes exist on purpose:
//!
//! - [`PersistedSession`] is the single durable record owned by the
//!   session store (token plus the flags that must survive restarts).
//! - [`WalletSession`] is the in-memory snapshot handed to consumers,
//!   derived from the persisted record and the decoded token claims.
//!
//! Status enums use the server's SCREAMING_SNAKE wire casing.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// =============================================================================
// Session
// =============================================================================

/// Durable wallet session record, stored under a single key.
///
/// Earlier releases persisted the bare token string; the store upgrades
/// that format on load (see [`crate::store`]).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersistedSession {
    /// The wallet session token (JWT).
    pub token: String,
    /// Whether receiver verification is still outstanding for this wallet.
    #[serde(default)]
    pub is_verification_pending: bool,
    /// Asset the user picked before verification completed, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_asset: Option<String>,
}

impl PersistedSession {
    /// Build a fresh record holding only a token.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            is_verification_pending: false,
            pending_asset: None,
        }
    }
}

/// In-memory session snapshot for consumers.
///
/// Invariant: `is_authenticated` implies non-empty `token` and
/// `contract_address`. `is_session_expired` stays set until a new session
/// is established.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletSession {
    /// Current session token.
    pub token: String,
    /// On-ledger address of the user's contract wallet.
    pub contract_address: String,
    /// Identifier of the passkey credential backing this session.
    pub credential_id: String,
    /// Whether the session is usable for authenticated calls.
    pub is_authenticated: bool,
    /// Whether this session's token expired (sticky until re-login).
    pub is_session_expired: bool,
    /// Whether this snapshot was produced by a token refresh.
    pub is_token_refresh: bool,
    /// Whether receiver verification is still outstanding.
    pub is_verification_pending: bool,
    /// Asset selected before verification completed, if any.
    pub pending_asset: Option<String>,
}

// =============================================================================
// Passkey Ceremony
// =============================================================================

/// Server-issued public-key ceremony options.
///
/// Opaque to the client: produced by a `start` call, handed to the platform
/// authenticator exactly once, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasskeyChallenge(pub serde_json::Value);

/// Authenticator output submitted to a `finish` call.
///
/// Opaque attestation (registration) or assertion (authentication) payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CeremonyAttestation(pub serde_json::Value);

/// Result of a completed registration ceremony.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PasskeyRegistration {
    /// Identifier of the newly registered credential.
    pub credential_id: String,
    /// Public key of the credential, as returned by the server.
    pub public_key: String,
}

// =============================================================================
// Wallet Provisioning
// =============================================================================

/// Request to create an embedded wallet for a registered credential.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateWalletRequest {
    /// Public key of the passkey credential.
    pub public_key: String,
    /// Identifier of the passkey credential.
    pub credential_id: String,
}

/// Server-side provisioning status of an embedded wallet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WalletStatus {
    Pending,
    Processing,
    Success,
    Failed,
}

impl WalletStatus {
    /// Whether this status ends the provisioning poll.
    pub fn is_terminal(self) -> bool {
        matches!(self, WalletStatus::Success | WalletStatus::Failed)
    }
}

/// Embedded wallet record as returned by the platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalletRecord {
    /// Contract address, present once provisioning succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    /// Current provisioning status.
    pub status: WalletStatus,
}

// =============================================================================
// Sponsored Transactions
// =============================================================================

/// Request to submit a signed operation for fee sponsorship.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmitSponsoredRequest {
    /// Signed operation payload, base64 XDR.
    pub operation_xdr: String,
}

/// Lifecycle status of a sponsored transaction.
///
/// `Pending`, `Processing`, and `Submitted` are the pending family;
/// `Success` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SponsoredStatus {
    Pending,
    Processing,
    Submitted,
    Success,
    Failed,
}

impl SponsoredStatus {
    /// Whether this status ends the transaction poll.
    pub fn is_terminal(self) -> bool {
        matches!(self, SponsoredStatus::Success | SponsoredStatus::Failed)
    }
}

/// A sponsored transaction as tracked by the platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SponsoredTransaction {
    /// Platform identifier for this submission.
    pub id: String,
    /// Current status.
    pub status: SponsoredStatus,
    /// On-ledger transaction hash, once relayed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
}

// =============================================================================
// Destination Preflight
// =============================================================================

/// Outcome of the destination account-existence check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationStatus {
    /// The destination account exists on the ledger.
    Exists,
    /// The ledger reported the account as missing.
    Missing,
}

/// Outcome of the destination trustline check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustlineStatus {
    /// The account holds (or natively holds) the asset.
    Present,
    /// No trustline for the asset on the destination account.
    Missing,
}

// =============================================================================
// SEP Funding
// =============================================================================

/// Result of an interactive deposit handshake.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DepositSession {
    /// Anchor transaction identifier, when provided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Interactive deposit URL the caller should open.
    pub url: String,
}

// =============================================================================
// Polling Policy
// =============================================================================

/// Bounded fixed-interval polling policy.
///
/// No backoff: provisioning and sponsorship latency is expected to be
/// short and bounded, so each poller retries at a fixed spacing up to
/// `max_attempts` total status checks. Per-poller defaults live with the
/// pollers ([`crate::provisioning::DEFAULT_POLL`],
/// [`crate::sponsored::DEFAULT_POLL`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Maximum number of status checks before timing out.
    pub max_attempts: u32,
    /// Fixed sleep between status checks.
    pub interval: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wallet_status_uses_wire_casing() {
        let status: WalletStatus = serde_json::from_str("\"SUCCESS\"").unwrap();
        assert_eq!(status, WalletStatus::Success);
        assert_eq!(serde_json::to_string(&WalletStatus::Pending).unwrap(), "\"PENDING\"");
    }

    #[test]
    fn terminal_statuses() {
        assert!(WalletStatus::Success.is_terminal());
        assert!(WalletStatus::Failed.is_terminal());
        assert!(!WalletStatus::Processing.is_terminal());

        assert!(SponsoredStatus::Failed.is_terminal());
        assert!(!SponsoredStatus::Submitted.is_terminal());
    }

    #[test]
    fn persisted_session_defaults_optional_fields() {
        let parsed: PersistedSession = serde_json::from_str(r#"{"token":"abc"}"#).unwrap();
        assert_eq!(parsed.token, "abc");
        assert!(!parsed.is_verification_pending);
        assert!(parsed.pending_asset.is_none());
    }

    #[test]
    fn wallet_record_tolerates_missing_contract_address() {
        let parsed: WalletRecord = serde_json::from_str(r#"{"status":"PENDING"}"#).unwrap();
        assert!(parsed.contract_address.is_none());
        assert_eq!(parsed.status, WalletStatus::Pending);
    }
}
