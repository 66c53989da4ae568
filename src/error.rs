// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Central error type for the wallet client.
//!
//! One variant per failure class so callers can branch on identity:
//! a `WalletFailed` provisioning outcome is unrecoverable setup failure,
//! while `PollTimeout` is retryable; `SessionExpired` is raised centrally
//! and never silently retried.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    /// Network or transport failure before a response was received.
    #[error("request failed: {0}")]
    Transport(String),

    /// Non-2xx response from a remote service, with the raw error body.
    #[error("server returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The wallet session token expired (401 or locally detected).
    #[error("wallet session has expired")]
    SessionExpired,

    /// A required input was missing; caught before any network call.
    #[error("missing required input: {0}")]
    MissingInput(&'static str),

    /// Required configuration was not present in the environment.
    #[error("configuration missing: {0}")]
    MissingConfig(String),

    /// The platform authenticator ceremony was cancelled or failed.
    #[error("authenticator ceremony failed: {0}")]
    Ceremony(String),

    /// The server reported terminal FAILED status for wallet provisioning.
    #[error("wallet provisioning failed")]
    WalletFailed,

    /// A polling loop exhausted its attempts without a terminal status.
    #[error("no terminal status after {attempts} polls")]
    PollTimeout { attempts: u32 },

    /// A response was received but could not be interpreted.
    #[error("response was invalid: {0}")]
    InvalidResponse(String),

    /// The session token could not be decoded.
    #[error("session token is malformed")]
    MalformedToken,

    /// The persisted session store failed.
    #[error("session storage failed: {0}")]
    Storage(String),

    /// The caller's cancellation token was triggered between polls.
    #[error("operation cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_and_failed_are_distinct() {
        let timeout = WalletError::PollTimeout { attempts: 60 };
        let failed = WalletError::WalletFailed;
        assert!(matches!(timeout, WalletError::PollTimeout { attempts: 60 }));
        assert!(!matches!(failed, WalletError::PollTimeout { .. }));
    }

    #[test]
    fn display_includes_server_body() {
        let err = WalletError::Api {
            status: 400,
            body: "bad asset".into(),
        };
        assert_eq!(err.to_string(), "server returned 400: bad asset");
    }
}
