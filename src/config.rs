// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration Constants
//!
//! This module defines environment variable names and shared lookup helpers
//! used by the client constructors. Configuration is loaded from the
//! environment at startup; each client module documents its own defaults.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `WALLET_API_BASE_URL` | Disbursement platform API base URL | `http://localhost:8000` |
//! | `WALLET_TENANT_NAME` | Tenant name sent on every platform request | Required |
//! | `HORIZON_BASE_URL` | Read-only ledger RPC base URL | `https://horizon-testnet.stellar.org` |
//! | `ANCHOR_BASE_URL` | SEP anchor base URL for fiat funding | Required for deposits |
//! | `SESSION_DB_PATH` | Path of the persisted session database | `wallet-session.redb` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::env;

use crate::error::WalletError;

/// Environment variable name for the platform API base URL.
pub const WALLET_API_BASE_URL_ENV: &str = "WALLET_API_BASE_URL";

/// Environment variable name for the tenant-scoping header value.
pub const WALLET_TENANT_NAME_ENV: &str = "WALLET_TENANT_NAME";

/// Environment variable name for the ledger RPC base URL.
pub const HORIZON_BASE_URL_ENV: &str = "HORIZON_BASE_URL";

/// Environment variable name for the SEP anchor base URL.
pub const ANCHOR_BASE_URL_ENV: &str = "ANCHOR_BASE_URL";

/// Environment variable name for the persisted session database path.
///
/// The database holds a single durable key with the wallet session record;
/// see [`crate::store`].
pub const SESSION_DB_PATH_ENV: &str = "SESSION_DB_PATH";

/// Read an environment variable, falling back to a default.
pub(crate) fn env_or_default(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Read a required environment variable.
pub(crate) fn env_required(name: &str) -> Result<String, WalletError> {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| WalletError::MissingConfig(name.to_string()))
}

/// Validate that a configured base URL parses as an absolute URL.
pub(crate) fn validate_base_url(raw: &str) -> Result<(), WalletError> {
    raw.parse::<url::Url>()
        .map(|_| ())
        .map_err(|e| WalletError::MissingConfig(format!("invalid base URL {raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_default_falls_back() {
        assert_eq!(env_or_default("WALLET_TEST_UNSET_VAR", "fallback"), "fallback");
    }

    #[test]
    fn env_required_rejects_missing() {
        let err = env_required("WALLET_TEST_UNSET_VAR").unwrap_err();
        assert!(matches!(err, WalletError::MissingConfig(_)));
    }

    #[test]
    fn validate_base_url_accepts_http_and_rejects_garbage() {
        validate_base_url("https://api.example.com").unwrap();
        assert!(validate_base_url("not a url").is_err());
    }
}
