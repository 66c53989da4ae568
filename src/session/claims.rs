// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session token claims and expiry arithmetic.
//!
//! The session token is an opaque JWT issued and signature-verified by the
//! platform. The client only inspects the payload: the expiry claim drives
//! the refresh schedule and the subject identifiers name the wallet.
//! Decoding therefore skips signature verification on purpose.

use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;

use crate::error::WalletError;

/// Remaining validity below which a token counts as near-expiry.
///
/// Must stay well under the token's total validity window so a refresh
/// lands before expiry even with one failed attempt in between.
pub const REFRESH_LOW_WATER: Duration = Duration::from_secs(120);

/// Claims embedded in the wallet session token.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionClaims {
    /// Expiration timestamp (epoch seconds).
    #[serde(default)]
    pub exp: i64,
    /// Issued-at timestamp (epoch seconds).
    #[serde(default)]
    pub iat: i64,
    /// On-ledger address of the user's contract wallet.
    #[serde(default)]
    pub contract_address: String,
    /// Identifier of the passkey credential backing the session.
    #[serde(default)]
    pub credential_id: String,
}

impl SessionClaims {
    /// Seconds of validity left at `now` (negative once expired).
    pub fn remaining(&self, now: i64) -> i64 {
        self.exp - now
    }

    /// Whether the token is expired at `now`.
    pub fn is_expired(&self, now: i64) -> bool {
        self.remaining(now) <= 0
    }

    /// Whether the token should be refreshed at `now`: still valid but
    /// under the low-water mark.
    pub fn needs_refresh(&self, now: i64) -> bool {
        !self.is_expired(now) && self.remaining(now) < REFRESH_LOW_WATER.as_secs() as i64
    }
}

/// Decode the session token payload without signature verification.
///
/// Expiry is evaluated by the caller against wall-clock time, not here;
/// an expired token still decodes so the lifecycle manager can take the
/// expired path deliberately.
pub fn decode(token: &str) -> Result<SessionClaims, WalletError> {
    let data = jsonwebtoken::dangerous::insecure_decode::<SessionClaims>(token)
        .map_err(|_| WalletError::MalformedToken)?;
    Ok(data.claims)
}

/// Current wall-clock time as epoch seconds.
pub fn now_epoch() -> i64 {
    Utc::now().timestamp()
}

/// Forge an unsigned JWT for tests (decode skips signature verification).
#[cfg(test)]
pub(crate) fn forge_token(exp: i64, contract_address: &str, credential_id: &str) -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    let header = r#"{"alg":"ES256","typ":"JWT"}"#;
    let claims = format!(
        r#"{{"exp":{exp},"iat":0,"contract_address":"{contract_address}","credential_id":"{credential_id}"}}"#,
    );
    format!(
        "{}.{}.fake_signature",
        URL_SAFE_NO_PAD.encode(header.as_bytes()),
        URL_SAFE_NO_PAD.encode(claims.as_bytes())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_reads_subject_identifiers() {
        let token = forge_token(2_000_000_000, "CWALLET", "cred-1");
        let claims = decode(&token).unwrap();
        assert_eq!(claims.contract_address, "CWALLET");
        assert_eq!(claims.credential_id, "cred-1");
        assert_eq!(claims.exp, 2_000_000_000);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            decode("not-a-jwt"),
            Err(WalletError::MalformedToken)
        ));
    }

    #[test]
    fn expired_token_still_decodes() {
        let token = forge_token(1, "CWALLET", "cred-1");
        let claims = decode(&token).unwrap();
        assert!(claims.is_expired(now_epoch()));
    }

    #[test]
    fn expiry_arithmetic() {
        let claims = SessionClaims {
            exp: 1_000,
            iat: 0,
            contract_address: String::new(),
            credential_id: String::new(),
        };

        // Plenty of validity left: neither expired nor near-expiry.
        assert!(!claims.is_expired(500));
        assert!(!claims.needs_refresh(500));

        // Under the low-water mark: refresh.
        let low_water = REFRESH_LOW_WATER.as_secs() as i64;
        assert!(claims.needs_refresh(1_000 - low_water + 1));

        // Exactly at expiry and beyond: expired, not refreshable.
        assert!(claims.is_expired(1_000));
        assert!(claims.is_expired(1_500));
        assert!(!claims.needs_refresh(1_500));
    }
}
