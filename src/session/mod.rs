// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session lifecycle: token claims, expiry signalling, and the
//! background refresh loop.

pub mod claims;
pub mod manager;

pub use claims::{SessionClaims, REFRESH_LOW_WATER};
pub use manager::{ExpirySignal, SessionEvent, SessionManager, TokenRefresher, REFRESH_TICK};
