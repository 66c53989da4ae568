// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Wallet Client - Embedded Wallet Orchestration
//!
//! This crate provides the client-side session and transaction
//! orchestration layer for the embedded wallet: passkey ceremonies,
//! session token lifecycle, wallet provisioning, sponsored transaction
//! polling, destination preflight checks, and SEP funding.
//!
//! ## Modules
//!
//! - `passkey` - Credential ceremony pipelines (WebAuthn start/finish)
//! - `session` - Token lifecycle, refresh loop, expiry signalling
//! - `platform` - Disbursement platform REST client
//! - `provisioning` - Wallet creation polling
//! - `sponsored` - Sponsored transaction submission and polling
//! - `preflight` - Destination account and trustline checks
//! - `sep` - SEP-24/45 funding chain
//! - `store` - Persisted session store (redb)

pub mod config;
pub mod error;
pub mod models;
pub mod passkey;
pub mod platform;
pub mod preflight;
pub mod provisioning;
pub mod sep;
pub mod session;
pub mod sponsored;
pub mod store;

pub use error::WalletError;
