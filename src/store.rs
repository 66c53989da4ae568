// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persisted session store backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `session`: fixed key → JSON-serialized [`PersistedSession`]
//!
//! The store holds at most one session at a time; writes are
//! last-write-wins. Components read the store fresh at the start of every
//! authenticated call, so a token refreshed mid-flight is picked up by the
//! next call.
//!
//! Earlier releases persisted the bare token string under the same key;
//! such values are still read and rewritten in the current format on load.

use std::path::Path;
use std::sync::Mutex;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use crate::config::{env_or_default, SESSION_DB_PATH_ENV};
use crate::error::WalletError;
use crate::models::PersistedSession;

/// Session table: fixed key → JSON-serialized record.
const SESSION: TableDefinition<&str, &str> = TableDefinition::new("session");

/// The single key under which the wallet session is stored.
const SESSION_KEY: &str = "wallet_session";

/// Default database filename when `SESSION_DB_PATH` is unset.
const DEFAULT_DB_PATH: &str = "wallet-session.redb";

/// Durable key/value abstraction over the wallet session record.
///
/// The store exclusively owns the durable representation; consumers hold
/// read-only snapshots refreshed on each lifecycle event.
pub trait SessionStore: Send + Sync {
    /// Load the current session record, if one exists.
    fn load(&self) -> Result<Option<PersistedSession>, WalletError>;

    /// Replace the session record wholesale.
    fn save(&self, session: &PersistedSession) -> Result<(), WalletError>;

    /// Remove the session record.
    fn clear(&self) -> Result<(), WalletError>;
}

// =============================================================================
// RedbSessionStore
// =============================================================================

/// Durable session store on an embedded redb database.
pub struct RedbSessionStore {
    db: Database,
}

impl RedbSessionStore {
    /// Open (or create) the session database at the given path.
    pub fn open(path: &Path) -> Result<Self, WalletError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path).map_err(storage_err)?;

        // Pre-create the table so later read transactions don't fail
        let write_txn = db.begin_write().map_err(storage_err)?;
        {
            let _ = write_txn.open_table(SESSION).map_err(storage_err)?;
        }
        write_txn.commit().map_err(storage_err)?;

        Ok(Self { db })
    }

    /// Open the database at the path configured by `SESSION_DB_PATH`.
    pub fn from_env() -> Result<Self, WalletError> {
        let path = env_or_default(SESSION_DB_PATH_ENV, DEFAULT_DB_PATH);
        Self::open(Path::new(&path))
    }

    fn read_raw(&self) -> Result<Option<String>, WalletError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(SESSION).map_err(storage_err)?;
        let value = table
            .get(SESSION_KEY)
            .map_err(storage_err)?
            .map(|guard| guard.value().to_string());
        Ok(value)
    }

    fn write_raw(&self, value: &str) -> Result<(), WalletError> {
        let write_txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut table = write_txn.open_table(SESSION).map_err(storage_err)?;
            table.insert(SESSION_KEY, value).map_err(storage_err)?;
        }
        write_txn.commit().map_err(storage_err)?;
        Ok(())
    }
}

impl SessionStore for RedbSessionStore {
    fn load(&self) -> Result<Option<PersistedSession>, WalletError> {
        let Some(raw) = self.read_raw()? else {
            return Ok(None);
        };

        match serde_json::from_str::<PersistedSession>(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(_) => {
                // Legacy format: the bare token string. Upgrade in place.
                let upgraded = PersistedSession::with_token(raw);
                self.save(&upgraded)?;
                Ok(Some(upgraded))
            }
        }
    }

    fn save(&self, session: &PersistedSession) -> Result<(), WalletError> {
        let json = serde_json::to_string(session).map_err(storage_err)?;
        self.write_raw(&json)
    }

    fn clear(&self) -> Result<(), WalletError> {
        let write_txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut table = write_txn.open_table(SESSION).map_err(storage_err)?;
            table.remove(SESSION_KEY).map_err(storage_err)?;
        }
        write_txn.commit().map_err(storage_err)?;
        Ok(())
    }
}

fn storage_err(e: impl std::fmt::Display) -> WalletError {
    WalletError::Storage(e.to_string())
}

// =============================================================================
// MemorySessionStore
// =============================================================================

/// In-memory session store for tests and short-lived embedders.
#[derive(Default)]
pub struct MemorySessionStore {
    inner: Mutex<Option<PersistedSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<PersistedSession>, WalletError> {
        Ok(self.inner.lock().expect("session store poisoned").clone())
    }

    fn save(&self, session: &PersistedSession) -> Result<(), WalletError> {
        *self.inner.lock().expect("session store poisoned") = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), WalletError> {
        *self.inner.lock().expect("session store poisoned") = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_session() -> PersistedSession {
        PersistedSession {
            token: "eyJ.fake.token".into(),
            is_verification_pending: true,
            pending_asset: Some("USDC".into()),
        }
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemorySessionStore::new();
        assert!(store.load().unwrap().is_none());

        store.save(&sample_session()).unwrap();
        assert_eq!(store.load().unwrap().unwrap(), sample_session());

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn redb_store_round_trips_through_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.redb");

        {
            let store = RedbSessionStore::open(&path).unwrap();
            store.save(&sample_session()).unwrap();
        }

        let store = RedbSessionStore::open(&path).unwrap();
        assert_eq!(store.load().unwrap().unwrap(), sample_session());

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn legacy_plain_token_upgrades_on_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.redb");

        let store = RedbSessionStore::open(&path).unwrap();
        store.write_raw("legacy-raw-token").unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.token, "legacy-raw-token");
        assert!(!loaded.is_verification_pending);

        // The record was rewritten in the current JSON format.
        let raw = store.read_raw().unwrap().unwrap();
        assert!(raw.starts_with('{'), "expected upgraded JSON, got {raw}");
    }
}
