// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Lifecycle Manager
//!
//! Owns the durable session record and the state machine around it:
//! restore on startup, establish on login, periodic refresh while active,
//! and a single broadcast expiry signal when the session dies.
//!
//! ## Refresh loop
//!
//! A background task re-evaluates token validity every [`REFRESH_TICK`]
//! while a session exists. When remaining validity drops under the
//! low-water mark the refresh endpoint is called with the current token
//! and the new token is swapped in, preserving the non-token fields of
//! the persisted record. The loop stops on logout, expiry, or
//! cancellation, and an atomic busy flag prevents overlapping refresh
//! calls. Spawn it like the other background tasks:
//!
//! ```rust,ignore
//! tokio::spawn(async move { manager.run_refresh_loop(&client, shutdown).await });
//! ```
//!
//! ## Expiry signal
//!
//! Any component detecting expiry (a 401, or local clock arithmetic)
//! raises [`ExpirySignal`]; the signal latches and broadcasts exactly once
//! per expiry event, so multiple deliveries cannot cause duplicate logout
//! side effects. Establishing a new session re-arms it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::WalletError;
use crate::models::{PersistedSession, WalletSession};
use crate::store::SessionStore;

use super::claims::{self, SessionClaims};

/// Interval between validity re-evaluations. Substantially shorter than
/// [`super::REFRESH_LOW_WATER`] so a near-expiry token is seen in time.
pub const REFRESH_TICK: Duration = Duration::from_secs(30);

/// Events broadcast by the session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The session expired; consumers should drop authenticated state.
    Expired,
}

/// Refresh leg of the platform API, kept narrow so the loop is testable.
#[allow(async_fn_in_trait)]
pub trait TokenRefresher {
    /// Exchange the current token for a fresh one.
    async fn refresh_token(&self, token: &str) -> Result<String, WalletError>;
}

// =============================================================================
// ExpirySignal
// =============================================================================

/// Latched, broadcastable session-expiry signal.
///
/// `raise` is idempotent: the first call per expiry event broadcasts
/// [`SessionEvent::Expired`], later calls are no-ops until `reset`.
#[derive(Debug, Clone)]
pub struct ExpirySignal {
    fired: Arc<AtomicBool>,
    tx: broadcast::Sender<SessionEvent>,
}

impl ExpirySignal {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self {
            fired: Arc::new(AtomicBool::new(false)),
            tx,
        }
    }

    /// Subscribe to expiry events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Raise the signal. Returns true if this call fired the broadcast.
    pub fn raise(&self) -> bool {
        if self.fired.swap(true, Ordering::SeqCst) {
            return false;
        }
        // Send fails only when no receiver is subscribed; the latch alone
        // is enough for late subscribers to observe the state.
        let _ = self.tx.send(SessionEvent::Expired);
        true
    }

    /// Whether the signal has fired since the last reset.
    pub fn is_raised(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Re-arm the signal for a new session.
    pub fn reset(&self) {
        self.fired.store(false, Ordering::SeqCst);
    }
}

impl Default for ExpirySignal {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SessionManager
// =============================================================================

/// Session lifecycle manager over a persisted session store.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    signal: ExpirySignal,
    refreshing: AtomicBool,
    token_refreshed: AtomicBool,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            signal: ExpirySignal::new(),
            refreshing: AtomicBool::new(false),
            token_refreshed: AtomicBool::new(false),
        }
    }

    /// The expiry signal, for sharing with clients that detect 401s.
    pub fn signal(&self) -> &ExpirySignal {
        &self.signal
    }

    /// Subscribe to session expiry events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.signal.subscribe()
    }

    /// Establish a new session from a freshly issued token.
    ///
    /// Replaces whatever the store held and re-arms the expiry signal.
    pub fn establish(&self, token: &str) -> Result<WalletSession, WalletError> {
        let session_claims = claims::decode(token)?;
        let persisted = PersistedSession::with_token(token);
        self.store.save(&persisted)?;
        self.signal.reset();
        self.token_refreshed.store(false, Ordering::SeqCst);
        info!(
            contract_address = %session_claims.contract_address,
            "wallet session established"
        );
        Ok(self.snapshot_from(&persisted, &session_claims, claims::now_epoch(), false))
    }

    /// Restore the session from the store at startup.
    ///
    /// An already-expired token takes the expired path immediately: the
    /// store is purged, the signal raised, and the returned snapshot
    /// carries the sticky `is_session_expired` flag. No refresh call is
    /// attempted.
    pub fn restore(&self) -> Result<Option<WalletSession>, WalletError> {
        let Some(persisted) = self.store.load()? else {
            return Ok(None);
        };

        let session_claims = match claims::decode(&persisted.token) {
            Ok(c) => c,
            Err(_) => {
                warn!("persisted session token is malformed; discarding");
                self.store.clear()?;
                return Ok(None);
            }
        };

        let now = claims::now_epoch();
        if session_claims.is_expired(now) {
            self.expire()?;
        }
        Ok(Some(self.snapshot_from(&persisted, &session_claims, now, false)))
    }

    /// Current session snapshot, if any. Read-only; no side effects.
    pub fn snapshot(&self) -> Result<Option<WalletSession>, WalletError> {
        let Some(persisted) = self.store.load()? else {
            return Ok(None);
        };
        let session_claims = claims::decode(&persisted.token)?;
        Ok(Some(self.snapshot_from(
            &persisted,
            &session_claims,
            claims::now_epoch(),
            self.token_refreshed.load(Ordering::SeqCst),
        )))
    }

    /// Explicit logout: drop the durable session.
    pub fn logout(&self) -> Result<(), WalletError> {
        info!("wallet session logged out");
        self.token_refreshed.store(false, Ordering::SeqCst);
        self.store.clear()
    }

    /// Take the expired path: purge the store and raise the signal once.
    pub fn expire(&self) -> Result<(), WalletError> {
        self.store.clear()?;
        if self.signal.raise() {
            info!("wallet session expired");
        }
        Ok(())
    }

    /// Remember the asset picked before receiver verification completed.
    pub fn set_pending_asset(&self, asset: Option<&str>) -> Result<(), WalletError> {
        self.update_persisted(|session| {
            session.pending_asset = asset.map(str::to_string);
        })
    }

    /// Consume the remembered pending asset, if any.
    pub fn take_pending_asset(&self) -> Result<Option<String>, WalletError> {
        let Some(mut persisted) = self.store.load()? else {
            return Ok(None);
        };
        let asset = persisted.pending_asset.take();
        if asset.is_some() {
            self.store.save(&persisted)?;
        }
        Ok(asset)
    }

    /// Record whether receiver verification is still outstanding.
    pub fn set_verification_pending(&self, pending: bool) -> Result<(), WalletError> {
        self.update_persisted(|session| {
            session.is_verification_pending = pending;
        })
    }

    /// Run the refresh loop until cancellation, logout, or expiry.
    pub async fn run_refresh_loop<R: TokenRefresher>(&self, api: &R, shutdown: CancellationToken) {
        info!(
            tick_secs = REFRESH_TICK.as_secs(),
            "session refresh loop starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("session refresh loop shutting down");
                return;
            }

            if !self.refresh_step(api).await {
                info!("session refresh loop stopping: no active session");
                return;
            }

            tokio::select! {
                _ = tokio::time::sleep(REFRESH_TICK) => {},
                _ = shutdown.cancelled() => {
                    info!("session refresh loop shutting down");
                    return;
                }
            }
        }
    }

    /// One validity re-evaluation. Returns false when the loop should stop.
    async fn refresh_step<R: TokenRefresher>(&self, api: &R) -> bool {
        if self.signal.is_raised() {
            // Expiry was detected elsewhere (e.g. a 401); purge and stop.
            if let Err(e) = self.store.clear() {
                warn!(error = %e, "failed to purge expired session");
            }
            return false;
        }

        let persisted = match self.store.load() {
            Ok(Some(persisted)) => persisted,
            Ok(None) => return false,
            Err(e) => {
                warn!(error = %e, "session store read failed");
                return true;
            }
        };

        let session_claims = match claims::decode(&persisted.token) {
            Ok(c) => c,
            Err(_) => {
                warn!("session token is malformed; expiring session");
                let _ = self.expire();
                return false;
            }
        };

        let now = claims::now_epoch();
        if session_claims.is_expired(now) {
            let _ = self.expire();
            return false;
        }

        if session_claims.needs_refresh(now) {
            if self.refreshing.swap(true, Ordering::SeqCst) {
                // A refresh is already in flight; skip this tick.
                return true;
            }
            let result = api.refresh_token(&persisted.token).await;
            self.refreshing.store(false, Ordering::SeqCst);

            match result {
                Ok(new_token) => {
                    let swapped = PersistedSession {
                        token: new_token,
                        ..persisted
                    };
                    if let Err(e) = self.store.save(&swapped) {
                        warn!(error = %e, "failed to persist refreshed token");
                    } else {
                        self.token_refreshed.store(true, Ordering::SeqCst);
                        info!("session token refreshed");
                    }
                }
                Err(WalletError::SessionExpired) => {
                    let _ = self.expire();
                    return false;
                }
                Err(e) => {
                    // Transient failure; the next tick retries.
                    warn!(error = %e, "session token refresh failed");
                }
            }
        }

        true
    }

    fn update_persisted(
        &self,
        mutate: impl FnOnce(&mut PersistedSession),
    ) -> Result<(), WalletError> {
        let Some(mut persisted) = self.store.load()? else {
            return Err(WalletError::SessionExpired);
        };
        mutate(&mut persisted);
        self.store.save(&persisted)
    }

    fn snapshot_from(
        &self,
        persisted: &PersistedSession,
        session_claims: &SessionClaims,
        now: i64,
        is_token_refresh: bool,
    ) -> WalletSession {
        let expired = session_claims.is_expired(now) || self.signal.is_raised();
        let contract_address = session_claims.contract_address.clone();
        WalletSession {
            is_authenticated: !expired
                && !persisted.token.is_empty()
                && !contract_address.is_empty(),
            token: persisted.token.clone(),
            contract_address,
            credential_id: session_claims.credential_id.clone(),
            is_session_expired: expired,
            is_token_refresh,
            is_verification_pending: persisted.is_verification_pending,
            pending_asset: persisted.pending_asset.clone(),
        }
    }
}
