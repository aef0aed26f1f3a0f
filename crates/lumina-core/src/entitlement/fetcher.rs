// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Shared per-email entitlement cache.
//!
//! One fetcher is shared by every route guard. Entries are keyed by email and
//! stay fresh for the lifetime of the session unless explicitly invalidated.
//!
//! # Request Lifecycle
//!
//! ```text
//!   ensure(email) ──▶ loading=true, request #n spawned
//!                            │
//!                 api.fetch_user(email) (optional timeout)
//!                            │
//!                            ▼
//!   settle(#n) ── entry superseded? ──────────────▶ dropped
//!              ── newer fetch for other email? ───▶ discarded, entry unresolved
//!              ── Ok(record) / NotFound ──────────▶ resolved, fresh
//!              ── Err(_) ─────────────────────────▶ resolved, absent role/tier
//! ```
//!
//! Failed fetches are not retried here. The next `ensure` for the email
//! (a later navigation) starts a new request.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::api::{EntitlementApi, UserRecord};
use crate::error::{EntitlementError, EntitlementResult};
use crate::optimistic::{Optimistic, PatchId};
use crate::types::{Role, Tier};

// =============================================================================
// Configuration
// =============================================================================

/// Entitlement fetcher settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntitlementConfig {
    /// Upper bound for one fetch. `None` waits indefinitely.
    ///
    /// An elapsed timeout settles like any other failure: least privilege.
    pub fetch_timeout: Option<Duration>,
}

impl EntitlementConfig {
    /// Sets the fetch timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }
}

// =============================================================================
// Snapshots
// =============================================================================

/// Point-in-time view of the entitlement for one email.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntitlementSnapshot {
    /// Email this snapshot describes.
    pub email: Option<String>,
    /// Resolved role; `None` when unknown or the fetch failed.
    pub role: Option<Role>,
    /// Resolved tier, including any optimistic patch.
    pub tier: Option<Tier>,
    /// `true` while a fetch is in flight.
    pub loading: bool,
    /// `true` once a fetch for this email has settled.
    pub resolved: bool,
    /// `true` while an optimistic tier patch is outstanding.
    pub patched: bool,
    /// When the last successful fetch settled.
    pub fetched_at: Option<DateTime<Utc>>,
}

impl EntitlementSnapshot {
    /// Role for policy evaluation; absent is `User`.
    pub fn effective_role(&self) -> Role {
        self.role.unwrap_or_default()
    }

    /// Tier for policy evaluation; absent is `Explorer`.
    pub fn effective_tier(&self) -> Tier {
        self.tier.unwrap_or_default()
    }

    /// Returns `true` when this snapshot is a settled answer for `email`.
    pub fn is_settled_for(&self, email: &str) -> bool {
        self.email.as_deref() == Some(email) && self.resolved && !self.loading
    }
}

/// Handle to an optimistic tier patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierPatch {
    /// Email whose entry was patched.
    pub email: String,
    /// Patched tier.
    pub tier: Tier,
    id: PatchId,
}

// =============================================================================
// Internal State
// =============================================================================

#[derive(Debug, Default)]
struct Entry {
    role: Option<Role>,
    tier: Optimistic<Option<Tier>>,
    loading: bool,
    resolved: bool,
    fresh: bool,
    fetched_at: Option<DateTime<Utc>>,
    in_flight: Option<u64>,
}

#[derive(Debug, Default)]
struct FetcherState {
    active: Option<String>,
    entries: HashMap<String, Entry>,
    next_request: u64,
    /// Most recently started request and its email.
    latest: Option<(u64, String)>,
}

impl FetcherState {
    fn snapshot(&self, email: Option<&str>) -> EntitlementSnapshot {
        let Some(email) = email else {
            return EntitlementSnapshot::default();
        };
        match self.entries.get(email) {
            Some(entry) => EntitlementSnapshot {
                email: Some(email.to_string()),
                role: entry.role,
                tier: *entry.tier.current(),
                loading: entry.loading,
                resolved: entry.resolved,
                patched: entry.tier.is_patched(),
                fetched_at: entry.fetched_at,
            },
            None => EntitlementSnapshot {
                email: Some(email.to_string()),
                ..EntitlementSnapshot::default()
            },
        }
    }
}

// =============================================================================
// EntitlementFetcher
// =============================================================================

/// Per-email role/tier cache backed by an [`EntitlementApi`].
pub struct EntitlementFetcher {
    api: Arc<dyn EntitlementApi>,
    config: EntitlementConfig,
    state: Mutex<FetcherState>,
    changes: watch::Sender<EntitlementSnapshot>,
}

impl EntitlementFetcher {
    /// Creates a fetcher with an empty cache.
    pub fn new(api: Arc<dyn EntitlementApi>, config: EntitlementConfig) -> Self {
        let (changes, _) = watch::channel(EntitlementSnapshot::default());
        Self {
            api,
            config,
            state: Mutex::new(FetcherState::default()),
            changes,
        }
    }

    /// Returns the fetcher configuration.
    pub fn config(&self) -> &EntitlementConfig {
        &self.config
    }

    /// Returns a receiver notified on every cache change.
    ///
    /// The value is the snapshot of the active email.
    pub fn subscribe(&self) -> watch::Receiver<EntitlementSnapshot> {
        self.changes.subscribe()
    }

    /// Email whose entitlement is currently active.
    pub fn active_email(&self) -> Option<String> {
        self.state.lock().active.clone()
    }

    /// Switches the active email. Returns `true` if it changed.
    pub fn set_active_email(&self, email: Option<String>) -> bool {
        let mut state = self.state.lock();
        if state.active == email {
            return false;
        }
        debug!(from = ?state.active, to = ?email, "Active entitlement email changed");
        state.active = email;
        self.publish(&state);
        true
    }

    /// Snapshot of the active email.
    pub fn snapshot(&self) -> EntitlementSnapshot {
        let state = self.state.lock();
        state.snapshot(state.active.as_deref())
    }

    /// Snapshot of a specific email.
    pub fn snapshot_for(&self, email: Option<&str>) -> EntitlementSnapshot {
        self.state.lock().snapshot(email)
    }

    /// Returns `true` if the cached entry for `email` needs no refetch.
    pub fn is_fresh(&self, email: &str) -> bool {
        self.state
            .lock()
            .entries
            .get(email)
            .is_some_and(|e| e.fresh)
    }

    // =========================================================================
    // Fetching
    // =========================================================================

    /// Starts a fetch for `email` unless the entry is fresh or already loading.
    ///
    /// Returns `true` if a request was started. Must be called within a
    /// tokio runtime.
    pub fn ensure(self: &Arc<Self>, email: &str) -> bool {
        let request = {
            let mut state = self.state.lock();
            state.next_request += 1;
            let request = state.next_request;

            let entry = state.entries.entry(email.to_string()).or_default();
            if entry.loading || entry.fresh {
                return false;
            }
            entry.loading = true;
            entry.in_flight = Some(request);

            state.latest = Some((request, email.to_string()));
            self.publish(&state);
            request
        };

        debug!(email, request, api = self.api.name(), "Entitlement fetch started");
        let this = Arc::clone(self);
        let email = email.to_string();
        tokio::spawn(async move {
            let result = this.request(&email).await;
            this.settle(&email, request, result);
        });
        true
    }

    /// Resolves the entitlement for `email`.
    ///
    /// `None` is a no-op that returns the empty snapshot. A fresh entry is
    /// returned without a network call; concurrent callers share one request.
    pub async fn fetch(self: &Arc<Self>, email: Option<&str>) -> EntitlementSnapshot {
        let Some(email) = email else {
            return EntitlementSnapshot::default();
        };

        let mut rx = self.changes.subscribe();
        self.ensure(email);
        loop {
            let snapshot = self.snapshot_for(Some(email));
            if !snapshot.loading {
                return snapshot;
            }
            if rx.changed().await.is_err() {
                return self.snapshot_for(Some(email));
            }
        }
    }

    /// Marks the entry for `email` stale so the next `ensure` refetches it.
    pub fn invalidate(&self, email: &str) {
        if let Some(entry) = self.state.lock().entries.get_mut(email) {
            entry.fresh = false;
            debug!(email, "Entitlement invalidated");
        }
    }

    async fn request(&self, email: &str) -> EntitlementResult<UserRecord> {
        match self.config.fetch_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.api.fetch_user(email)).await {
                Ok(result) => result,
                Err(_) => Err(EntitlementError::timeout(limit)),
            },
            None => self.api.fetch_user(email).await,
        }
    }

    fn settle(&self, email: &str, request: u64, result: EntitlementResult<UserRecord>) {
        let mut state = self.state.lock();

        // A response for the active email is never stale, even when another
        // email was fetched while it was in flight.
        let is_active = state.active.as_deref() == Some(email);
        let superseded_by_other = !is_active
            && state
                .latest
                .as_ref()
                .is_some_and(|(latest, latest_email)| *latest > request && latest_email != email);

        let Some(entry) = state.entries.get_mut(email) else {
            return;
        };
        if entry.in_flight != Some(request) {
            debug!(email, request, "Entitlement response superseded by a newer request");
            return;
        }
        entry.in_flight = None;
        entry.loading = false;

        if superseded_by_other {
            warn!(email, request, "Discarding stale entitlement response");
            self.publish(&state);
            return;
        }

        match result {
            Ok(record) => {
                entry.role = record.role();
                entry.tier.reconcile(Some(record.tier()));
                entry.resolved = true;
                entry.fresh = true;
                entry.fetched_at = Some(Utc::now());
                info!(
                    email,
                    role = ?entry.role,
                    tier = ?entry.tier.confirmed(),
                    "Entitlement resolved"
                );
            }
            Err(e) if e.is_not_found() => {
                entry.role = None;
                entry.tier.reconcile(Some(Tier::least_privileged()));
                entry.resolved = true;
                entry.fresh = true;
                entry.fetched_at = Some(Utc::now());
                info!(email, "No entitlement record yet, using defaults");
            }
            Err(e) => {
                entry.role = None;
                entry.tier.set_confirmed(None);
                entry.resolved = true;
                entry.fresh = false;
                warn!(email, error = %e, "Entitlement fetch failed, using least privilege");
            }
        }

        self.publish(&state);
    }

    // =========================================================================
    // Optimistic Tier
    // =========================================================================

    /// Overwrites the tier of the active email without a network round-trip.
    ///
    /// The loading flag is left as is. Returns `None` when no email is active.
    pub fn apply_optimistic_tier(&self, tier: Tier) -> Option<TierPatch> {
        let mut state = self.state.lock();
        let email = state.active.clone()?;

        let entry = state.entries.entry(email.clone()).or_default();
        let id = entry.tier.apply(Some(tier));
        info!(email = %email, %tier, "Optimistic tier applied");

        self.publish(&state);
        Some(TierPatch { email, tier, id })
    }

    /// Overwrites the cached tier of `email`, active or not.
    ///
    /// Returns `None` when nothing is cached for `email`, since the next
    /// fetch reads the backend anyway.
    pub fn apply_optimistic_tier_for(&self, email: &str, tier: Tier) -> Option<TierPatch> {
        let mut state = self.state.lock();
        let id = state.entries.get_mut(email)?.tier.apply(Some(tier));
        info!(email, %tier, "Optimistic tier applied");

        if state.active.as_deref() == Some(email) {
            self.publish(&state);
        }
        Some(TierPatch {
            email: email.to_string(),
            tier,
            id,
        })
    }

    /// Confirms a tier patch as the known value until the next fetch.
    pub fn commit_tier(&self, patch: &TierPatch) -> bool {
        let mut state = self.state.lock();
        let committed = state
            .entries
            .get_mut(&patch.email)
            .is_some_and(|e| e.tier.commit(patch.id));
        if committed {
            self.publish(&state);
        }
        committed
    }

    /// Rolls back a tier patch after the backing mutation failed.
    pub fn rollback_tier(&self, patch: &TierPatch) -> bool {
        let mut state = self.state.lock();
        let rolled_back = state
            .entries
            .get_mut(&patch.email)
            .is_some_and(|e| e.tier.rollback(patch.id));
        if rolled_back {
            warn!(email = %patch.email, tier = %patch.tier, "Optimistic tier rolled back");
            self.publish(&state);
        }
        rolled_back
    }

    fn publish(&self, state: &FetcherState) {
        self.changes
            .send_replace(state.snapshot(state.active.as_deref()));
    }
}

/// Rolls a tier patch back on drop unless it was committed first.
pub(crate) struct PendingTier<'a> {
    fetcher: &'a EntitlementFetcher,
    patch: Option<TierPatch>,
}

impl<'a> PendingTier<'a> {
    pub(crate) fn new(fetcher: &'a EntitlementFetcher, patch: Option<TierPatch>) -> Self {
        Self { fetcher, patch }
    }

    pub(crate) fn commit(mut self) -> bool {
        self.patch
            .take()
            .is_some_and(|patch| self.fetcher.commit_tier(&patch))
    }
}

impl Drop for PendingTier<'_> {
    fn drop(&mut self) {
        if let Some(patch) = self.patch.take() {
            self.fetcher.rollback_tier(&patch);
        }
    }
}

impl fmt::Debug for EntitlementFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("EntitlementFetcher")
            .field("api", &self.api.name())
            .field("active", &state.active)
            .field("entries", &state.entries.len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
