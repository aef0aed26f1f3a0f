// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Admin user management.
//!
//! Role and status changes patch the loaded user list and the shared
//! entitlement cache before the backend answers. Success commits both and
//! marks the target's entitlement stale; failure or cancellation rolls both
//! back.
//!
//! A role change also moves the tier: promoting to `admin` grants `creator`,
//! demoting to `user` drops to `explorer`.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::entitlement::{EntitlementFetcher, PendingTier, UserRecord};
use crate::error::MutationResult;
use crate::optimistic::{Optimistic, PatchId};
use crate::types::{Role, Tier};

/// Rows per page of the user list.
pub const USERS_PAGE_LIMIT: u32 = 20;

/// Wire value of a disabled account's `user_status`.
pub const DISABLED_STATUS: &str = "disabled";

/// Account status as stored in `user_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserStatus {
    /// Enabled account on a tier.
    Active(Tier),
    /// Disabled by an admin.
    Disabled,
}

impl UserStatus {
    /// Wire value.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active(tier) => tier.as_str(),
            UserStatus::Disabled => DISABLED_STATUS,
        }
    }

    /// Maps a `user_status` field. Absent or unknown is `explorer`.
    pub fn from_wire(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case(DISABLED_STATUS) => UserStatus::Disabled,
            other => UserStatus::Active(Tier::from_wire(other)),
        }
    }

    /// Tier the account is entitled to. Disabled accounts get the least.
    pub fn tier(&self) -> Tier {
        match self {
            UserStatus::Active(tier) => *tier,
            UserStatus::Disabled => Tier::least_privileged(),
        }
    }

    /// Status after the admin toggle: disabled accounts come back as
    /// `explorer`, anything else is disabled.
    pub fn toggled(&self) -> Self {
        match self {
            UserStatus::Disabled => UserStatus::Active(Tier::Explorer),
            UserStatus::Active(_) => UserStatus::Disabled,
        }
    }

    /// Returns `true` for disabled accounts.
    pub fn is_disabled(&self) -> bool {
        matches!(self, UserStatus::Disabled)
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role and tier after the admin role toggle.
pub fn role_change(current: Role) -> (Role, Tier) {
    match current {
        Role::User => (Role::Admin, Tier::Creator),
        Role::Admin => (Role::User, Tier::Explorer),
    }
}

/// Query of `GET /admin/users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserQuery {
    /// Page, starting at 1.
    pub page: u32,
    /// Rows per page.
    pub limit: u32,
    /// Name or email search.
    #[serde(default)]
    pub search: String,
}

impl UserQuery {
    /// First page with the default limit.
    pub fn first() -> Self {
        Self {
            page: 1,
            limit: USERS_PAGE_LIMIT,
            search: String::new(),
        }
    }

    /// Sets the page.
    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// Sets the search text.
    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }
}

impl Default for UserQuery {
    fn default() -> Self {
        Self::first()
    }
}

/// Admin endpoints.
#[async_trait]
pub trait AdminApi: Send + Sync {
    /// Lists users.
    async fn users(&self, query: &UserQuery) -> MutationResult<Vec<UserRecord>>;

    /// `POST /admin/change-role`.
    async fn change_role(&self, email: &str, role: Role) -> MutationResult<()>;

    /// `POST /admin/toggle-status`.
    async fn set_status(&self, email: &str, status: UserStatus) -> MutationResult<()>;

    /// Backend name for logging.
    fn name(&self) -> &str {
        "admin-api"
    }
}

#[derive(Debug, Default)]
struct Rows {
    order: Vec<String>,
    records: HashMap<String, Optimistic<UserRecord>>,
}

/// Rolls a row patch back on drop unless it was committed first.
struct PendingRow<'a> {
    rows: &'a Mutex<Rows>,
    email: &'a str,
    patch: Option<PatchId>,
}

impl<'a> PendingRow<'a> {
    fn apply(rows: &'a Mutex<Rows>, email: &'a str, edit: impl FnOnce(&mut UserRecord)) -> Self {
        let patch = rows.lock().records.get_mut(email).map(|cell| {
            let mut next = cell.current().clone();
            edit(&mut next);
            cell.apply(next)
        });
        Self { rows, email, patch }
    }

    fn commit(mut self) {
        if let Some(patch) = self.patch.take() {
            if let Some(cell) = self.rows.lock().records.get_mut(self.email) {
                cell.commit(patch);
            }
        }
    }
}

impl Drop for PendingRow<'_> {
    fn drop(&mut self) {
        if let Some(patch) = self.patch.take() {
            if let Some(cell) = self.rows.lock().records.get_mut(self.email) {
                cell.rollback(patch);
            }
        }
    }
}

/// Admin user list and account mutations.
pub struct AdminService {
    api: Arc<dyn AdminApi>,
    entitlements: Arc<EntitlementFetcher>,
    rows: Mutex<Rows>,
}

impl AdminService {
    /// Creates a service with an empty list.
    pub fn new(api: Arc<dyn AdminApi>, entitlements: Arc<EntitlementFetcher>) -> Self {
        Self {
            api,
            entitlements,
            rows: Mutex::new(Rows::default()),
        }
    }

    /// Replaces the list with one page of users. Returns the row count.
    pub async fn load_users(&self, query: &UserQuery) -> MutationResult<usize> {
        let users = self.api.users(query).await?;

        let mut rows = Rows::default();
        for user in users {
            let Some(email) = user.email.clone() else {
                debug!("Skipping user row without email");
                continue;
            };
            if rows.records.insert(email.clone(), Optimistic::new(user)).is_none() {
                rows.order.push(email);
            }
        }
        let count = rows.order.len();
        *self.rows.lock() = rows;
        debug!(page = query.page, count, api = self.api.name(), "Users loaded");
        Ok(count)
    }

    /// Loaded users in backend order, with pending changes applied.
    pub fn users(&self) -> Vec<UserRecord> {
        let rows = self.rows.lock();
        rows.order
            .iter()
            .filter_map(|email| rows.records.get(email))
            .map(|cell| cell.current().clone())
            .collect()
    }

    /// Loaded row for `email`.
    pub fn user(&self, email: &str) -> Option<UserRecord> {
        self.rows
            .lock()
            .records
            .get(email)
            .map(|cell| cell.current().clone())
    }

    /// Toggles the role of `email` away from `current`. Returns the new role.
    pub async fn change_role(&self, email: &str, current: Role) -> MutationResult<Role> {
        let (role, tier) = role_change(current);
        let edit = |record: &mut UserRecord| {
            record.role = Some(role.as_str().to_string());
            record.user_status = Some(tier.as_str().to_string());
        };
        self.mutate(email, edit, tier, self.api.change_role(email, role), "change_role")
            .await?;
        Ok(role)
    }

    /// Toggles `email` between disabled and enabled. Returns the new status.
    pub async fn toggle_status(&self, email: &str, current: UserStatus) -> MutationResult<UserStatus> {
        let status = current.toggled();
        let edit = |record: &mut UserRecord| {
            record.user_status = Some(status.as_str().to_string());
        };
        self.mutate(email, edit, status.tier(), self.api.set_status(email, status), "toggle_status")
            .await?;
        Ok(status)
    }

    async fn mutate<F>(
        &self,
        email: &str,
        edit: impl FnOnce(&mut UserRecord),
        tier: Tier,
        request: F,
        action: &'static str,
    ) -> MutationResult<()>
    where
        F: Future<Output = MutationResult<()>>,
    {
        let row = PendingRow::apply(&self.rows, email, edit);
        let entitlement = PendingTier::new(
            &self.entitlements,
            self.entitlements.apply_optimistic_tier_for(email, tier),
        );

        match request.await {
            Ok(()) => {
                row.commit();
                entitlement.commit();
                self.entitlements.invalidate(email);
                info!(email, action, %tier, "Admin update applied");
                Ok(())
            }
            Err(e) => {
                warn!(email, action, error = %e, "Admin update failed, rolled back");
                Err(e)
            }
        }
    }
}

impl fmt::Debug for AdminService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminService")
            .field("api", &self.api.name())
            .field("users", &self.rows.lock().order.len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
