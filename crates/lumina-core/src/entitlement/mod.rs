// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Entitlement resolution: email → role and subscription tier.
//!
//! This module provides:
//! - The backend contract (`EntitlementApi`) and its wire record
//! - The shared per-email cache and fetcher (`EntitlementFetcher`)
//! - Fetcher configuration

mod api;
mod fetcher;

pub use api::{EntitlementApi, UserRecord};
pub use fetcher::{EntitlementConfig, EntitlementFetcher, EntitlementSnapshot, TierPatch};
pub(crate) use fetcher::PendingTier;
