// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # lumina-core
//!
//! Session and access-control resolution for the Lumina gallery client.
//!
//! This crate decides, for every navigation to a protected view, whether the
//! view may be shown or where the user is sent instead. It provides:
//!
//! - **Types**: `Identity`, `Role`, `Tier` and their wire parsing
//! - **Provider**: the identity provider contract and its subscription handle
//! - **Session**: the process-wide session store
//! - **Entitlement**: the per-email role/tier cache and fetcher
//! - **Policy**: the pure access policy evaluator
//! - **Guard**: the route guard state machine
//! - **Routes**: the static route requirement table
//! - **Optimistic**: local-patch-then-reconcile state cells
//! - **Engagement / Subscription / Feed**: client state built on the above
//! - **Pricing / Download / Admin**: listing prices, download gating and
//!   admin account changes
//!
//! ## Example
//!
//! ```rust,ignore
//! use lumina_core::{AccessContext, RouteTable};
//!
//! let ctx = AccessContext::builder()
//!     .identity_provider(provider)
//!     .entitlement_api(api)
//!     .routes(RouteTable::standard())
//!     .build()?;
//! ctx.start();
//!
//! let mut guard = ctx.guard("/dashboard/user-gallery/add-image");
//! match guard.outcome(|| render_upload_form()).await {
//!     Some(GuardOutcome::Render(view)) => show(view),
//!     Some(GuardOutcome::Redirect(redirect)) => navigate(redirect.to, redirect.return_path),
//!     _ => {}
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Core Modules
// =============================================================================

pub mod error;
pub mod types;
pub mod provider;

// =============================================================================
// State Modules
// =============================================================================

pub mod optimistic;
pub mod session;
pub mod entitlement;

// =============================================================================
// Access Control Modules
// =============================================================================

pub mod policy;
pub mod routes;
pub mod guard;
pub mod context;

// =============================================================================
// Client State Modules
// =============================================================================

pub mod engagement;
pub mod subscription;
pub mod feed;
pub mod pricing;
pub mod download;
pub mod admin;

#[cfg(test)]
pub(crate) mod test_support;

// =============================================================================
// Re-exports for convenience
// =============================================================================

pub use error::{
    EntitlementError, EntitlementResult, LuminaError, MutationError, MutationResult,
    PricingError, PricingResult, SessionError, SessionResult,
};
pub use types::{Credentials, Identity, ImageId, ProfileUpdate, Registration, Role, Tier, TierSet};

pub use provider::{IdentityCallback, IdentityProvider, ProviderSubscription};
pub use session::{SessionSnapshot, SessionStore};
pub use entitlement::{
    EntitlementApi, EntitlementConfig, EntitlementFetcher, EntitlementSnapshot, TierPatch,
    UserRecord,
};
pub use optimistic::{Optimistic, PatchId};

pub use policy::{
    evaluate, AccessDecision, AccessInput, Evaluation, RouteRequirement, FORBIDDEN_PATH,
    LOGIN_PATH, SUBSCRIPTION_PATH,
};
pub use routes::{RouteEntry, RouteError, RoutePattern, RouteTable};
pub use guard::{GuardHandle, GuardOutcome, GuardPhase, Redirect, RouteGuard};
pub use context::{AccessContext, AccessContextBuilder, ContextError};

pub use engagement::{EngagementApi, EngagementStore, LikeState};
pub use subscription::{
    ActivationReceipt, PaymentReceipt, PaymentRecord, SubscriptionApi, SubscriptionService,
    FREE_PLAN_TRANSACTION,
};
pub use feed::{FeedFilters, FeedPage, GalleryApi, GalleryFeed, ImageSummary};
pub use pricing::ListingPrice;
pub use download::{
    DownloadApi, DownloadDecision, DownloadRecord, DownloadService, ImageListing, Sale,
    FREE_DOWNLOAD_PATH, PURCHASE_PATH,
};
pub use admin::{role_change, AdminApi, AdminService, UserQuery, UserStatus, USERS_PAGE_LIMIT};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
