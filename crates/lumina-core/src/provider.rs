// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Identity provider contract.
//!
//! The hosted identity provider is an external collaborator. This module only
//! defines the seam the session store consumes; the production implementation
//! lives with the provider SDK binding and tests use an in-memory mock.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SessionResult;
use crate::types::{Identity, ProfileUpdate};

/// Callback invoked by the provider on every authentication state change.
pub type IdentityCallback = Arc<dyn Fn(Option<Identity>) + Send + Sync>;

// =============================================================================
// ProviderSubscription
// =============================================================================

/// Handle to an active provider state subscription.
///
/// Dropping the handle releases the subscription.
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct ProviderSubscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl ProviderSubscription {
    /// Creates a subscription that runs `release` exactly once on unsubscribe.
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Creates a subscription with nothing to release.
    pub fn noop() -> Self {
        Self { release: None }
    }

    /// Releases the subscription.
    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for ProviderSubscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for ProviderSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSubscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

// =============================================================================
// IdentityProvider
// =============================================================================

/// The hosted identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Registers a state-change callback.
    ///
    /// The provider must invoke the callback at least once with its current
    /// state (which may be `None`) after subscription.
    fn subscribe(&self, callback: IdentityCallback) -> ProviderSubscription;

    /// Signs in with email and password.
    async fn sign_in_with_password(&self, email: &str, password: &str) -> SessionResult<Identity>;

    /// Signs in through the hosted OAuth popup.
    async fn sign_in_with_oauth_popup(&self) -> SessionResult<Identity>;

    /// Creates a new account and signs it in.
    async fn create_user(&self, email: &str, password: &str) -> SessionResult<Identity>;

    /// Updates profile fields of the signed-in identity.
    async fn update_profile(&self, update: &ProfileUpdate) -> SessionResult<Identity>;

    /// Signs out.
    async fn sign_out(&self) -> SessionResult<()>;

    /// Best-effort synchronous snapshot of the signed-in identity.
    fn current_identity(&self) -> Option<Identity>;

    /// Returns a fresh bearer token for API calls, `None` when signed out.
    async fn id_token(&self) -> SessionResult<Option<String>>;

    /// Provider name for logging.
    fn name(&self) -> &str {
        "identity-provider"
    }
}

// =============================================================================
// Tests
// =============================================================================
