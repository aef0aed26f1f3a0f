// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Access context: the explicitly constructed owner of the shared stores.
//!
//! One context per application. It owns the session store, the entitlement
//! cache and the route table, and hands out guards that read them.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::entitlement::{EntitlementApi, EntitlementConfig, EntitlementFetcher};
use crate::guard::RouteGuard;
use crate::policy::RouteRequirement;
use crate::provider::IdentityProvider;
use crate::routes::RouteTable;
use crate::session::SessionStore;

/// Missing builder inputs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContextError {
    /// No identity provider was supplied.
    #[error("Access context requires an identity provider")]
    MissingIdentityProvider,

    /// No entitlement backend was supplied.
    #[error("Access context requires an entitlement API")]
    MissingEntitlementApi,
}

// =============================================================================
// AccessContext
// =============================================================================

/// Owner of the session store, entitlement cache and route table.
pub struct AccessContext {
    session: Arc<SessionStore>,
    entitlements: Arc<EntitlementFetcher>,
    routes: Arc<RouteTable>,
    tracker: Mutex<Option<JoinHandle<()>>>,
}

impl AccessContext {
    /// Returns a builder.
    pub fn builder() -> AccessContextBuilder {
        AccessContextBuilder::default()
    }

    /// Subscribes the session store and starts tracking the signed-in email.
    ///
    /// Every email change switches the active entitlement and starts its
    /// fetch. Calling `start` twice is a no-op. Must be called within a tokio
    /// runtime.
    pub fn start(&self) {
        let mut tracker = self.tracker.lock();
        if tracker.is_some() {
            return;
        }
        self.session.initialize();

        let mut rx = self.session.subscribe();
        let entitlements = Arc::clone(&self.entitlements);
        *tracker = Some(tokio::spawn(async move {
            let mut last: Option<String> = None;
            loop {
                let email = rx.borrow_and_update().email().map(str::to_string);
                if email != last {
                    debug!(email = email.as_deref(), "Signed-in email changed");
                    entitlements.set_active_email(email.clone());
                    if let Some(email) = email.as_deref() {
                        entitlements.ensure(email);
                    }
                    last = email;
                }
                if rx.changed().await.is_err() {
                    break;
                }
            }
        }));
        info!(routes = self.routes.len(), "Access context started");
    }

    /// Stops email tracking and releases the provider subscription.
    pub fn dispose(&self) {
        if let Some(tracker) = self.tracker.lock().take() {
            tracker.abort();
        }
        self.session.dispose();
        info!("Access context disposed");
    }

    /// Returns `true` between `start` and `dispose`.
    pub fn is_started(&self) -> bool {
        self.tracker.lock().is_some()
    }

    /// The shared session store.
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// The shared entitlement cache.
    pub fn entitlements(&self) -> &Arc<EntitlementFetcher> {
        &self.entitlements
    }

    /// The route table.
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Mounts a guard for `path` using the route table.
    ///
    /// Unlisted paths get a guard that allows immediately.
    pub fn guard(&self, path: &str) -> RouteGuard {
        let requirements = self.routes.requirements_for(path).to_vec();
        self.guard_with(path, requirements)
    }

    /// Mounts a guard with explicit requirements.
    pub fn guard_with(&self, path: &str, requirements: Vec<RouteRequirement>) -> RouteGuard {
        RouteGuard::mount(
            &self.session,
            Arc::clone(&self.entitlements),
            path,
            requirements,
        )
    }
}

impl Drop for AccessContext {
    fn drop(&mut self) {
        if let Some(tracker) = self.tracker.get_mut().take() {
            tracker.abort();
        }
    }
}

impl fmt::Debug for AccessContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessContext")
            .field("session", &self.session)
            .field("entitlements", &self.entitlements)
            .field("routes", &self.routes.len())
            .field("started", &self.is_started())
            .finish()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`AccessContext`].
#[derive(Default)]
pub struct AccessContextBuilder {
    provider: Option<Arc<dyn IdentityProvider>>,
    session: Option<Arc<SessionStore>>,
    api: Option<Arc<dyn EntitlementApi>>,
    routes: Option<RouteTable>,
    config: EntitlementConfig,
}

impl AccessContextBuilder {
    /// Sets the identity provider.
    pub fn identity_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Uses an existing session store instead of creating one.
    ///
    /// Takes precedence over [`identity_provider`](Self::identity_provider).
    /// API clients that sign out on `401` share this store.
    pub fn session_store(mut self, session: Arc<SessionStore>) -> Self {
        self.session = Some(session);
        self
    }

    /// Sets the entitlement backend.
    pub fn entitlement_api(mut self, api: Arc<dyn EntitlementApi>) -> Self {
        self.api = Some(api);
        self
    }

    /// Sets the route table. Defaults to [`RouteTable::standard`].
    pub fn routes(mut self, routes: RouteTable) -> Self {
        self.routes = Some(routes);
        self
    }

    /// Sets the entitlement fetcher configuration.
    pub fn entitlement_config(mut self, config: EntitlementConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the context. Call [`AccessContext::start`] afterwards.
    pub fn build(self) -> Result<AccessContext, ContextError> {
        let session = match (self.session, self.provider) {
            (Some(session), _) => session,
            (None, Some(provider)) => Arc::new(SessionStore::new(provider)),
            (None, None) => return Err(ContextError::MissingIdentityProvider),
        };
        let api = self.api.ok_or(ContextError::MissingEntitlementApi)?;

        Ok(AccessContext {
            session,
            entitlements: Arc::new(EntitlementFetcher::new(api, self.config)),
            routes: Arc::new(self.routes.unwrap_or_else(RouteTable::standard)),
            tracker: Mutex::new(None),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
