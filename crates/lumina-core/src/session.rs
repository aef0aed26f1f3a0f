// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Session store: who is signed in right now.
//!
//! The store bridges the provider's callback-based state stream into a
//! `tokio::sync::watch` cell. Every guard reads the same cell.
//!
//! # Lifecycle
//!
//! ```text
//!  new() ──▶ loading=true ──initialize()──▶ subscribed
//!                                              │ first provider callback
//!                                              ▼
//!                                   loading=false, identity=Some|None
//!                                              │
//!                                          dispose()
//!                                              ▼
//!                                         unsubscribed
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{SessionError, SessionResult};
use crate::provider::{IdentityCallback, IdentityProvider, ProviderSubscription};
use crate::types::{Credentials, Identity, ProfileUpdate, Registration};

// =============================================================================
// SessionSnapshot
// =============================================================================

/// Point-in-time view of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    /// Signed-in identity, if any.
    pub identity: Option<Identity>,
    /// `true` until the provider has delivered its first state.
    pub loading: bool,
}

impl SessionSnapshot {
    /// The initial state: nothing known yet.
    pub fn loading() -> Self {
        Self {
            identity: None,
            loading: true,
        }
    }

    /// A settled state.
    pub fn settled(identity: Option<Identity>) -> Self {
        Self {
            identity,
            loading: false,
        }
    }

    /// Email of the signed-in identity.
    pub fn email(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.email.as_str())
    }

    /// Returns `true` only when the session is settled with no identity.
    pub fn is_signed_out(&self) -> bool {
        !self.loading && self.identity.is_none()
    }
}

// =============================================================================
// SessionStore
// =============================================================================

/// Single source of truth for the signed-in identity.
pub struct SessionStore {
    provider: Arc<dyn IdentityProvider>,
    state: Arc<watch::Sender<SessionSnapshot>>,
    subscription: Mutex<Option<ProviderSubscription>>,
}

impl SessionStore {
    /// Creates a store in the loading state. Call [`initialize`](Self::initialize)
    /// to start listening to the provider.
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::loading());
        Self {
            provider,
            state: Arc::new(state),
            subscription: Mutex::new(None),
        }
    }

    /// Subscribes to the provider's state stream.
    ///
    /// Returns `false` if the store is already subscribed.
    pub fn initialize(&self) -> bool {
        let mut slot = self.subscription.lock();
        if slot.is_some() {
            debug!(provider = self.provider.name(), "Session store already initialized");
            return false;
        }

        self.state.send_modify(|s| s.loading = true);

        let state = Arc::clone(&self.state);
        let callback: IdentityCallback = Arc::new(move |identity: Option<Identity>| {
            debug!(
                email = identity.as_ref().map(|i| i.email.as_str()),
                "Identity provider state changed"
            );
            state.send_modify(|s| {
                s.identity = identity;
                s.loading = false;
            });
        });

        *slot = Some(self.provider.subscribe(callback));
        info!(provider = self.provider.name(), "Session store initialized");
        true
    }

    /// Releases the provider subscription.
    pub fn dispose(&self) {
        if let Some(subscription) = self.subscription.lock().take() {
            subscription.unsubscribe();
            info!(provider = self.provider.name(), "Session store disposed");
        }
    }

    /// Returns `true` while subscribed to the provider.
    pub fn is_initialized(&self) -> bool {
        self.subscription.lock().is_some()
    }

    /// Returns the current session state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// Returns a receiver notified on every session change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// Waits until the provider has delivered its first state.
    pub async fn settled(&self) -> SessionSnapshot {
        let mut rx = self.state.subscribe();
        let snapshot = match rx.wait_for(|s| !s.loading).await {
            Ok(snapshot) => snapshot.clone(),
            // The sender lives as long as `self`.
            Err(_) => self.snapshot(),
        };
        snapshot
    }

    /// Returns the underlying provider.
    pub fn provider(&self) -> &Arc<dyn IdentityProvider> {
        &self.provider
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Signs in. On failure the current identity is left untouched.
    pub async fn sign_in(&self, credentials: Credentials) -> SessionResult<Identity> {
        let method = credentials.method();
        let result = match &credentials {
            Credentials::Password { email, password } => {
                self.provider.sign_in_with_password(email, password).await
            }
            Credentials::OAuthPopup => self.provider.sign_in_with_oauth_popup().await,
        };

        match result {
            Ok(identity) => {
                info!(email = %identity.email, method, "Signed in");
                self.set_identity(Some(identity.clone()));
                Ok(identity)
            }
            Err(e) => {
                warn!(method, error = %e, "Sign-in failed");
                Err(e)
            }
        }
    }

    /// Creates an account, then applies the registration's profile fields.
    ///
    /// If the profile update fails the account stays signed in and the
    /// profile error is returned.
    pub async fn register(&self, registration: Registration) -> SessionResult<Identity> {
        let created = match self
            .provider
            .create_user(&registration.email, &registration.password)
            .await
        {
            Ok(identity) => identity,
            Err(e) => {
                warn!(email = %registration.email, error = %e, "Registration failed");
                return Err(e);
            }
        };
        info!(email = %created.email, "Account created");
        self.set_identity(Some(created.clone()));

        let profile = registration.profile();
        if profile.is_empty() {
            return Ok(created);
        }
        self.update_profile(profile).await
    }

    /// Updates the signed-in identity's profile.
    pub async fn update_profile(&self, update: ProfileUpdate) -> SessionResult<Identity> {
        if self.snapshot().identity.is_none() {
            return Err(SessionError::NotSignedIn);
        }

        match self.provider.update_profile(&update).await {
            Ok(identity) => {
                debug!(email = %identity.email, "Profile updated");
                self.set_identity(Some(identity.clone()));
                Ok(identity)
            }
            Err(e) => {
                warn!(error = %e, "Profile update failed");
                Err(e)
            }
        }
    }

    /// Signs out. Calling this while signed out is a successful no-op.
    pub async fn sign_out(&self) -> SessionResult<()> {
        let signed_in =
            self.snapshot().identity.is_some() || self.provider.current_identity().is_some();
        if !signed_in {
            debug!("Sign-out requested while already signed out");
            return Ok(());
        }

        match self.provider.sign_out().await {
            Ok(()) => {
                info!("Signed out");
                self.set_identity(None);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Sign-out failed");
                Err(e)
            }
        }
    }

    fn set_identity(&self, identity: Option<Identity>) {
        self.state.send_modify(|s| {
            s.identity = identity;
            s.loading = false;
        });
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.get_mut().take() {
            subscription.unsubscribe();
        }
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("provider", &self.provider.name())
            .field("state", &*self.state.borrow())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeProvider;

    fn store_with(provider: &Arc<FakeProvider>) -> SessionStore {
        SessionStore::new(provider.clone())
    }

    #[tokio::test]
    async fn test_loading_until_first_notification() {
        let provider = Arc::new(FakeProvider::deferred());
        let store = store_with(&provider);
        store.initialize();

        let snapshot = store.snapshot();
        assert!(snapshot.loading);
        assert!(!snapshot.is_signed_out());

        provider.emit(None);
        let settled = store.settled().await;
        assert!(!settled.loading);
        assert!(settled.is_signed_out());
    }

    #[tokio::test]
    async fn test_initialize_subscribes_once() {
        let provider = Arc::new(FakeProvider::signed_out());
        let store = store_with(&provider);

        assert!(store.initialize());
        assert!(!store.initialize());
        assert_eq!(provider.subscriber_count(), 1);

        store.dispose();
        assert_eq!(provider.subscriber_count(), 0);
        assert!(!store.is_initialized());
    }

    #[tokio::test]
    async fn test_drop_releases_subscription() {
        let provider = Arc::new(FakeProvider::signed_out());
        {
            let store = store_with(&provider);
            store.initialize();
            assert_eq!(provider.subscriber_count(), 1);
        }
        assert_eq!(provider.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_sign_in_failure_keeps_identity() {
        let provider = Arc::new(FakeProvider::signed_in("a@x.com"));
        let store = store_with(&provider);
        store.initialize();
        store.settled().await;

        let err = store
            .sign_in(Credentials::password("b@x.com", "wrong"))
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::InvalidCredentials);
        assert_eq!(store.snapshot().email(), Some("a@x.com"));
    }

    #[tokio::test]
    async fn test_sign_in_sets_identity() {
        let provider = Arc::new(FakeProvider::signed_out());
        provider.add_account("b@x.com", "secret");
        let store = store_with(&provider);
        store.initialize();

        let identity = store
            .sign_in(Credentials::password("b@x.com", "secret"))
            .await
            .unwrap();
        assert_eq!(identity.email, "b@x.com");
        assert_eq!(store.snapshot().email(), Some("b@x.com"));
    }

    #[tokio::test]
    async fn test_sign_out_is_idempotent() {
        let provider = Arc::new(FakeProvider::signed_in("a@x.com"));
        let store = store_with(&provider);
        store.initialize();
        store.settled().await;

        assert!(store.sign_out().await.is_ok());
        assert!(store.snapshot().identity.is_none());
        assert!(store.sign_out().await.is_ok());
        assert!(store.snapshot().identity.is_none());
        assert_eq!(provider.sign_out_calls(), 1);
    }

    #[tokio::test]
    async fn test_register_applies_profile() {
        let provider = Arc::new(FakeProvider::signed_out());
        let store = store_with(&provider);
        store.initialize();

        let identity = store
            .register(Registration::new("new@x.com", "pw").with_display_name("New"))
            .await
            .unwrap();
        assert_eq!(identity.display_name, "New");
        assert_eq!(
            store.snapshot().identity.map(|i| i.display_name),
            Some("New".to_string())
        );
    }

    #[tokio::test]
    async fn test_update_profile_requires_identity() {
        let provider = Arc::new(FakeProvider::signed_out());
        let store = store_with(&provider);
        store.initialize();

        let err = store.update_profile(ProfileUpdate::default()).await.unwrap_err();
        assert_eq!(err, SessionError::NotSignedIn);
    }
}
