// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Identity provider for non-interactive use.
//!
//! The CLI cannot open the hosted sign-in popup. It is handed an email and a
//! bearer token instead, and reports that identity as signed in until the
//! backend rejects the token.

use std::sync::Arc;

use async_trait::async_trait;
use lumina_core::{
    Identity, IdentityCallback, IdentityProvider, ProfileUpdate, ProviderSubscription,
    SessionError, SessionResult,
};
use parking_lot::Mutex;

/// Signed-in identity with a pre-issued token.
pub struct StaticTokenProvider {
    identity: Mutex<Option<Identity>>,
    token: String,
    listeners: Arc<Mutex<Vec<IdentityCallback>>>,
}

impl StaticTokenProvider {
    /// Creates a provider signed in as `email`.
    pub fn new(email: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            identity: Mutex::new(Some(Identity::new(email))),
            token: token.into(),
            listeners: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn unsupported(&self) -> SessionError {
        SessionError::unavailable("interactive sign-in is not available from the command line")
    }
}

#[async_trait]
impl IdentityProvider for StaticTokenProvider {
    fn subscribe(&self, callback: IdentityCallback) -> ProviderSubscription {
        let current = self.identity.lock().clone();
        callback(current);

        self.listeners.lock().push(Arc::clone(&callback));
        let listeners = Arc::clone(&self.listeners);
        ProviderSubscription::new(move || {
            listeners.lock().retain(|l| !Arc::ptr_eq(l, &callback));
        })
    }

    async fn sign_in_with_password(&self, _: &str, _: &str) -> SessionResult<Identity> {
        Err(self.unsupported())
    }

    async fn sign_in_with_oauth_popup(&self) -> SessionResult<Identity> {
        Err(self.unsupported())
    }

    async fn create_user(&self, _: &str, _: &str) -> SessionResult<Identity> {
        Err(self.unsupported())
    }

    async fn update_profile(&self, _: &ProfileUpdate) -> SessionResult<Identity> {
        Err(self.unsupported())
    }

    async fn sign_out(&self) -> SessionResult<()> {
        *self.identity.lock() = None;
        let listeners = self.listeners.lock().clone();
        for listener in listeners {
            listener(None);
        }
        Ok(())
    }

    fn current_identity(&self) -> Option<Identity> {
        self.identity.lock().clone()
    }

    async fn id_token(&self) -> SessionResult<Option<String>> {
        Ok(self
            .identity
            .lock()
            .is_some()
            .then(|| self.token.clone()))
    }

    fn name(&self) -> &str {
        "static-token"
    }
}
