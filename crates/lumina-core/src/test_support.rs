// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! In-memory fakes shared by unit tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::entitlement::{EntitlementApi, UserRecord};
use crate::error::{EntitlementError, EntitlementResult, SessionError, SessionResult};
use crate::provider::{IdentityCallback, IdentityProvider, ProviderSubscription};
use crate::types::{Identity, ProfileUpdate};

// =============================================================================
// FakeProvider
// =============================================================================

#[derive(Default)]
struct ProviderState {
    identity: Option<Identity>,
    accounts: HashMap<String, String>,
    subscribers: HashMap<u64, IdentityCallback>,
    next_subscriber: u64,
    emit_on_subscribe: bool,
    oauth_identity: Option<Identity>,
    sign_out_calls: usize,
}

/// Identity provider backed by an in-memory account table.
pub(crate) struct FakeProvider {
    state: Arc<Mutex<ProviderState>>,
}

impl FakeProvider {
    fn with_state(state: ProviderState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Never calls back on subscribe; use [`emit`](Self::emit).
    pub fn deferred() -> Self {
        Self::with_state(ProviderState::default())
    }

    pub fn signed_out() -> Self {
        Self::with_state(ProviderState {
            emit_on_subscribe: true,
            ..ProviderState::default()
        })
    }

    /// Signed in as `email`, whose password is `"password"`.
    pub fn signed_in(email: &str) -> Self {
        let provider = Self::signed_out();
        {
            let mut state = provider.state.lock();
            state.identity = Some(Identity::new(email));
            state.accounts.insert(email.to_string(), "password".to_string());
        }
        provider
    }

    pub fn with_oauth(self, email: &str) -> Self {
        self.state.lock().oauth_identity = Some(Identity::new(email));
        self
    }

    pub fn add_account(&self, email: &str, password: &str) {
        self.state
            .lock()
            .accounts
            .insert(email.to_string(), password.to_string());
    }

    /// Sets the provider state and notifies every subscriber.
    pub fn emit(&self, identity: Option<Identity>) {
        self.state.lock().identity = identity.clone();
        self.notify(identity);
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }

    pub fn sign_out_calls(&self) -> usize {
        self.state.lock().sign_out_calls
    }

    fn notify(&self, identity: Option<Identity>) {
        let callbacks: Vec<IdentityCallback> =
            self.state.lock().subscribers.values().cloned().collect();
        for callback in callbacks {
            callback(identity.clone());
        }
    }

    fn sign_in_as(&self, identity: Identity) -> Identity {
        self.state.lock().identity = Some(identity.clone());
        self.notify(Some(identity.clone()));
        identity
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    fn subscribe(&self, callback: IdentityCallback) -> ProviderSubscription {
        let (id, emit, current) = {
            let mut state = self.state.lock();
            let id = state.next_subscriber;
            state.next_subscriber += 1;
            state.subscribers.insert(id, callback.clone());
            (id, state.emit_on_subscribe, state.identity.clone())
        };
        if emit {
            callback(current);
        }

        let state = Arc::clone(&self.state);
        ProviderSubscription::new(move || {
            state.lock().subscribers.remove(&id);
        })
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> SessionResult<Identity> {
        let known = self.state.lock().accounts.get(email).cloned();
        match known {
            Some(expected) if expected == password => Ok(self.sign_in_as(Identity::new(email))),
            _ => Err(SessionError::InvalidCredentials),
        }
    }

    async fn sign_in_with_oauth_popup(&self) -> SessionResult<Identity> {
        let identity = self.state.lock().oauth_identity.clone();
        match identity {
            Some(identity) => Ok(self.sign_in_as(identity)),
            None => Err(SessionError::Cancelled),
        }
    }

    async fn create_user(&self, email: &str, password: &str) -> SessionResult<Identity> {
        {
            let mut state = self.state.lock();
            if state.accounts.contains_key(email) {
                return Err(SessionError::AccountExists {
                    email: email.to_string(),
                });
            }
            state.accounts.insert(email.to_string(), password.to_string());
        }
        Ok(self.sign_in_as(Identity::new(email)))
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> SessionResult<Identity> {
        let mut state = self.state.lock();
        let identity = state.identity.as_mut().ok_or(SessionError::NotSignedIn)?;
        update.apply_to(identity);
        Ok(identity.clone())
    }

    async fn sign_out(&self) -> SessionResult<()> {
        {
            let mut state = self.state.lock();
            state.sign_out_calls += 1;
            state.identity = None;
        }
        self.notify(None);
        Ok(())
    }

    fn current_identity(&self) -> Option<Identity> {
        self.state.lock().identity.clone()
    }

    async fn id_token(&self) -> SessionResult<Option<String>> {
        Ok(self
            .state
            .lock()
            .identity
            .as_ref()
            .map(|i| format!("token-{}", i.email)))
    }

    fn name(&self) -> &str {
        "fake-provider"
    }
}

// =============================================================================
// FakeEntitlementApi
// =============================================================================

/// Holds a fetch open until [`open`](Self::open) is called or the gate drops.
pub(crate) struct Gate(watch::Sender<bool>);

impl Gate {
    pub fn open(&self) {
        self.0.send_replace(true);
    }
}

/// Entitlement backend backed by an in-memory record table.
#[derive(Default)]
pub(crate) struct FakeEntitlementApi {
    records: Mutex<HashMap<String, UserRecord>>,
    failure: Mutex<Option<EntitlementError>>,
    latency: Mutex<Option<Duration>>,
    gates: Mutex<HashMap<String, watch::Receiver<bool>>>,
    calls: AtomicUsize,
}

impl FakeEntitlementApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, email: &str, record: UserRecord) {
        self.records.lock().insert(email.to_string(), record);
    }

    pub fn fail_with(&self, error: EntitlementError) {
        *self.failure.lock() = Some(error);
    }

    pub fn clear_failure(&self) {
        *self.failure.lock() = None;
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    /// Blocks subsequent fetches for `email` until the gate opens.
    pub fn gate(&self, email: &str) -> Gate {
        let (tx, rx) = watch::channel(false);
        self.gates.lock().insert(email.to_string(), rx);
        Gate(tx)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntitlementApi for FakeEntitlementApi {
    async fn fetch_user(&self, email: &str) -> EntitlementResult<UserRecord> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let gate = self.gates.lock().get(email).cloned();
        if let Some(mut gate) = gate {
            let _ = gate.wait_for(|open| *open).await;
        }

        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if let Some(error) = self.failure.lock().clone() {
            return Err(error);
        }
        self.records
            .lock()
            .get(email)
            .cloned()
            .ok_or_else(|| EntitlementError::not_found(email))
    }

    fn name(&self) -> &str {
        "fake-entitlements"
    }
}
