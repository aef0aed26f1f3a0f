// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Mock Implementations
//!
//! In-memory collaborators for testing Lumina components in isolation.
//!
//! Every mock records its interactions and supports error injection.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lumina_core::{
    ActivationReceipt, EngagementApi, EntitlementApi, EntitlementError, EntitlementResult,
    FeedFilters, FeedPage, GalleryApi, Identity, IdentityCallback, IdentityProvider, ImageId,
    ImageSummary, MutationError, MutationResult, PaymentRecord, ProfileUpdate,
    ProviderSubscription, SessionError, SessionResult, SubscriptionApi, UserRecord,
};
use parking_lot::Mutex;
use tokio::sync::watch;

// =============================================================================
// Mock Identity Provider
// =============================================================================

#[derive(Default)]
struct ProviderState {
    identity: Option<Identity>,
    accounts: HashMap<String, String>,
    oauth: Option<Identity>,
    subscribers: HashMap<u64, IdentityCallback>,
    next_subscriber: u64,
    deferred: bool,
    failure: Option<SessionError>,
    sign_out_calls: usize,
}

/// Identity provider with an in-memory account table.
#[derive(Clone, Default)]
pub struct MockIdentityProvider {
    state: Arc<Mutex<ProviderState>>,
}

impl MockIdentityProvider {
    /// Signed-out provider that reports its state on subscribe.
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider that stays silent on subscribe until [`emit`](Self::emit).
    pub fn deferred() -> Self {
        let provider = Self::new();
        provider.state.lock().deferred = true;
        provider
    }

    /// Registers an account.
    pub fn with_account(self, email: &str, password: &str) -> Self {
        self.state
            .lock()
            .accounts
            .insert(email.to_string(), password.to_string());
        self
    }

    /// Enables the OAuth popup for `email`.
    pub fn with_oauth(self, email: &str) -> Self {
        self.state.lock().oauth = Some(Identity::new(email));
        self
    }

    /// Starts signed in as `email`.
    pub fn signed_in_as(self, email: &str) -> Self {
        self.state.lock().identity = Some(Identity::new(email));
        self
    }

    /// Fails the next provider call with `error`.
    pub fn fail_next(&self, error: SessionError) {
        self.state.lock().failure = Some(error);
    }

    /// Sets the state and notifies subscribers, as a token refresh or an
    /// external sign-out would.
    pub fn emit(&self, identity: Option<Identity>) {
        self.state.lock().identity = identity.clone();
        self.notify(identity);
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }

    /// Number of sign-out calls.
    pub fn sign_out_calls(&self) -> usize {
        self.state.lock().sign_out_calls
    }

    fn take_failure(&self) -> SessionResult<()> {
        match self.state.lock().failure.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn notify(&self, identity: Option<Identity>) {
        let callbacks: Vec<IdentityCallback> =
            self.state.lock().subscribers.values().cloned().collect();
        for callback in callbacks {
            callback(identity.clone());
        }
    }

    fn become_signed_in(&self, identity: Identity) -> Identity {
        self.emit(Some(identity.clone()));
        identity
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    fn subscribe(&self, callback: IdentityCallback) -> ProviderSubscription {
        let (id, deferred, current) = {
            let mut state = self.state.lock();
            let id = state.next_subscriber;
            state.next_subscriber += 1;
            state.subscribers.insert(id, Arc::clone(&callback));
            (id, state.deferred, state.identity.clone())
        };
        if !deferred {
            callback(current);
        }

        let state = Arc::clone(&self.state);
        ProviderSubscription::new(move || {
            state.lock().subscribers.remove(&id);
        })
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> SessionResult<Identity> {
        self.take_failure()?;
        let known = self.state.lock().accounts.get(email).cloned();
        match known {
            Some(expected) if expected == password => {
                Ok(self.become_signed_in(Identity::new(email)))
            }
            _ => Err(SessionError::InvalidCredentials),
        }
    }

    async fn sign_in_with_oauth_popup(&self) -> SessionResult<Identity> {
        self.take_failure()?;
        let identity = self.state.lock().oauth.clone();
        match identity {
            Some(identity) => Ok(self.become_signed_in(identity)),
            None => Err(SessionError::Cancelled),
        }
    }

    async fn create_user(&self, email: &str, password: &str) -> SessionResult<Identity> {
        self.take_failure()?;
        {
            let mut state = self.state.lock();
            if state.accounts.contains_key(email) {
                return Err(SessionError::AccountExists {
                    email: email.to_string(),
                });
            }
            state.accounts.insert(email.to_string(), password.to_string());
        }
        Ok(self.become_signed_in(Identity::new(email)))
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> SessionResult<Identity> {
        self.take_failure()?;
        let mut state = self.state.lock();
        let identity = state.identity.as_mut().ok_or(SessionError::NotSignedIn)?;
        update.apply_to(identity);
        Ok(identity.clone())
    }

    async fn sign_out(&self) -> SessionResult<()> {
        self.take_failure()?;
        self.state.lock().sign_out_calls += 1;
        self.emit(None);
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
        "mock-identity-provider"
    }
}

// =============================================================================
// Mock Entitlement API
// =============================================================================

/// Holds fetches for one email open until [`open`](Self::open) is called or
/// the gate is dropped.
pub struct FetchGate(watch::Sender<bool>);

impl FetchGate {
    /// Releases every waiting fetch.
    pub fn open(&self) {
        self.0.send_replace(true);
    }
}

/// Entitlement backend backed by a record table.
#[derive(Default)]
pub struct MockEntitlementApi {
    records: Mutex<HashMap<String, UserRecord>>,
    failure: Mutex<Option<EntitlementError>>,
    latency: Mutex<Option<Duration>>,
    gates: Mutex<HashMap<String, watch::Receiver<bool>>>,
    calls: Mutex<Vec<String>>,
}

impl MockEntitlementApi {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the record for `email`.
    pub fn insert(&self, email: &str, record: UserRecord) {
        self.records.lock().insert(email.to_string(), record);
    }

    /// Fails every fetch with `error` until cleared.
    pub fn fail_with(&self, error: EntitlementError) {
        *self.failure.lock() = Some(error);
    }

    /// Stops injecting failures.
    pub fn clear_failure(&self) {
        *self.failure.lock() = None;
    }

    /// Delays every fetch.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    /// Holds subsequent fetches for `email`.
    pub fn gate(&self, email: &str) -> FetchGate {
        let (tx, rx) = watch::channel(false);
        self.gates.lock().insert(email.to_string(), rx);
        FetchGate(tx)
    }

    /// Total number of fetches.
    pub fn calls(&self) -> usize {
        self.calls.lock().len()
    }

    /// Number of fetches for `email`.
    pub fn calls_for(&self, email: &str) -> usize {
        self.calls.lock().iter().filter(|e| *e == email).count()
    }
}

#[async_trait]
impl EntitlementApi for MockEntitlementApi {
    async fn fetch_user(&self, email: &str) -> EntitlementResult<UserRecord> {
        self.calls.lock().push(email.to_string());

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
        "mock-entitlements"
    }
}

// =============================================================================
// Mock Engagement API
// =============================================================================

/// Engagement backend keeping like counts and favorites in memory.
#[derive(Default)]
pub struct MockEngagementApi {
    likes: Mutex<HashMap<ImageId, BTreeSet<String>>>,
    favorites: Mutex<HashMap<String, BTreeSet<ImageId>>>,
    failure: Mutex<Option<MutationError>>,
    gate: Mutex<Option<watch::Receiver<bool>>>,
    calls: AtomicUsize,
}

impl MockEngagementApi {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds `count` likes from other accounts on `image`.
    pub fn seed_likes(&self, image: &ImageId, count: usize) {
        let mut likes = self.likes.lock();
        let entry = likes.entry(image.clone()).or_default();
        for i in 0..count {
            entry.insert(format!("seed-{}@x.com", i));
        }
    }

    /// Fails every mutation with `error` until cleared.
    pub fn fail_with(&self, error: MutationError) {
        *self.failure.lock() = Some(error);
    }

    /// Stops injecting failures.
    pub fn clear_failure(&self) {
        *self.failure.lock() = None;
    }

    /// Holds mutations until the gate opens.
    pub fn gate(&self) -> FetchGate {
        let (tx, rx) = watch::channel(false);
        *self.gate.lock() = Some(rx);
        FetchGate(tx)
    }

    /// Stored favorites for `email`.
    pub fn stored_favorites(&self, email: &str) -> BTreeSet<ImageId> {
        self.favorites.lock().get(email).cloned().unwrap_or_default()
    }

    /// Number of backend calls.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> MutationResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().clone();
        if let Some(mut gate) = gate {
            let _ = gate.wait_for(|open| *open).await;
        }
        match self.failure.lock().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl EngagementApi for MockEngagementApi {
    async fn set_like(&self, image: &ImageId, email: &str, liked: bool) -> MutationResult<u64> {
        self.enter().await?;
        let mut likes = self.likes.lock();
        let entry = likes.entry(image.clone()).or_default();
        if liked {
            entry.insert(email.to_string());
        } else {
            entry.remove(email);
        }
        Ok(entry.len() as u64)
    }

    async fn set_favorite(&self, email: &str, image: &ImageId, favorite: bool) -> MutationResult<()> {
        self.enter().await?;
        let mut favorites = self.favorites.lock();
        let entry = favorites.entry(email.to_string()).or_default();
        if favorite {
            entry.insert(image.clone());
        } else {
            entry.remove(image);
        }
        Ok(())
    }

    async fn favorites(&self, email: &str) -> MutationResult<Vec<ImageId>> {
        self.enter().await?;
        Ok(self.stored_favorites(email).into_iter().collect())
    }

    fn name(&self) -> &str {
        "mock-engagement"
    }
}

// =============================================================================
// Mock Subscription API
// =============================================================================

/// Subscription backend recording payments and activations.
pub struct MockSubscriptionApi {
    modified: Mutex<MutationResult<u64>>,
    payment_failure: Mutex<Option<MutationError>>,
    payments: Mutex<Vec<PaymentRecord>>,
    activations: Mutex<Vec<ActivationReceipt>>,
    gate: Mutex<Option<watch::Receiver<bool>>>,
}

impl MockSubscriptionApi {
    /// Backend whose activation modifies one document.
    pub fn new() -> Self {
        Self::returning(Ok(1))
    }

    /// Backend whose activation returns `result`.
    pub fn returning(result: MutationResult<u64>) -> Self {
        Self {
            modified: Mutex::new(result),
            payment_failure: Mutex::new(None),
            payments: Mutex::new(Vec::new()),
            activations: Mutex::new(Vec::new()),
            gate: Mutex::new(None),
        }
    }

    /// Fails payment recording with `error`.
    pub fn fail_payments(&self, error: MutationError) {
        *self.payment_failure.lock() = Some(error);
    }

    /// Holds activations until the gate opens.
    pub fn gate(&self) -> FetchGate {
        let (tx, rx) = watch::channel(false);
        *self.gate.lock() = Some(rx);
        FetchGate(tx)
    }

    /// Recorded payments.
    pub fn payments(&self) -> Vec<PaymentRecord> {
        self.payments.lock().clone()
    }

    /// Received activations.
    pub fn activations(&self) -> Vec<ActivationReceipt> {
        self.activations.lock().clone()
    }
}

impl Default for MockSubscriptionApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubscriptionApi for MockSubscriptionApi {
    async fn record_payment(&self, record: &PaymentRecord) -> MutationResult<()> {
        if let Some(error) = self.payment_failure.lock().clone() {
            return Err(error);
        }
        self.payments.lock().push(record.clone());
        Ok(())
    }

    async fn activate_premium(&self, receipt: &ActivationReceipt) -> MutationResult<u64> {
        self.activations.lock().push(receipt.clone());
        let gate = self.gate.lock().clone();
        if let Some(mut gate) = gate {
            let _ = gate.wait_for(|open| *open).await;
        }
        self.modified.lock().clone()
    }

    fn name(&self) -> &str {
        "mock-subscriptions"
    }
}

// =============================================================================
// Mock Gallery API
// =============================================================================

/// Gallery backend serving a fixed image list in pages.
pub struct MockGalleryApi {
    images: Vec<ImageSummary>,
    page_size: usize,
    requests: Mutex<Vec<(u32, FeedFilters)>>,
}

impl MockGalleryApi {
    /// Serves `images` in pages of `page_size`.
    pub fn new(images: Vec<ImageSummary>, page_size: usize) -> Self {
        Self {
            images,
            page_size: page_size.max(1),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Received `(page, filters)` requests.
    pub fn requests(&self) -> Vec<(u32, FeedFilters)> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl GalleryApi for MockGalleryApi {
    async fn page(&self, page: u32, filters: &FeedFilters) -> MutationResult<FeedPage> {
        self.requests.lock().push((page, filters.clone()));

        let matching: Vec<&ImageSummary> = self
            .images
            .iter()
            .filter(|i| filters.category.as_deref().map_or(true, |c| i.category == c))
            .collect();
        let start = (page.saturating_sub(1) as usize) * self.page_size;
        let images: Vec<ImageSummary> = matching
            .iter()
            .skip(start)
            .take(self.page_size)
            .map(|i| (*i).clone())
            .collect();
        Ok(FeedPage {
            has_more: start + images.len() < matching.len(),
            images,
        })
    }

    fn name(&self) -> &str {
        "mock-gallery"
    }
}
