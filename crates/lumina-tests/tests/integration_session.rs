// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Session Integration Tests
//!
//! - `test_session_*`: Session store lifecycle and mutations
//! - `test_context_*`: Email tracking by the access context

use std::sync::Arc;

use lumina_core::{
    Credentials, Identity, ProfileUpdate, Registration, SessionError, SessionStore, Tier,
};
use lumina_tests::prelude::*;

fn store(provider: &Arc<MockIdentityProvider>) -> SessionStore {
    let store = SessionStore::new(provider.clone());
    store.initialize();
    store
}

// =============================================================================
// Session Store
// =============================================================================

#[tokio::test]
async fn test_session_loading_until_provider_reports() {
    init_test_logging();
    let provider = Arc::new(MockIdentityProvider::deferred());
    let session = store(&provider);

    let snapshot = session.snapshot();
    assert!(snapshot.loading);
    assert!(!snapshot.is_signed_out());

    provider.emit(None);
    let settled = session.settled().await;
    assert!(settled.is_signed_out());
}

#[tokio::test]
async fn test_session_password_sign_in() {
    let provider = Arc::new(MockIdentityProvider::new().with_account("a@x.com", "pw"));
    let session = store(&provider);
    assert!(session.snapshot().is_signed_out());

    let identity = session
        .sign_in(Credentials::password("a@x.com", "pw"))
        .await
        .unwrap();
    assert_eq!(identity.email, "a@x.com");
    assert_eq!(session.snapshot().email(), Some("a@x.com"));
}

#[tokio::test]
async fn test_session_wrong_password_keeps_state() {
    let provider = Arc::new(
        MockIdentityProvider::new()
            .with_account("a@x.com", "pw")
            .signed_in_as("b@x.com"),
    );
    let session = store(&provider);

    let err = session
        .sign_in(Credentials::password("a@x.com", "nope"))
        .await
        .unwrap_err();
    assert_eq!(err, SessionError::InvalidCredentials);
    assert_eq!(session.snapshot().email(), Some("b@x.com"));
}

#[tokio::test]
async fn test_session_oauth_popup() {
    let provider = Arc::new(MockIdentityProvider::new().with_oauth("g@x.com"));
    let session = store(&provider);

    let identity = session.sign_in(Credentials::OAuthPopup).await.unwrap();
    assert_eq!(identity.email, "g@x.com");

    let cancelled = Arc::new(MockIdentityProvider::new());
    let session = store(&cancelled);
    assert_eq!(
        session.sign_in(Credentials::OAuthPopup).await.unwrap_err(),
        SessionError::Cancelled
    );
    assert!(session.snapshot().is_signed_out());
}

#[tokio::test]
async fn test_session_register_with_profile() {
    let provider = Arc::new(MockIdentityProvider::new());
    let session = store(&provider);

    let identity = session
        .register(
            Registration::new("new@x.com", "pw")
                .with_display_name("New User")
                .with_photo_url("https://cdn.example.com/me.png"),
        )
        .await
        .unwrap();
    assert_eq!(identity.display_name, "New User");
    assert_eq!(identity.photo_url, "https://cdn.example.com/me.png");
    assert_eq!(session.snapshot().identity, Some(identity));

    let err = session
        .register(Registration::new("new@x.com", "pw"))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::AccountExists { .. }));
}

#[tokio::test]
async fn test_session_provider_outage_surfaces() {
    let provider = Arc::new(MockIdentityProvider::new().with_account("a@x.com", "pw"));
    let session = store(&provider);

    provider.fail_next(SessionError::unavailable("network down"));
    let err = session
        .sign_in(Credentials::password("a@x.com", "pw"))
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert!(session.snapshot().is_signed_out());

    // The failure is one-shot.
    session
        .sign_in(Credentials::password("a@x.com", "pw"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_session_update_profile() {
    let provider = Arc::new(MockIdentityProvider::new().signed_in_as("a@x.com"));
    let session = store(&provider);

    let updated = session
        .update_profile(ProfileUpdate {
            display_name: Some("Ada".to_string()),
            photo_url: None,
        })
        .await
        .unwrap();
    assert_eq!(updated.display_name, "Ada");
    assert_eq!(
        session.snapshot().identity.map(|i| i.display_name),
        Some("Ada".to_string())
    );
}

#[tokio::test]
async fn test_session_sign_out_idempotent() {
    let provider = Arc::new(MockIdentityProvider::new().signed_in_as("a@x.com"));
    let session = store(&provider);

    session.sign_out().await.unwrap();
    session.sign_out().await.unwrap();
    assert!(session.snapshot().is_signed_out());
    assert_eq!(provider.sign_out_calls(), 1);
}

#[tokio::test]
async fn test_session_dispose_unsubscribes() {
    let provider = Arc::new(MockIdentityProvider::new());
    let session = store(&provider);
    assert_eq!(provider.subscriber_count(), 1);
    assert!(!session.initialize());

    session.dispose();
    assert_eq!(provider.subscriber_count(), 0);

    // Later provider changes no longer reach the store.
    provider.emit(Some(Identity::new("late@x.com")));
    assert!(session.snapshot().identity.is_none());
}

// =============================================================================
// Context Email Tracking
// =============================================================================

#[tokio::test]
async fn test_context_fetches_for_each_new_email() {
    let env = AccessFixture::signed_out();
    env.api.insert("a@x.com", Fixtures::artist());
    env.api.insert("b@x.com", Fixtures::creator());

    env.provider.emit(Some(Identity::new("a@x.com")));
    let a = env.context.entitlements().fetch(Some("a@x.com")).await;
    assert_eq!(a.effective_tier(), Tier::Artist);

    env.provider.emit(Some(Identity::new("b@x.com")));
    let b = env.context.entitlements().fetch(Some("b@x.com")).await;
    assert_eq!(b.effective_tier(), Tier::Creator);

    assert_eq!(env.api.calls_for("a@x.com"), 1);
    assert_eq!(env.api.calls_for("b@x.com"), 1);
}

#[tokio::test]
async fn test_context_dispose_releases_provider() {
    let env = AccessFixture::signed_out();
    assert!(env.context.is_started());
    assert_eq!(env.provider.subscriber_count(), 1);

    env.context.dispose();
    assert!(!env.context.is_started());
    assert_eq!(env.provider.subscriber_count(), 0);
}
