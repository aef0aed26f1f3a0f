// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! ApiClient tests against an in-process mock backend.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use lumina_api::{ApiClient, ApiConfig, ApiError};
use lumina_core::{
    ActivationReceipt, EngagementApi, EntitlementApi, FeedFilters, GalleryApi, Identity,
    IdentityCallback, IdentityProvider, ImageId, MutationError, ProfileUpdate,
    ProviderSubscription, Role, SessionError, SessionResult, SessionStore, SubscriptionApi, Tier,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpListener;

// =============================================================================
// Identity Provider
// =============================================================================

struct TokenProvider {
    identity: Mutex<Option<Identity>>,
    token: String,
    callbacks: Mutex<Vec<IdentityCallback>>,
}

impl TokenProvider {
    fn signed_in(email: &str, token: &str) -> Arc<Self> {
        Arc::new(Self {
            identity: Mutex::new(Some(Identity::new(email))),
            token: token.to_string(),
            callbacks: Mutex::new(Vec::new()),
        })
    }

    fn signed_out() -> Arc<Self> {
        Arc::new(Self {
            identity: Mutex::new(None),
            token: String::new(),
            callbacks: Mutex::new(Vec::new()),
        })
    }

    fn emit(&self) {
        let identity = self.identity.lock().clone();
        let callbacks = self.callbacks.lock().clone();
        for callback in callbacks {
            callback(identity.clone());
        }
    }
}

#[async_trait]
impl IdentityProvider for TokenProvider {
    fn subscribe(&self, callback: IdentityCallback) -> ProviderSubscription {
        callback(self.identity.lock().clone());
        self.callbacks.lock().push(callback);
        ProviderSubscription::noop()
    }

    async fn sign_in_with_password(&self, _: &str, _: &str) -> SessionResult<Identity> {
        Err(SessionError::unavailable("unsupported"))
    }

    async fn sign_in_with_oauth_popup(&self) -> SessionResult<Identity> {
        Err(SessionError::unavailable("unsupported"))
    }

    async fn create_user(&self, _: &str, _: &str) -> SessionResult<Identity> {
        Err(SessionError::unavailable("unsupported"))
    }

    async fn update_profile(&self, _: &ProfileUpdate) -> SessionResult<Identity> {
        Err(SessionError::unavailable("unsupported"))
    }

    async fn sign_out(&self) -> SessionResult<()> {
        *self.identity.lock() = None;
        self.emit();
        Ok(())
    }

    fn current_identity(&self) -> Option<Identity> {
        self.identity.lock().clone()
    }

    async fn id_token(&self) -> SessionResult<Option<String>> {
        Ok(self
            .identity
            .lock()
            .as_ref()
            .map(|_| self.token.clone()))
    }
}

// =============================================================================
// Mock Backend
// =============================================================================

#[derive(Default)]
struct Backend {
    authorization: Mutex<Vec<Option<String>>>,
    bodies: Mutex<Vec<Value>>,
}

impl Backend {
    fn record(&self, headers: &HeaderMap) -> Option<String> {
        let value = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.authorization.lock().push(value.clone());
        value
    }
}

type Shared = State<Arc<Backend>>;

async fn get_user(State(backend): Shared, Path(email): Path<String>, headers: HeaderMap) -> Response {
    if backend.record(&headers).as_deref() == Some("Bearer expired") {
        return (StatusCode::UNAUTHORIZED, "token expired").into_response();
    }
    match email.as_str() {
        "admin@x.com" => Json(json!({
            "email": email,
            "name": "Admin",
            "role": "admin",
            "user_status": "creator"
        }))
        .into_response(),
        "blocked@x.com" => (StatusCode::FORBIDDEN, "blocked").into_response(),
        "gone@x.com" => StatusCode::NOT_FOUND.into_response(),
        "broken@x.com" => (StatusCode::INTERNAL_SERVER_ERROR, "db down").into_response(),
        _ => Json(Value::Null).into_response(),
    }
}

async fn activate(State(backend): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    backend.record(&headers);
    let modified = u64::from(body["transactionId"] == "txn-1");
    backend.bodies.lock().push(body);
    Json(json!({ "acknowledged": true, "modifiedCount": modified }))
}

async fn images(State(backend): Shared, headers: HeaderMap, Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    backend.record(&headers);
    let mut pairs: Vec<String> = query.iter().map(|(k, v)| format!("{k}={v}")).collect();
    pairs.sort();
    let images: Vec<Value> = pairs.into_iter().map(|id| json!({ "_id": id })).collect();
    Json(json!({ "images": images, "hasMore": true }))
}

async fn favorites(State(backend): Shared, Path(email): Path<String>, headers: HeaderMap) -> Json<Value> {
    backend.record(&headers);
    assert_eq!(email, "a@x.com");
    Json(json!([{ "_id": "img-1" }, { "_id": "img-2" }]))
}

async fn add_favorite(State(backend): Shared, headers: HeaderMap, Json(body): Json<Value>) -> StatusCode {
    backend.record(&headers);
    backend.bodies.lock().push(body);
    StatusCode::CREATED
}

async fn like(State(backend): Shared, Path(id): Path<String>, headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    backend.record(&headers);
    assert_eq!(id, "img-7");
    let likes = if body["liked"] == true { 5 } else { 4 };
    Json(json!({ "likes": likes }))
}

async fn spawn_backend() -> (String, Arc<Backend>) {
    let backend = Arc::new(Backend::default());
    let app = Router::new()
        .route("/api/users/premium", patch(activate))
        .route("/api/users/{email}", get(get_user))
        .route("/api/images", get(images))
        .route("/api/images/favorites", post(add_favorite).delete(add_favorite))
        .route("/api/images/favorites/{email}", get(favorites))
        .route("/api/images/{id}/like", patch(like))
        .with_state(Arc::clone(&backend));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/api"), backend)
}

async fn client_for(provider: Arc<TokenProvider>) -> (ApiClient, Arc<Backend>) {
    let (base_url, backend) = spawn_backend().await;
    let session = Arc::new(SessionStore::new(provider));
    session.initialize();
    let config = ApiConfig::new(base_url).with_timeout(Duration::from_secs(5));
    (ApiClient::new(config, session).unwrap(), backend)
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn test_rejects_unsupported_scheme() {
    let session = Arc::new(SessionStore::new(TokenProvider::signed_out()));
    let err = ApiClient::new(ApiConfig::new("ftp://files.test"), session).unwrap_err();
    assert!(matches!(err, ApiError::InvalidUrl { .. }));
}

#[test]
fn test_base_path_is_kept() {
    let session = Arc::new(SessionStore::new(TokenProvider::signed_out()));
    let client = ApiClient::new(ApiConfig::new("https://api.test/v1"), session).unwrap();
    assert_eq!(
        client.url("/users/a").unwrap().as_str(),
        "https://api.test/v1/users/a"
    );
}

#[tokio::test]
async fn test_fetch_user_sends_bearer_token() {
    let (client, backend) = client_for(TokenProvider::signed_in("admin@x.com", "tok-1")).await;

    let record = client.fetch_user("admin@x.com").await.unwrap();
    assert_eq!(record.role(), Some(Role::Admin));
    assert_eq!(record.tier(), Tier::Creator);
    assert_eq!(
        backend.authorization.lock().as_slice(),
        &[Some("Bearer tok-1".to_string())]
    );
}

#[tokio::test]
async fn test_signed_out_requests_have_no_token() {
    let (client, backend) = client_for(TokenProvider::signed_out()).await;

    let record = client.user("admin@x.com").await.unwrap();
    assert!(record.is_some());
    assert_eq!(backend.authorization.lock().as_slice(), &[None]);
}

#[tokio::test]
async fn test_missing_user_is_not_found() {
    let (client, _) = client_for(TokenProvider::signed_in("a@x.com", "tok")).await;

    // `null` body
    let err = client.fetch_user("new@x.com").await.unwrap_err();
    assert!(err.is_not_found());

    // 404 status
    let err = client.fetch_user("gone@x.com").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_server_error_is_not_not_found() {
    let (client, _) = client_for(TokenProvider::signed_in("a@x.com", "tok")).await;

    let err = client.fetch_user("broken@x.com").await.unwrap_err();
    assert!(!err.is_not_found());
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_unauthorized_signs_out() {
    let (client, _) = client_for(TokenProvider::signed_in("a@x.com", "expired")).await;
    assert!(client.session().snapshot().identity.is_some());

    let err = client.user("admin@x.com").await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized { .. }));
    assert_eq!(err.redirect(), Some("/login"));
    assert!(client.session().snapshot().identity.is_none());
}

#[tokio::test]
async fn test_forbidden_keeps_session() {
    let (client, _) = client_for(TokenProvider::signed_in("a@x.com", "tok")).await;

    let err = client.user("blocked@x.com").await.unwrap_err();
    assert_eq!(err.redirect(), Some("/forbidden"));
    assert_eq!(client.session().snapshot().email(), Some("a@x.com"));
}

#[tokio::test]
async fn test_activate_premium_reads_modified_count() {
    let (client, backend) = client_for(TokenProvider::signed_in("a@x.com", "tok")).await;

    let receipt = ActivationReceipt {
        email: "a@x.com".to_string(),
        amount: 20,
        transaction_id: "txn-1".to_string(),
    };
    assert_eq!(client.activate_premium(&receipt).await.unwrap(), 1);

    let replay = ActivationReceipt {
        transaction_id: "txn-2".to_string(),
        ..receipt
    };
    assert_eq!(client.activate_premium(&replay).await.unwrap(), 0);

    let bodies = backend.bodies.lock();
    assert_eq!(bodies[0]["email"], "a@x.com");
    assert_eq!(bodies[0]["amount"], 20);
}

#[tokio::test]
async fn test_feed_query_omits_all_filters() {
    let (client, _) = client_for(TokenProvider::signed_in("a@x.com", "tok")).await;

    let filters = FeedFilters::from_values("Nature", "All", "");
    let page = client.page(2, &filters).await.unwrap();
    let ids: Vec<&str> = page.images.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["category=Nature", "page=2"]);
    assert!(page.has_more);
}

#[tokio::test]
async fn test_engagement_endpoints() {
    let (client, backend) = client_for(TokenProvider::signed_in("a@x.com", "tok")).await;
    let image = ImageId::new("img-7");

    assert_eq!(client.set_like(&image, "a@x.com", true).await.unwrap(), 5);
    assert_eq!(client.set_like(&image, "a@x.com", false).await.unwrap(), 4);

    client.set_favorite("a@x.com", &image, true).await.unwrap();
    assert_eq!(backend.bodies.lock()[0]["imageId"], "img-7");

    let favorites = client.favorites("a@x.com").await.unwrap();
    assert_eq!(favorites, vec![ImageId::new("img-1"), ImageId::new("img-2")]);
}

#[tokio::test]
async fn test_mutation_forbidden_maps_to_http() {
    let (client, _) = client_for(TokenProvider::signed_in("a@x.com", "tok")).await;
    let err: MutationError = client.user("blocked@x.com").await.unwrap_err().into();
    assert!(matches!(err, MutationError::Http { status: 403, .. }));
}
