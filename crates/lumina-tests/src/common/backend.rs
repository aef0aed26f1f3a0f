// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! In-process Lumina REST backend.
//!
//! Speaks the same contract as the production API under `/api`, keeps its
//! data in memory, and accepts `token-{email}` bearer tokens (the tokens
//! [`MockIdentityProvider`](super::mocks::MockIdentityProvider) issues).

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use lumina_core::{ImageSummary, Role, Tier, UserRecord};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// Premium plan prices, in whole currency units.
pub const ARTIST_PRICE: u64 = 999;
/// See [`ARTIST_PRICE`].
pub const CREATOR_PRICE: u64 = 1999;

#[derive(Default)]
struct BackendState {
    users: Mutex<HashMap<String, UserRecord>>,
    revoked: Mutex<HashSet<String>>,
    forbidden: Mutex<HashSet<String>>,
    user_requests: Mutex<Vec<String>>,
    payments: Mutex<Vec<Value>>,
    likes: Mutex<HashMap<String, BTreeSet<String>>>,
    favorites: Mutex<HashMap<String, BTreeSet<String>>>,
    images: Mutex<Vec<ImageSummary>>,
    downloads: Mutex<Vec<(&'static str, Value)>>,
}

impl BackendState {
    /// Returns the caller's email, or the rejection to send.
    fn authorize(&self, headers: &HeaderMap) -> Result<Option<String>, Response> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        let Some(token) = token else {
            return Ok(None);
        };
        let Some(email) = token.strip_prefix("token-") else {
            return Err((StatusCode::UNAUTHORIZED, "malformed token").into_response());
        };
        if self.revoked.lock().contains(email) {
            return Err((StatusCode::UNAUTHORIZED, "token expired").into_response());
        }
        if self.forbidden.lock().contains(email) {
            return Err((StatusCode::FORBIDDEN, "account suspended").into_response());
        }
        Ok(Some(email.to_string()))
    }

    /// Like `authorize`, but only admins pass.
    fn authorize_admin(&self, headers: &HeaderMap) -> Result<String, Response> {
        let email = self.authorize(headers)?;
        let is_admin = email.as_deref().is_some_and(|email| {
            self.users.lock().get(email).and_then(UserRecord::role) == Some(Role::Admin)
        });
        match email {
            Some(email) if is_admin => Ok(email),
            _ => Err((StatusCode::FORBIDDEN, "admin only").into_response()),
        }
    }
}

/// Handle to a running backend.
#[derive(Clone)]
pub struct TestBackend {
    base_url: String,
    state: Arc<BackendState>,
}

impl TestBackend {
    /// Binds an ephemeral port and serves in the background.
    pub async fn spawn() -> Self {
        let state = Arc::new(BackendState::default());
        let app = Router::new()
            .route("/api/users/premium", patch(activate))
            .route("/api/users/{email}", get(user))
            .route("/api/payments", post(record_payment))
            .route("/api/images", get(images))
            .route("/api/images/favorites", post(add_favorite).delete(remove_favorite))
            .route("/api/images/favorites/{email}", get(favorites))
            .route("/api/images/{id}/like", patch(like))
            .route("/api/download-free-image", post(download_free))
            .route("/api/purchase-image", post(purchase))
            .route("/api/admin/users", get(admin_users))
            .route("/api/admin/change-role", post(change_role))
            .route("/api/admin/toggle-status", post(toggle_status))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test backend");
        let addr = listener.local_addr().expect("Listener has an address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{}/api", addr),
            state,
        }
    }

    /// Base URL for `ApiConfig`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Stores the record for `email`.
    pub fn insert_user(&self, email: &str, record: UserRecord) {
        self.state.users.lock().insert(email.to_string(), record);
    }

    /// Stored tier for `email`.
    pub fn stored_tier(&self, email: &str) -> Option<Tier> {
        self.state.users.lock().get(email).map(UserRecord::tier)
    }

    /// Rejects the token of `email` with `401`.
    pub fn revoke(&self, email: &str) {
        self.state.revoked.lock().insert(email.to_string());
    }

    /// Rejects requests by `email` with `403`.
    pub fn forbid(&self, email: &str) {
        self.state.forbidden.lock().insert(email.to_string());
    }

    /// Serves `images` from `GET /images`.
    pub fn set_images(&self, images: Vec<ImageSummary>) {
        *self.state.images.lock() = images;
    }

    /// Number of `GET /users/{email}` requests for `email`.
    pub fn user_requests(&self, email: &str) -> usize {
        self.state
            .user_requests
            .lock()
            .iter()
            .filter(|e| *e == email)
            .count()
    }

    /// Recorded payment bodies.
    pub fn payments(&self) -> Vec<Value> {
        self.state.payments.lock().clone()
    }

    /// Stored user record for `email`.
    pub fn user_record(&self, email: &str) -> Option<UserRecord> {
        self.state.users.lock().get(email).cloned()
    }

    /// Recorded downloads as `(endpoint, body)`, in arrival order.
    pub fn downloads(&self) -> Vec<(&'static str, Value)> {
        self.state.downloads.lock().clone()
    }
}

// =============================================================================
// Handlers
// =============================================================================

type Shared = State<Arc<BackendState>>;

async fn user(State(state): Shared, Path(email): Path<String>, headers: HeaderMap) -> Response {
    if let Err(rejection) = state.authorize(&headers) {
        return rejection;
    }
    state.user_requests.lock().push(email.clone());
    match state.users.lock().get(&email) {
        Some(record) => Json(record.clone()).into_response(),
        None => Json(Value::Null).into_response(),
    }
}

async fn activate(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(rejection) = state.authorize(&headers) {
        return rejection;
    }
    let tier = match body["amount"].as_u64() {
        Some(CREATOR_PRICE) => Tier::Creator,
        Some(ARTIST_PRICE) => Tier::Artist,
        Some(0) => Tier::Explorer,
        _ => return (StatusCode::BAD_REQUEST, "unknown plan").into_response(),
    };
    let email = body["email"].as_str().unwrap_or_default();

    let mut users = state.users.lock();
    let modified = match users.get_mut(email) {
        Some(record) => {
            record.user_status = Some(tier.as_str().to_string());
            1
        }
        None => 0,
    };
    Json(json!({ "acknowledged": true, "modifiedCount": modified })).into_response()
}

async fn record_payment(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(rejection) = state.authorize(&headers) {
        return rejection;
    }
    state.payments.lock().push(body);
    (StatusCode::CREATED, Json(json!({ "acknowledged": true }))).into_response()
}

async fn images(
    State(state): Shared,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Err(rejection) = state.authorize(&headers) {
        return rejection;
    }
    let page: usize = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let limit: usize = query.get("limit").and_then(|l| l.parse().ok()).unwrap_or(2);
    let matching: Vec<ImageSummary> = state
        .images
        .lock()
        .iter()
        .filter(|i| query.get("category").map_or(true, |c| &i.category == c))
        .cloned()
        .collect();
    let start = page.saturating_sub(1) * limit;
    let images: Vec<&ImageSummary> = matching.iter().skip(start).take(limit).collect();
    let has_more = start + images.len() < matching.len();
    Json(json!({ "images": images, "hasMore": has_more })).into_response()
}

async fn like(
    State(state): Shared,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = state.authorize(&headers) {
        return rejection;
    }
    let email = body["email"].as_str().unwrap_or_default().to_string();
    let mut likes = state.likes.lock();
    let entry = likes.entry(id).or_default();
    if body["liked"] == true {
        entry.insert(email);
    } else {
        entry.remove(&email);
    }
    Json(json!({ "likes": entry.len() })).into_response()
}

fn favorite_key(body: &Value) -> (String, String) {
    (
        body["email"].as_str().unwrap_or_default().to_string(),
        body["imageId"].as_str().unwrap_or_default().to_string(),
    )
}

async fn add_favorite(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(rejection) = state.authorize(&headers) {
        return rejection;
    }
    let (email, image) = favorite_key(&body);
    state.favorites.lock().entry(email).or_default().insert(image);
    StatusCode::CREATED.into_response()
}

async fn remove_favorite(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(rejection) = state.authorize(&headers) {
        return rejection;
    }
    let (email, image) = favorite_key(&body);
    if let Some(set) = state.favorites.lock().get_mut(&email) {
        set.remove(&image);
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn favorites(State(state): Shared, Path(email): Path<String>, headers: HeaderMap) -> Response {
    if let Err(rejection) = state.authorize(&headers) {
        return rejection;
    }
    let items: Vec<Value> = state
        .favorites
        .lock()
        .get(&email)
        .map(|set| set.iter().map(|id| json!({ "_id": id })).collect())
        .unwrap_or_default();
    Json(Value::Array(items)).into_response()
}

async fn download_free(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(rejection) = state.authorize(&headers) {
        return rejection;
    }
    state.downloads.lock().push(("download-free-image", body));
    (StatusCode::CREATED, Json(json!({ "acknowledged": true }))).into_response()
}

async fn purchase(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(rejection) = state.authorize(&headers) {
        return rejection;
    }
    if body["transactionId"].as_str().is_none() {
        return (StatusCode::BAD_REQUEST, "missing transaction").into_response();
    }
    state.downloads.lock().push(("purchase-image", body));
    (StatusCode::CREATED, Json(json!({ "acknowledged": true }))).into_response()
}

async fn admin_users(
    State(state): Shared,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Err(rejection) = state.authorize_admin(&headers) {
        return rejection;
    }
    let page: usize = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let limit: usize = query.get("limit").and_then(|l| l.parse().ok()).unwrap_or(20);
    let search = query.get("search").cloned().unwrap_or_default();

    let users = state.users.lock();
    let mut emails: Vec<&String> = users.keys().filter(|e| e.contains(&search)).collect();
    emails.sort();
    let rows: Vec<UserRecord> = emails
        .into_iter()
        .skip(page.saturating_sub(1) * limit)
        .take(limit)
        .filter_map(|email| {
            users.get(email).map(|record| UserRecord {
                email: Some(email.clone()),
                ..record.clone()
            })
        })
        .collect();
    Json(json!({ "users": rows })).into_response()
}

async fn change_role(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(rejection) = state.authorize_admin(&headers) {
        return rejection;
    }
    let email = body["email"].as_str().unwrap_or_default();
    let Some(role) = body["role"].as_str().and_then(Role::parse) else {
        return (StatusCode::BAD_REQUEST, "unknown role").into_response();
    };
    let tier = if role == Role::Admin { Tier::Creator } else { Tier::Explorer };

    match state.users.lock().get_mut(email) {
        Some(record) => {
            record.role = Some(role.as_str().to_string());
            record.user_status = Some(tier.as_str().to_string());
            Json(json!({ "modifiedCount": 1 })).into_response()
        }
        None => (StatusCode::NOT_FOUND, "no such user").into_response(),
    }
}

async fn toggle_status(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(rejection) = state.authorize_admin(&headers) {
        return rejection;
    }
    let email = body["email"].as_str().unwrap_or_default();
    let status = body["user_status"].as_str().unwrap_or_default().to_string();

    match state.users.lock().get_mut(email) {
        Some(record) => {
            record.user_status = Some(status);
            Json(json!({ "modifiedCount": 1 })).into_response()
        }
        None => (StatusCode::NOT_FOUND, "no such user").into_response(),
    }
}
