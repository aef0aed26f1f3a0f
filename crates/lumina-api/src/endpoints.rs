// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Backend trait implementations for [`ApiClient`].

use async_trait::async_trait;
use lumina_core::{
    ActivationReceipt, AdminApi, DownloadApi, DownloadRecord, EngagementApi, EntitlementApi,
    EntitlementError, EntitlementResult, FeedFilters, FeedPage, GalleryApi, ImageId,
    MutationResult, PaymentRecord, Role, SubscriptionApi, UserQuery, UserRecord, UserStatus,
};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::debug;
use urlencoding::encode;

use crate::client::ApiClient;
use crate::error::{ApiError, ApiResult};

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct UpdateResult {
    #[serde(rename = "modifiedCount", default)]
    modified_count: u64,
}

#[derive(Debug, Serialize)]
struct LikeRequest<'a> {
    email: &'a str,
    liked: bool,
}

#[derive(Debug, Deserialize)]
struct LikeResponse {
    #[serde(alias = "count")]
    likes: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FavoriteRequest<'a> {
    email: &'a str,
    image_id: &'a ImageId,
}

#[derive(Debug, Deserialize)]
struct FavoriteItem {
    #[serde(rename = "_id")]
    id: ImageId,
}

#[derive(Debug, Deserialize)]
struct UsersPage {
    #[serde(default)]
    users: Vec<UserRecord>,
}

#[derive(Debug, Serialize)]
struct RoleRequest<'a> {
    email: &'a str,
    role: Role,
}

#[derive(Debug, Serialize)]
struct StatusRequest<'a> {
    email: &'a str,
    user_status: &'a str,
}

// =============================================================================
// Entitlement
// =============================================================================

impl ApiClient {
    /// `GET /users/{email}`. `None` when the backend has no record.
    pub async fn user(&self, email: &str) -> ApiResult<Option<UserRecord>> {
        let path = format!("users/{}", encode(email));
        let builder = self.request(Method::GET, &path)?;
        let response = self.execute(&path, builder).await?;

        // Unknown emails come back as `null` or an empty body.
        let body = response.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        serde_json::from_slice(&body).map_err(|e| ApiError::decode(e.to_string()))
    }
}

#[async_trait]
impl EntitlementApi for ApiClient {
    async fn fetch_user(&self, email: &str) -> EntitlementResult<UserRecord> {
        match self.user(email).await {
            Ok(Some(record)) => Ok(record),
            Ok(None) => Err(EntitlementError::not_found(email)),
            Err(e) => {
                let e = EntitlementError::from(e);
                if e.is_not_found() {
                    Err(EntitlementError::not_found(email))
                } else {
                    Err(e)
                }
            }
        }
    }

    fn name(&self) -> &str {
        "rest-users"
    }
}

// =============================================================================
// Subscription
// =============================================================================

#[async_trait]
impl SubscriptionApi for ApiClient {
    async fn record_payment(&self, record: &PaymentRecord) -> MutationResult<()> {
        let path = "payments";
        let builder = self.request(Method::POST, path)?.json(record);
        self.execute(path, builder).await?;
        Ok(())
    }

    async fn activate_premium(&self, receipt: &ActivationReceipt) -> MutationResult<u64> {
        let path = "users/premium";
        let builder = self.request(Method::PATCH, path)?.json(receipt);
        let response = self.execute(path, builder).await?;
        let result: UpdateResult = Self::decode(response).await?;
        debug!(email = %receipt.email, modified = result.modified_count, "Premium update");
        Ok(result.modified_count)
    }

    fn name(&self) -> &str {
        "rest-subscriptions"
    }
}

// =============================================================================
// Engagement
// =============================================================================

#[async_trait]
impl EngagementApi for ApiClient {
    async fn set_like(&self, image: &ImageId, email: &str, liked: bool) -> MutationResult<u64> {
        let path = format!("images/{}/like", encode(image.as_str()));
        let builder = self
            .request(Method::PATCH, &path)?
            .json(&LikeRequest { email, liked });
        let response = self.execute(&path, builder).await?;
        let body: LikeResponse = Self::decode(response).await?;
        Ok(body.likes)
    }

    async fn set_favorite(&self, email: &str, image: &ImageId, favorite: bool) -> MutationResult<()> {
        let path = "images/favorites";
        let method = if favorite { Method::POST } else { Method::DELETE };
        let builder = self.request(method, path)?.json(&FavoriteRequest {
            email,
            image_id: image,
        });
        self.execute(path, builder).await?;
        Ok(())
    }

    async fn favorites(&self, email: &str) -> MutationResult<Vec<ImageId>> {
        let path = format!("images/favorites/{}", encode(email));
        let builder = self.request(Method::GET, &path)?;
        let response = self.execute(&path, builder).await?;
        let items: Vec<FavoriteItem> = Self::decode(response).await?;
        Ok(items.into_iter().map(|item| item.id).collect())
    }

    fn name(&self) -> &str {
        "rest-engagement"
    }
}

// =============================================================================
// Gallery
// =============================================================================

#[async_trait]
impl GalleryApi for ApiClient {
    async fn page(&self, page: u32, filters: &FeedFilters) -> MutationResult<FeedPage> {
        let path = "images";
        let page = page.to_string();
        let mut query = vec![("page", page.as_str())];
        query.extend(filters.query_pairs());

        let builder = self.request(Method::GET, path)?.query(&query);
        let response = self.execute(path, builder).await?;
        Ok(Self::decode(response).await?)
    }

    fn name(&self) -> &str {
        "rest-gallery"
    }
}

// =============================================================================
// Downloads
// =============================================================================

#[async_trait]
impl DownloadApi for ApiClient {
    async fn record_free_download(&self, record: &DownloadRecord) -> MutationResult<()> {
        let path = "download-free-image";
        let builder = self.request(Method::POST, path)?.json(record);
        self.execute(path, builder).await?;
        Ok(())
    }

    async fn record_purchase(&self, record: &DownloadRecord) -> MutationResult<()> {
        let path = "purchase-image";
        let builder = self.request(Method::POST, path)?.json(record);
        self.execute(path, builder).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "rest-downloads"
    }
}

// =============================================================================
// Admin
// =============================================================================

#[async_trait]
impl AdminApi for ApiClient {
    async fn users(&self, query: &UserQuery) -> MutationResult<Vec<UserRecord>> {
        let path = "admin/users";
        let page = query.page.to_string();
        let limit = query.limit.to_string();
        let params = [
            ("page", page.as_str()),
            ("limit", limit.as_str()),
            ("search", query.search.as_str()),
        ];
        let builder = self.request(Method::GET, path)?.query(&params);
        let response = self.execute(path, builder).await?;
        let body: UsersPage = Self::decode(response).await?;
        Ok(body.users)
    }

    async fn change_role(&self, email: &str, role: Role) -> MutationResult<()> {
        let path = "admin/change-role";
        let builder = self
            .request(Method::POST, path)?
            .json(&RoleRequest { email, role });
        self.execute(path, builder).await?;
        debug!(email, %role, "Role change sent");
        Ok(())
    }

    async fn set_status(&self, email: &str, status: UserStatus) -> MutationResult<()> {
        let path = "admin/toggle-status";
        let builder = self.request(Method::POST, path)?.json(&StatusRequest {
            email,
            user_status: status.as_str(),
        });
        self.execute(path, builder).await?;
        debug!(email, %status, "Status change sent");
        Ok(())
    }

    fn name(&self) -> &str {
        "rest-admin"
    }
}
