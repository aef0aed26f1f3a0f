// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Authenticated HTTP client.
//!
//! # Request Flow
//!
//! ```text
//!   request ──▶ id_token() ──▶ Authorization: Bearer ──▶ send
//!                                                         │
//!            2xx ◀─────────────────────────────────────── status
//!            401 ──▶ session.sign_out() ──▶ ApiError::Unauthorized (/login)
//!            403 ──▶ ApiError::Forbidden (/forbidden)
//! ```

use std::fmt;
use std::sync::Arc;

use lumina_core::SessionStore;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};

/// REST client bound to one backend and one session.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    config: ApiConfig,
    session: Arc<SessionStore>,
}

impl ApiClient {
    /// Creates a client. Tokens come from the session's identity provider.
    pub fn new(config: ApiConfig, session: Arc<SessionStore>) -> ApiResult<Self> {
        let mut base_url = Url::parse(&config.base_url)
            .map_err(|e| ApiError::invalid_url(format!("{}: {}", config.base_url, e)))?;
        // Relative joins keep the last path segment only with a trailing slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ApiError::invalid_url(format!(
                "unsupported scheme: {}",
                base_url.scheme()
            )));
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            http,
            base_url,
            config,
            session,
        })
    }

    /// Client configuration.
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Base URL all request paths are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The session this client signs out on `401`.
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    // =========================================================================
    // Request Helpers
    // =========================================================================

    /// Resolves `path` against the base URL.
    pub fn url(&self, path: &str) -> ApiResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::invalid_url(format!("{}: {}", path, e)))
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> ApiResult<RequestBuilder> {
        Ok(self.http.request(method, self.url(path)?))
    }

    /// Attaches the bearer token, sends, and maps non-success statuses.
    pub(crate) async fn execute(&self, path: &str, builder: RequestBuilder) -> ApiResult<Response> {
        let builder = match self.session.provider().id_token().await? {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout(self.config.timeout)
            } else {
                ApiError::from(e)
            }
        })?;

        let status = response.status();
        debug!(path, status = status.as_u16(), "API response");
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        let error = ApiError::from_status(status.as_u16(), path, message);
        match &error {
            ApiError::Unauthorized { .. } => {
                warn!(path, "Token rejected, signing out");
                if let Err(e) = self.session.sign_out().await {
                    warn!(error = %e, "Sign-out after 401 failed");
                }
            }
            ApiError::Forbidden { .. } => warn!(path, "Request forbidden"),
            _ => {}
        }
        Err(error)
    }

    pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::decode(e.to_string()))
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.config.timeout)
            .finish()
    }
}
