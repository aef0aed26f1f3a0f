// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! API client error types.
//!
//! [`ApiError`] maps backend HTTP statuses into variants and converts into the
//! domain errors of `lumina-core` at the trait boundary.

use std::time::Duration;

use lumina_core::{EntitlementError, MutationError, SessionError, FORBIDDEN_PATH, LOGIN_PATH};
use thiserror::Error;

/// Result type alias for API client operations.
pub type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// ApiError
// =============================================================================

/// Errors returned by [`ApiClient`](crate::ApiClient).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The token was rejected (401). The session has been signed out.
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Response message.
        message: String,
    },

    /// The identity lacks permission (403).
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Response message.
        message: String,
    },

    /// Resource not found (404).
    #[error("Resource not found: {resource}")]
    NotFound {
        /// Request path.
        resource: String,
    },

    /// Any other non-success status.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response message.
        message: String,
    },

    /// The request did not complete within the configured timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Connection or protocol failure.
    #[error("Transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("Invalid response body: {message}")]
    Decode {
        /// Error message.
        message: String,
    },

    /// The base URL or a request path is malformed.
    #[error("Invalid URL: {message}")]
    InvalidUrl {
        /// Error message.
        message: String,
    },

    /// The identity provider could not issue a token.
    #[error("Token unavailable: {0}")]
    Token(#[from] SessionError),
}

impl ApiError {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Maps a non-success status to an error.
    pub fn from_status(status: u16, resource: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => Self::Unauthorized { message },
            403 => Self::Forbidden { message },
            404 => Self::NotFound {
                resource: resource.to_string(),
            },
            _ => Self::Http { status, message },
        }
    }

    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(message: impl Into<String>) -> Self {
        Self::InvalidUrl {
            message: message.into(),
        }
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// HTTP status, if the backend answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(401),
            Self::Forbidden { .. } => Some(403),
            Self::NotFound { .. } => Some(404),
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Where the host should navigate: `/login` for 401, `/forbidden` for 403.
    pub fn redirect(&self) -> Option<&'static str> {
        match self {
            Self::Unauthorized { .. } => Some(LOGIN_PATH),
            Self::Forbidden { .. } => Some(FORBIDDEN_PATH),
            _ => None,
        }
    }

    /// Returns `true` if the request may succeed when repeated.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Transport { .. } => true,
            Self::Http { status, .. } => *status >= 500 || *status == 429,
            Self::Token(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Returns the error type name for logging.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "unauthorized",
            Self::Forbidden { .. } => "forbidden",
            Self::NotFound { .. } => "not_found",
            Self::Http { .. } => "http",
            Self::Timeout(_) => "timeout",
            Self::Transport { .. } => "transport",
            Self::Decode { .. } => "decode",
            Self::InvalidUrl { .. } => "invalid_url",
            Self::Token(_) => "token",
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::decode(e.to_string())
        } else if e.is_builder() {
            Self::invalid_url(e.to_string())
        } else {
            Self::transport(e.to_string())
        }
    }
}

// =============================================================================
// Domain Conversions
// =============================================================================

impl From<ApiError> for EntitlementError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::NotFound { resource } => EntitlementError::not_found(resource),
            ApiError::Timeout(limit) => EntitlementError::timeout(limit),
            ApiError::Decode { message } => EntitlementError::decode(message),
            ApiError::Transport { message } | ApiError::InvalidUrl { message } => {
                EntitlementError::transport(message)
            }
            ApiError::Token(e) => EntitlementError::transport(e.to_string()),
            other => {
                let status = other.status().unwrap_or(500);
                EntitlementError::http(status, other.to_string())
            }
        }
    }
}

impl From<ApiError> for MutationError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Timeout(_)
            | ApiError::Transport { .. }
            | ApiError::InvalidUrl { .. }
            | ApiError::Decode { .. } => MutationError::transport(e.to_string()),
            ApiError::Token(SessionError::NotSignedIn) => MutationError::NotSignedIn,
            ApiError::Token(e) => MutationError::transport(e.to_string()),
            other => {
                let status = other.status().unwrap_or(500);
                MutationError::http(status, other.to_string())
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
