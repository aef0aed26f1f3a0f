// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Unified error hierarchy for Lumina.
//!
//! # Error Hierarchy
//!
//! ```text
//! LuminaError (root)
//! ├── SessionError      - Identity provider operations (sign-in, sign-out, ...)
//! ├── EntitlementError  - Role/tier resolution against the backend
//! ├── MutationError     - Optimistic mutations (likes, favorites, tier)
//! └── PricingError      - Listing price validation
//! ```
//!
//! Session errors are surfaced to the action that caused them. Entitlement
//! errors are recovered locally by falling back to least privilege. Policy
//! evaluation has no error type because it cannot fail.
//!
//! # Examples
//!
//! ```
//! use lumina_core::error::{LuminaError, EntitlementError};
//! use std::time::Duration;
//!
//! let error = EntitlementError::timeout(Duration::from_secs(5));
//! assert!(error.is_retryable());
//!
//! let root: LuminaError = error.into();
//! assert_eq!(root.error_type(), "entitlement");
//! ```

use std::time::Duration;

use thiserror::Error;

/// Result type alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Result type alias for entitlement operations.
pub type EntitlementResult<T> = Result<T, EntitlementError>;

/// Result type alias for optimistic mutations.
pub type MutationResult<T> = Result<T, MutationError>;

/// Result type alias for listing prices.
pub type PricingResult<T> = Result<T, PricingError>;

// =============================================================================
// LuminaError - Root Error Type
// =============================================================================

/// The root error type for Lumina.
#[derive(Debug, Error)]
pub enum LuminaError {
    /// Session error.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Entitlement error.
    #[error("Entitlement error: {0}")]
    Entitlement(#[from] EntitlementError),

    /// Mutation error.
    #[error("Mutation error: {0}")]
    Mutation(#[from] MutationError),

    /// Pricing error.
    #[error("Pricing error: {0}")]
    Pricing(#[from] PricingError),
}

impl LuminaError {
    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            LuminaError::Session(e) => e.is_retryable(),
            LuminaError::Entitlement(e) => e.is_retryable(),
            LuminaError::Mutation(e) => e.is_retryable(),
            LuminaError::Pricing(_) => false,
        }
    }

    /// Returns a user-facing error message.
    pub fn user_message(&self) -> String {
        match self {
            LuminaError::Session(e) => e.user_message(),
            LuminaError::Entitlement(_) => "Could not load your account details.".to_string(),
            LuminaError::Mutation(e) => e.user_message(),
            LuminaError::Pricing(e) => e.to_string(),
        }
    }

    /// Returns the error type as a string for logging.
    pub fn error_type(&self) -> &'static str {
        match self {
            LuminaError::Session(_) => "session",
            LuminaError::Entitlement(_) => "entitlement",
            LuminaError::Mutation(_) => "mutation",
            LuminaError::Pricing(_) => "pricing",
        }
    }
}

// =============================================================================
// SessionError
// =============================================================================

/// Errors reported by the identity provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// Wrong email or password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// An account already exists for the email.
    #[error("Account already exists: {email}")]
    AccountExists {
        /// The email that is taken.
        email: String,
    },

    /// The user closed the popup or cancelled the flow.
    #[error("Sign-in cancelled")]
    Cancelled,

    /// The operation needs a signed-in identity.
    #[error("Not signed in")]
    NotSignedIn,

    /// The provider rejected the request for another reason.
    #[error("Identity provider rejected the request: {message}")]
    Rejected {
        /// Provider message.
        message: String,
    },

    /// The provider could not be reached.
    #[error("Identity provider unavailable: {message}")]
    Unavailable {
        /// Error message.
        message: String,
    },
}

impl SessionError {
    /// Creates a rejected error.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Returns `true` if a later attempt may succeed unchanged.
    ///
    /// Session operations are never retried automatically; this only tells
    /// the form whether to offer "try again".
    pub fn is_retryable(&self) -> bool {
        matches!(self, SessionError::Unavailable { .. })
    }

    /// Returns the inline message shown on the login/register form.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::InvalidCredentials => "Email or password is incorrect.".to_string(),
            SessionError::AccountExists { .. } => {
                "An account with this email already exists.".to_string()
            }
            SessionError::Cancelled => "Sign-in was cancelled.".to_string(),
            SessionError::NotSignedIn => "Please sign in first.".to_string(),
            SessionError::Rejected { message } => message.clone(),
            SessionError::Unavailable { .. } => {
                "Sign-in service is unavailable. Please try again.".to_string()
            }
        }
    }
}

// =============================================================================
// EntitlementError
// =============================================================================

/// Errors while resolving role and tier for an email.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EntitlementError {
    /// No record exists for the email yet.
    #[error("No user record for {email}")]
    NotFound {
        /// The email that was looked up.
        email: String,
    },

    /// The backend answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response message.
        message: String,
    },

    /// The request never produced a response.
    #[error("Transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("Failed to decode user record: {message}")]
    Decode {
        /// Error message.
        message: String,
    },

    /// The fetch did not settle in time.
    #[error("Entitlement fetch timed out after {0:?}")]
    Timeout(Duration),
}

impl EntitlementError {
    /// Creates a not found error.
    pub fn not_found(email: impl Into<String>) -> Self {
        Self::NotFound {
            email: email.into(),
        }
    }

    /// Creates an HTTP error.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
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

    /// Creates a timeout error.
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout(duration)
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            EntitlementError::Transport { .. } | EntitlementError::Timeout(_) => true,
            EntitlementError::Http { status, .. } => *status >= 500,
            EntitlementError::NotFound { .. } | EntitlementError::Decode { .. } => false,
        }
    }

    /// Returns `true` if the backend simply has no record yet.
    pub fn is_not_found(&self) -> bool {
        matches!(self, EntitlementError::NotFound { .. })
    }
}

// =============================================================================
// MutationError
// =============================================================================

/// Errors from mutating requests that back an optimistic patch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MutationError {
    /// The backend accepted the request but changed nothing.
    #[error("Mutation not applied: {message}")]
    NotApplied {
        /// Error message.
        message: String,
    },

    /// The backend refused the request.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response message.
        message: String,
    },

    /// The request never produced a response.
    #[error("Transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
    },

    /// The mutation needs a signed-in identity.
    #[error("Not signed in")]
    NotSignedIn,
}

impl MutationError {
    /// Creates a not-applied error.
    pub fn not_applied(message: impl Into<String>) -> Self {
        Self::NotApplied {
            message: message.into(),
        }
    }

    /// Creates an HTTP error.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            MutationError::Transport { .. } => true,
            MutationError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns a user-facing error message.
    pub fn user_message(&self) -> String {
        match self {
            MutationError::NotApplied { .. } => "Nothing was updated.".to_string(),
            MutationError::Http { status: 403, .. } => {
                "You do not have access to do that.".to_string()
            }
            MutationError::Http { .. } | MutationError::Transport { .. } => {
                "Something went wrong, your change was undone.".to_string()
            }
            MutationError::NotSignedIn => "Please sign in first.".to_string(),
        }
    }
}

// =============================================================================
// PricingError
// =============================================================================

/// Rejected listing prices.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PricingError {
    /// The price is not a number.
    #[error("Price is not a number: {input}")]
    NotANumber {
        /// Raw input.
        input: String,
    },

    /// The price is below zero.
    #[error("Price cannot be negative: {price}")]
    Negative {
        /// Rejected price.
        price: f64,
    },

    /// The discount is outside 0..=100.
    #[error("Discount must be between 0 and 100 percent: {percent}")]
    DiscountOutOfRange {
        /// Rejected discount.
        percent: f64,
    },
}

// =============================================================================
// Tests
// =============================================================================
