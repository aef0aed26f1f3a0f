// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # lumina-api
//!
//! REST client for the Lumina gallery backend.
//!
//! [`ApiClient`] attaches the signed-in identity's bearer token to every
//! request. A `401` response signs the shared session out; `401` and `403`
//! errors carry the redirect the host should perform.
//!
//! The client implements the backend traits of `lumina-core`:
//! `EntitlementApi`, `EngagementApi`, `SubscriptionApi` and `GalleryApi`.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod error;

mod endpoints;

pub use client::ApiClient;
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
