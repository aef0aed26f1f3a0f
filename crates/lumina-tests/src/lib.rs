// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Lumina Integration Tests
//!
//! Cross-crate tests for the Lumina session and access-control resolver,
//! together with the mocks and fixtures they share.
//!
//! ## Module Structure
//!
//! - [`common`]: Shared test utilities
//!   - `fixtures`: Account records, configuration documents, contexts
//!   - `assertions`: Decision and outcome assertions
//!   - `mocks`: In-memory identity provider and backends
//!   - `backend`: In-process HTTP backend for end-to-end runs
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all integration tests
//! cargo test -p lumina-tests
//!
//! # Run specific test suite
//! cargo test -p lumina-tests --test integration_session
//! cargo test -p lumina-tests --test integration_guard
//! cargo test -p lumina-tests --test integration_engagement
//! cargo test -p lumina-tests --test integration_config
//! cargo test -p lumina-tests --test integration_api
//! ```
//!
//! ## Test Categories
//!
//! ### Session Tests (`integration_session.rs`)
//! - Provider subscription and the loading state
//! - Sign-in, registration, profile updates, sign-out
//!
//! ### Guard Tests (`integration_guard.rs`)
//! - Route table decisions for each account kind
//! - Loading, deduplicated fetches, account switches
//!
//! ### Engagement Tests (`integration_engagement.rs`)
//! - Optimistic likes, favorites and tier upgrades
//! - Paged gallery feed
//!
//! ### Config Tests (`integration_config.rs`)
//! - YAML/TOML/JSON loading, overrides, validation
//!
//! ### API Tests (`integration_api.rs`)
//! - The REST client driving a full access context
//!
//! ## Writing New Tests
//!
//! ```rust,ignore
//! use lumina_tests::prelude::*;
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let env = AccessFixture::signed_in("artist@x.com", Fixtures::artist());
//!     let mut guard = env.context.guard("/dashboard/user-gallery/add-image");
//!     assert_allowed(&guard.resolve().await);
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod common;

/// Re-export commonly used items for convenience.
pub mod prelude {
    pub use crate::common::assertions::*;
    pub use crate::common::backend::*;
    pub use crate::common::fixtures::*;
    pub use crate::common::mocks::*;
    pub use crate::common::{init_test_logging, temp_test_dir};
}
