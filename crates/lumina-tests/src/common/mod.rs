// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Common Test Utilities
//!
//! Shared mocks, fixtures and helpers for the integration suites.
//!
//! ## Module Structure
//!
//! - `fixtures`: Pre-built records, configuration documents and contexts
//! - `assertions`: Custom assertion helpers
//! - `mocks`: Mock collaborators with call recording and error injection
//! - `backend`: Axum server speaking the Lumina REST contract

pub mod assertions;
pub mod backend;
pub mod fixtures;
pub mod mocks;

pub use assertions::*;
pub use backend::*;
pub use fixtures::*;
pub use mocks::*;

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Initialize test logging. Call this at the start of each test.
pub fn init_test_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("warn,lumina=debug")),
            )
            .with_test_writer()
            .init();
    });
}

/// Create a temporary directory for test data.
pub fn temp_test_dir(prefix: &str) -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .expect("Failed to create temp directory")
}
