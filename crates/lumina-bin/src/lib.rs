// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # lumina-bin
//!
//! Command-line tools for the Lumina access resolver.
//!
//! ## Architecture
//!
//! ```text
//!        main.rs ──▶ cli.rs ──▶ load_config ──▶ init_logging
//!                                   │
//!                          ┌────────┼─────────┬──────────┐
//!                          ▼        ▼         ▼          ▼
//!                        check   resolve    routes    validate
//!                          │        │
//!                       evaluate  AccessContext + ApiClient
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Would an explorer reach the upload form?
//! lumina check /dashboard/user-gallery/add-image --email a@x.com --tier explorer
//!
//! # Ask the backend
//! lumina resolve /dashboard/admin-dashboard/users --email a@x.com --token "$TOKEN"
//!
//! # Inspect and validate configuration
//! lumina -c lumina.yaml routes
//! lumina -c lumina.yaml validate --show-config
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod provider;

// =============================================================================
// Re-exports
// =============================================================================

pub use cli::{Cli, Commands};
pub use error::{BinError, BinResult};
pub use logging::init_logging;
pub use provider::StaticTokenProvider;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Loads configuration, initializes logging and runs the selected command.
pub async fn run(cli: Cli) -> BinResult<()> {
    let config = cli.load_config()?;
    init_logging(
        cli.effective_log_level(&config),
        cli.effective_log_format(&config),
    );
    commands::execute(&cli, config).await
}
