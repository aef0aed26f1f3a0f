// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # lumina-config
//!
//! Configuration management for the Lumina access resolver.
//!
//! - **Multi-Format Support**: YAML, TOML, and JSON configuration files
//! - **Placeholders**: `${VAR}` and `${VAR:default}` in raw content
//! - **Environment Overrides**: `LUMINA_*` variables win over file values
//! - **Validation**: backend URL, timeouts and route table checks
//!
//! ## Quick Start
//!
//! ```no_run
//! use lumina_config::load_config;
//!
//! let config = load_config("lumina.yaml").unwrap();
//! println!("Backend: {}", config.api.base_url);
//! println!("Routes: {}", config.route_table().len());
//! ```
//!
//! ## Configuration Schema
//!
//! - `api` - backend base URL, request timeout, user agent
//! - `entitlement` - role/tier fetch timeout
//! - `routes` - protected route table (standard table when absent)
//! - `logging` - level and format

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_config, load_config_str, ConfigFormat, ConfigLoader};
pub use schema::{EntitlementSettings, LogFormat, LogLevel, LoggingConfig, LuminaConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
