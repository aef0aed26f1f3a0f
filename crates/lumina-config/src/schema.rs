// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration schema.
//!
//! ```yaml
//! api:
//!   base_url: https://api.lumina.example
//!   timeout: 10s
//!
//! entitlement:
//!   fetch_timeout: 5s
//!
//! routes:
//!   - path: /dashboard/*
//!     requirements:
//!       - kind: role_at_least
//!         role: admin
//!
//! logging:
//!   level: info
//!   format: json
//! ```
//!
//! An absent `routes` section means the standard route table.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use lumina_api::ApiConfig;
use lumina_core::{EntitlementConfig, RouteTable};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

// =============================================================================
// LuminaConfig
// =============================================================================

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LuminaConfig {
    /// Backend client settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Entitlement fetch settings.
    #[serde(default)]
    pub entitlement: EntitlementSettings,

    /// Route table override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routes: Option<RouteTable>,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl LuminaConfig {
    /// Validates the whole configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        validate_api(&self.api)?;
        self.entitlement.validate()?;
        if let Some(routes) = &self.routes {
            routes
                .validate()
                .map_err(|e| ConfigError::validation("routes", e.to_string()))?;
        }
        Ok(())
    }

    /// The effective route table.
    pub fn route_table(&self) -> RouteTable {
        self.routes.clone().unwrap_or_else(RouteTable::standard)
    }

    /// Settings for the entitlement fetcher.
    pub fn entitlement_config(&self) -> EntitlementConfig {
        EntitlementConfig {
            fetch_timeout: self.entitlement.fetch_timeout,
        }
    }
}

fn validate_api(api: &ApiConfig) -> ConfigResult<()> {
    let scheme = api.base_url.split_once("://").map(|(scheme, _)| scheme);
    match scheme {
        Some("http") | Some("https") => {}
        _ => {
            return Err(ConfigError::validation(
                "api.base_url",
                format!("expected an http or https URL, got '{}'", api.base_url),
            ))
        }
    }
    if api.timeout.is_zero() {
        return Err(ConfigError::validation(
            "api.timeout",
            "must be greater than zero",
        ));
    }
    Ok(())
}

// =============================================================================
// EntitlementSettings
// =============================================================================

/// Entitlement section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementSettings {
    /// Upper bound for one role/tier fetch. Absent waits indefinitely.
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub fetch_timeout: Option<Duration>,
}

impl EntitlementSettings {
    /// Validates the entitlement settings.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.fetch_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::validation(
                "entitlement.fetch_timeout",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Logging section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Log format.
    #[serde(default)]
    pub format: LogFormat,
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Returns the level as an `EnvFilter` directive.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(ConfigError::validation(
                "logging.level",
                format!("unknown level '{}'", other),
            )),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format.
    #[default]
    #[serde(alias = "pretty")]
    Text,
    /// Compact single-line format.
    Compact,
    /// JSON lines.
    Json,
}

impl LogFormat {
    /// Returns the format name.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Text => "text",
            LogFormat::Compact => "compact",
            LogFormat::Json => "json",
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(ConfigError::validation(
                "logging.format",
                format!("unknown format '{}'", other),
            )),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use lumina_core::RoutePattern;

    #[test]
    fn test_defaults_validate() {
        let config = LuminaConfig::default();
        config.validate().unwrap();
        assert_eq!(config.route_table(), RouteTable::standard());
        assert_eq!(config.entitlement_config().fetch_timeout, None);
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let mut config = LuminaConfig::default();
        config.api.base_url = "ftp://files.test".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "api.base_url"));
    }

    #[test]
    fn test_rejects_zero_timeouts() {
        let mut config = LuminaConfig::default();
        config.api.timeout = Duration::ZERO;
        assert!(config.validate().unwrap_err().is_validation());

        let mut config = LuminaConfig::default();
        config.entitlement.fetch_timeout = Some(Duration::ZERO);
        assert!(config.validate().unwrap_err().is_validation());
    }

    #[test]
    fn test_rejects_route_without_requirements() {
        let mut config = LuminaConfig::default();
        config.routes = Some(RouteTable::new(vec![lumina_core::RouteEntry::new(
            RoutePattern::parse("/vault").unwrap(),
            Vec::new(),
        )]));
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "routes"));
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert!("loud".parse::<LogLevel>().is_err());
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Text);
    }
}
