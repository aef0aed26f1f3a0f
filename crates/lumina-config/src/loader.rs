// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration loading.
//!
//! # Loading Pipeline
//!
//! 1. Resolve `${VAR}` / `${VAR:default}` placeholders in the raw content
//! 2. Parse YAML, TOML or JSON (by file extension)
//! 3. Apply `LUMINA_*` environment overrides
//! 4. Validate
//!
//! # Environment Variable Override
//!
//! ```text
//! LUMINA_API_BASE_URL=https://api.lumina.example
//! LUMINA_API_TIMEOUT=10s
//! LUMINA_ENTITLEMENT_FETCH_TIMEOUT=5s
//! LUMINA_LOG_LEVEL=debug
//! ```

use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use humantime_serde::re::humantime;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::schema::{LogLevel, LuminaConfig};

// =============================================================================
// ConfigLoader
// =============================================================================

/// Configuration loader.
///
/// # Examples
///
/// ```no_run
/// use lumina_config::ConfigLoader;
///
/// let config = ConfigLoader::new().load("lumina.yaml").unwrap();
/// println!("{}", config.api.base_url);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Environment variable prefix.
    env_prefix: String,

    /// Whether to resolve placeholders and apply overrides.
    resolve_env_vars: bool,
}

impl ConfigLoader {
    /// Creates a loader with the `LUMINA` prefix.
    pub fn new() -> Self {
        Self {
            env_prefix: "LUMINA".to_string(),
            resolve_env_vars: true,
        }
    }

    /// Sets the environment variable prefix.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Enables or disables environment variable resolution.
    pub fn with_env_vars(mut self, enabled: bool) -> Self {
        self.resolve_env_vars = enabled;
        self
    }

    /// Loads configuration from a file.
    ///
    /// The format follows the extension: `.yaml`/`.yml`, `.toml` or `.json`.
    pub fn load(&self, path: impl AsRef<Path>) -> ConfigResult<LuminaConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }
        let content = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let format = ConfigFormat::from_path(path)?;

        let config = self.process(&content, format).map_err(|e| match e {
            ConfigError::Serialization { message } => ConfigError::parse(path, message),
            other => other,
        })?;

        info!("Configuration loaded successfully");
        debug!(
            base_url = %config.api.base_url,
            routes = config.route_table().len(),
            "Effective configuration"
        );
        Ok(config)
    }

    /// Loads configuration from a string.
    pub fn load_from_str(&self, content: &str, format: ConfigFormat) -> ConfigResult<LuminaConfig> {
        self.process(content, format)
    }

    fn process(&self, content: &str, format: ConfigFormat) -> ConfigResult<LuminaConfig> {
        let mut config: LuminaConfig = if self.resolve_env_vars {
            parse_str(&resolve_env_placeholders(content), format)?
        } else {
            parse_str(content, format)?
        };

        if self.resolve_env_vars {
            self.apply_env_overrides(&mut config)?;
        }

        config.validate()?;
        Ok(config)
    }

    fn var(&self, key: &str) -> (String, Option<String>) {
        let name = format!("{}_{}", self.env_prefix, key);
        let value = env::var(&name).ok();
        (name, value)
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&self, config: &mut LuminaConfig) -> ConfigResult<()> {
        if let (_, Some(value)) = self.var("API_BASE_URL") {
            config.api.base_url = value;
        }
        if let (name, Some(value)) = self.var("API_TIMEOUT") {
            config.api.timeout = parse_duration(&name, &value)?;
        }
        if let (name, Some(value)) = self.var("ENTITLEMENT_FETCH_TIMEOUT") {
            config.entitlement.fetch_timeout = Some(parse_duration(&name, &value)?);
        }
        if let (name, Some(value)) = self.var("LOG_LEVEL") {
            match value.parse::<LogLevel>() {
                Ok(level) => config.logging.level = level,
                Err(_) => warn!(variable = %name, value = %value, "Ignoring unknown log level"),
            }
        }
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ConfigFormat
// =============================================================================

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format.
    Yaml,
    /// TOML format.
    Toml,
    /// JSON format.
    Json,
}

impl ConfigFormat {
    /// Determines the format from a file path.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("json") => Ok(ConfigFormat::Json),
            Some(other) => Err(ConfigError::unsupported_format(other)),
            None => Err(ConfigError::unsupported_format("(no extension)")),
        }
    }

    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Yaml => "yaml",
            ConfigFormat::Toml => "toml",
            ConfigFormat::Json => "json",
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn parse_str<T: DeserializeOwned>(content: &str, format: ConfigFormat) -> ConfigResult<T> {
    match format {
        ConfigFormat::Yaml => yaml_parse(content),
        ConfigFormat::Toml => {
            toml::from_str(content).map_err(|e| ConfigError::serialization(e.to_string()))
        }
        ConfigFormat::Json => {
            serde_json::from_str(content).map_err(|e| ConfigError::serialization(e.to_string()))
        }
    }
}

/// YAML goes through the `config` crate.
fn yaml_parse<T: DeserializeOwned>(content: &str) -> ConfigResult<T> {
    let config = config::Config::builder()
        .add_source(config::File::from_str(content, config::FileFormat::Yaml))
        .build()
        .map_err(|e| ConfigError::serialization(e.to_string()))?;

    config
        .try_deserialize()
        .map_err(|e| ConfigError::serialization(e.to_string()))
}

fn parse_duration(name: &str, value: &str) -> ConfigResult<Duration> {
    humantime::parse_duration(value.trim())
        .map_err(|e| ConfigError::invalid_env_var(name, format!("expected a duration: {}", e)))
}

/// Resolves `${VAR_NAME}` and `${VAR_NAME:default}`.
///
/// Unset variables without a default and unterminated placeholders are kept
/// verbatim.
fn resolve_env_placeholders(content: &str) -> String {
    let mut result = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            result.push_str(&rest[start..]);
            return result;
        };

        let body = &after[..end];
        let (name, default) = match body.split_once(':') {
            Some((name, default)) => (name, Some(default)),
            None => (body, None),
        };

        match (env::var(name), default) {
            (Ok(value), _) => result.push_str(&value),
            (Err(_), Some(default)) => result.push_str(default),
            (Err(_), None) => {
                warn!("Environment variable '{}' not found", name);
                result.push_str(&rest[start..start + 2 + end + 1]);
            }
        }
        rest = &after[end + 1..];
    }

    result.push_str(rest);
    result
}

// =============================================================================
// Convenience Functions
// =============================================================================

/// Loads configuration from a file with default settings.
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<LuminaConfig> {
    ConfigLoader::new().load(path)
}

/// Loads configuration from a string with the specified format.
pub fn load_config_str(content: &str, format: ConfigFormat) -> ConfigResult<LuminaConfig> {
    ConfigLoader::new().load_from_str(content, format)
}

// =============================================================================
// Tests
// =============================================================================
