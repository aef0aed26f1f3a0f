// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI argument parsing and command definitions.
//!
//! - `check`: Evaluate a path for a given role and tier (offline)
//! - `resolve`: Evaluate a path for an account, fetching its record
//! - `routes`: Print the effective route table
//! - `validate`: Validate configuration file
//! - `version`: Show version information

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use lumina_config::{ConfigFormat, ConfigLoader, LogFormat, LogLevel, LuminaConfig};
use lumina_core::{Role, Tier};

use crate::error::BinResult;

/// Configuration file used when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "lumina.yaml";

// =============================================================================
// Main CLI Structure
// =============================================================================

/// Lumina - session and access-control resolver for the gallery client
#[derive(Parser, Debug)]
#[command(
    name = "lumina",
    author = "Sylvex <contact@sylvex.io>",
    version = lumina_core::VERSION,
    about = "Route access resolution for the Lumina gallery",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    /// Configuration file path (default: lumina.yaml if present)
    #[arg(short, long, env = "LUMINA_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<LogLevel>,

    /// Log format (text, json, compact)
    #[arg(long, env = "LUMINA_LOG_FORMAT", global = true)]
    pub log_format: Option<LogFormat>,

    /// Enable quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

// =============================================================================
// Subcommands
// =============================================================================

/// Available subcommands for the Lumina CLI.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Evaluate access to a path
    ///
    /// Runs the access policy for the given role and tier without contacting
    /// the backend. Without `--email` the visitor is signed out.
    Check(CheckArgs),

    /// Resolve access for an account against the backend
    ///
    /// Fetches the account's role and tier with the given bearer token, then
    /// evaluates the path through a route guard.
    Resolve(ResolveArgs),

    /// Print the effective route table
    Routes(RoutesArgs),

    /// Validate the configuration file
    Validate(ValidateArgs),

    /// Show detailed version information
    Version,
}

// =============================================================================
// Command Arguments
// =============================================================================

/// Arguments for the `check` command.
#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Path to evaluate, e.g. `/dashboard/user-gallery/add-image`
    pub path: String,

    /// Signed-in email; omit for a signed-out visitor
    #[arg(short, long)]
    pub email: Option<String>,

    /// Role of the signed-in account
    #[arg(long, requires = "email", value_parser = parse_role)]
    pub role: Option<Role>,

    /// Tier of the signed-in account
    #[arg(long, requires = "email", value_parser = parse_tier)]
    pub tier: Option<Tier>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the `resolve` command.
#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    /// Path to evaluate
    pub path: String,

    /// Signed-in email
    #[arg(short, long)]
    pub email: String,

    /// Bearer token for the backend
    #[arg(short, long, env = "LUMINA_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Give up after this many seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

impl ResolveArgs {
    /// Overall deadline for the resolution.
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

/// Arguments for the `routes` command.
#[derive(Args, Debug, Clone, Default)]
pub struct RoutesArgs {
    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the `validate` command.
#[derive(Args, Debug, Clone, Default)]
pub struct ValidateArgs {
    /// Show parsed configuration after validation
    #[arg(short, long)]
    pub show_config: bool,

    /// Output format for validation results
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

// =============================================================================
// Enums
// =============================================================================

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for programmatic parsing
    Json,
}

fn parse_role(s: &str) -> Result<Role, String> {
    Role::parse(s).ok_or_else(|| format!("unknown role '{}' (expected user or admin)", s))
}

fn parse_tier(s: &str) -> Result<Tier, String> {
    Tier::parse(s)
        .ok_or_else(|| format!("unknown tier '{}' (expected explorer, artist or creator)", s))
}

// =============================================================================
// Helper Methods
// =============================================================================

impl Cli {
    /// Parse CLI arguments from the command line.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The configuration file to read.
    pub fn config_path(&self) -> &Path {
        self.config
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH))
    }

    /// Loads the configuration.
    ///
    /// An explicit `--config` must exist. Without one, a missing default file
    /// yields the defaults with environment overrides applied.
    pub fn load_config(&self) -> BinResult<LuminaConfig> {
        let path = self.config_path();
        let loader = ConfigLoader::new();
        if self.config.is_none() && !path.exists() {
            return Ok(loader.load_from_str("{}", ConfigFormat::Json)?);
        }
        Ok(loader.load(path)?)
    }

    /// Get the effective log level based on flags.
    pub fn effective_log_level(&self, config: &LuminaConfig) -> LogLevel {
        if self.quiet {
            LogLevel::Warn
        } else if self.verbose {
            LogLevel::Debug
        } else {
            self.log_level.unwrap_or(config.logging.level)
        }
    }

    /// Get the effective log format.
    pub fn effective_log_format(&self, config: &LuminaConfig) -> LogFormat {
        self.log_format.unwrap_or(config.logging.format)
    }
}

// =============================================================================
// Tests
// =============================================================================
