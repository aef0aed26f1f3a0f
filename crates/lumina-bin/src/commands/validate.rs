// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `validate` command.

use anyhow::Context;
use lumina_config::load_config;

use crate::cli::{Cli, OutputFormat, ValidateArgs};
use crate::error::{BinError, BinResult};

/// Loads and validates the configuration file.
///
/// Unlike other commands this requires the file to exist.
pub fn validate(cli: &Cli, args: &ValidateArgs) -> BinResult<()> {
    let config_path = cli.config_path();

    if !config_path.exists() {
        return Err(BinError::config(format!(
            "Configuration file not found: {}",
            config_path.display()
        )));
    }

    let config = load_config(config_path).map_err(|e| {
        BinError::config(format!("Configuration validation failed: {}", e))
    })?;

    let routes = config.route_table();
    let fetch_timeout = config
        .entitlement
        .fetch_timeout
        .map(|t| format!("{:?}", t))
        .unwrap_or_else(|| "none".to_string());

    match args.format {
        OutputFormat::Text => {
            println!("✓ Configuration is valid: {}", config_path.display());
            println!();
            println!("Summary:");
            println!("  Backend: {}", config.api.base_url);
            println!("  Request timeout: {:?}", config.api.timeout);
            println!("  Entitlement timeout: {}", fetch_timeout);
            println!(
                "  Routes: {} ({})",
                routes.len(),
                if config.routes.is_some() { "configured" } else { "standard" }
            );
            println!("  Logging: {} / {}", config.logging.level, config.logging.format);

            if args.show_config {
                println!();
                println!("Parsed configuration:");
                let text =
                    serde_json::to_string_pretty(&config).context("serializing configuration")?;
                println!("{}", text);
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "valid": true,
                "config_path": config_path.display().to_string(),
                "summary": {
                    "base_url": config.api.base_url,
                    "route_count": routes.len(),
                    "custom_routes": config.routes.is_some(),
                    "entitlement_timeout": fetch_timeout,
                },
                "config": if args.show_config { Some(&config) } else { None },
            });
            let text = serde_json::to_string_pretty(&output).context("serializing result")?;
            println!("{}", text);
        }
    }

    Ok(())
}
