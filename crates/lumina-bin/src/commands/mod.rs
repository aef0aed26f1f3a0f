// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI command implementations.

mod check;
mod resolve;
mod routes;
mod validate;
mod version;

pub use check::check;
pub use resolve::resolve;
pub use routes::routes;
pub use validate::validate;
pub use version::version;

use anyhow::Context;
use lumina_config::LuminaConfig;
use lumina_core::AccessDecision;

use crate::cli::{Cli, Commands, OutputFormat};
use crate::error::BinResult;

/// Executes the appropriate command based on CLI arguments.
pub async fn execute(cli: &Cli, config: LuminaConfig) -> BinResult<()> {
    match &cli.command {
        Commands::Check(args) => check::check(&config, args),
        Commands::Resolve(args) => resolve::resolve(&config, args).await,
        Commands::Routes(args) => routes::routes(&config, args),
        Commands::Validate(args) => validate::validate(cli, args),
        Commands::Version => version::version(),
    }
}

/// One-line summary of a decision.
pub(crate) fn describe(decision: &AccessDecision) -> String {
    if decision.is_allowed() {
        return "allow".to_string();
    }
    let mut line = format!("redirect to {}", decision.redirect_to().unwrap_or("?"));
    if let Some(path) = decision.return_path() {
        line.push_str(&format!(" (return to {})", path));
    }
    if let Some(requirement) = decision.denied_by() {
        line.push_str(&format!(" [failed: {}]", requirement));
    }
    line
}

pub(crate) fn print_decision(
    path: &str,
    decision: &AccessDecision,
    format: OutputFormat,
) -> BinResult<()> {
    match format {
        OutputFormat::Text => println!("{}: {}", path, describe(decision)),
        OutputFormat::Json => {
            let output = serde_json::json!({ "path": path, "decision": decision });
            let text = serde_json::to_string_pretty(&output).context("serializing decision")?;
            println!("{}", text);
        }
    }
    Ok(())
}
