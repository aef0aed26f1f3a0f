// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `routes` command.

use anyhow::Context;
use lumina_config::LuminaConfig;
use lumina_core::RouteEntry;

use crate::cli::{OutputFormat, RoutesArgs};
use crate::error::BinResult;

/// Prints the effective route table in table order.
pub fn routes(config: &LuminaConfig, args: &RoutesArgs) -> BinResult<()> {
    let table = config.route_table();
    match args.format {
        OutputFormat::Text => {
            let source = if config.routes.is_some() { "configured" } else { "standard" };
            println!("Route table ({}, {} entries):", source, table.len());
            let width = table
                .entries()
                .iter()
                .map(|e| e.pattern.as_str().len())
                .max()
                .unwrap_or(0);
            for entry in table.entries() {
                println!("  {:width$}  {}", entry.pattern.as_str(), requirements_line(entry));
            }
            println!();
            println!("Unlisted paths are public.");
        }
        OutputFormat::Json => {
            let text = serde_json::to_string_pretty(&table).context("serializing route table")?;
            println!("{}", text);
        }
    }
    Ok(())
}

fn requirements_line(entry: &RouteEntry) -> String {
    entry
        .requirements
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" + ")
}
