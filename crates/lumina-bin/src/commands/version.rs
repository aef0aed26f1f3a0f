// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `version` command.

use crate::error::BinResult;

/// Prints version information for all components.
pub fn version() -> BinResult<()> {
    println!("Lumina - access resolver for the gallery client");
    println!();
    println!("Version Information:");
    println!("  lumina-bin:    {}", env!("CARGO_PKG_VERSION"));
    println!("  lumina-core:   {}", lumina_core::VERSION);
    println!("  lumina-api:    {}", lumina_api::VERSION);
    println!("  lumina-config: {}", lumina_config::VERSION);
    println!();
    println!("Build Information:");
    println!("  Target:       {}", std::env::consts::ARCH);
    println!("  OS:           {}", std::env::consts::OS);
    println!();
    println!("License: PolyForm Noncommercial License 1.0.0");
    println!("Copyright (c) 2025 Sylvex. All rights reserved.");

    Ok(())
}
