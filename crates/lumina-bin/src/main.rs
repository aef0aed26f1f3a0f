// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Lumina command-line entry point.

use lumina_bin::error::report_error_and_exit;
use lumina_bin::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();
    if let Err(e) = lumina_bin::run(cli).await {
        report_error_and_exit(e);
    }
}
