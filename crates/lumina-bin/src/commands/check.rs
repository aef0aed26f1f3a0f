// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `check` command.

use lumina_config::LuminaConfig;
use lumina_core::{evaluate, AccessDecision, AccessInput, Evaluation, Identity};

use crate::cli::CheckArgs;
use crate::error::{BinError, BinResult};

/// Evaluates `args.path` against the configured route table.
pub fn check(config: &LuminaConfig, args: &CheckArgs) -> BinResult<()> {
    let decision = decide(config, args)?;
    super::print_decision(&args.path, &decision, args.format)
}

pub(crate) fn decide(config: &LuminaConfig, args: &CheckArgs) -> BinResult<AccessDecision> {
    let routes = config.route_table();
    let requirements = routes.requirements_for(&args.path);

    let identity = args.email.as_deref().map(Identity::new);
    let mut input = AccessInput::new(&args.path);
    if let Some(identity) = &identity {
        input = input.with_identity(identity);
    }
    if let Some(role) = args.role {
        input = input.with_role(role);
    }
    if let Some(tier) = args.tier {
        input = input.with_tier(tier);
    }

    match evaluate(&input, requirements) {
        Evaluation::Decided(decision) => Ok(decision),
        Evaluation::Pending => Err(BinError::unsettled("evaluation did not settle")),
    }
}
