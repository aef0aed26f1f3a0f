// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `resolve` command.

use std::sync::Arc;

use lumina_api::ApiClient;
use lumina_config::LuminaConfig;
use lumina_core::{AccessContext, AccessDecision, EntitlementSnapshot, SessionStore};
use tracing::{info, warn};

use crate::cli::{OutputFormat, ResolveArgs};
use crate::error::{BinError, BinResult};
use crate::provider::StaticTokenProvider;

/// Resolves access for `args.email` through a live route guard.
pub async fn resolve(config: &LuminaConfig, args: &ResolveArgs) -> BinResult<()> {
    let (decision, entitlement) = run(config, args).await?;

    if args.format == OutputFormat::Text {
        println!(
            "{}: role={} tier={}{}",
            args.email,
            entitlement.effective_role(),
            entitlement.effective_tier(),
            if entitlement.role.is_none() { " (unresolved)" } else { "" }
        );
    }
    super::print_decision(&args.path, &decision, args.format)
}

pub(crate) async fn run(
    config: &LuminaConfig,
    args: &ResolveArgs,
) -> BinResult<(AccessDecision, EntitlementSnapshot)> {
    let provider = Arc::new(StaticTokenProvider::new(&args.email, &args.token));
    let session = Arc::new(SessionStore::new(provider));
    let client = ApiClient::new(config.api.clone(), Arc::clone(&session))?;
    info!(backend = %client.base_url(), email = %args.email, "Resolving access");

    let context = AccessContext::builder()
        .session_store(session)
        .entitlement_api(Arc::new(client))
        .routes(config.route_table())
        .entitlement_config(config.entitlement_config())
        .build()?;
    context.start();

    let mut guard = context.guard(&args.path);
    let resolved = tokio::time::timeout(args.deadline(), guard.resolve()).await;
    let entitlement = context.entitlements().snapshot_for(Some(&args.email));
    context.dispose();

    match resolved {
        Ok(Some(decision)) => Ok((decision, entitlement)),
        Ok(None) => Err(BinError::unsettled("route guard was unmounted")),
        Err(_) => {
            warn!(timeout = ?args.deadline(), "Access did not settle");
            Err(BinError::unsettled(format!(
                "access did not settle within {}s",
                args.timeout
            )))
        }
    }
}
