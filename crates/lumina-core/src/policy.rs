// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Access policy evaluation.
//!
//! [`evaluate`] is a pure function of the session state, the entitlement state
//! and the route's requirements. It never fails: absent values evaluate as the
//! least privilege.
//!
//! # Decision Order
//!
//! 1. Session loading, or signed in with entitlement loading: `Pending`.
//! 2. No identity: redirect to [`LOGIN_PATH`] with the return path.
//! 3. Requirements outer to inner; the first unmet one decides.
//!
//! ```
//! use lumina_core::policy::{evaluate, AccessInput, Evaluation, RouteRequirement};
//! use lumina_core::{Identity, Tier, TierSet};
//!
//! let identity = Identity::new("a@x.com");
//! let input = AccessInput::new("/dashboard/user-gallery/add-image")
//!     .with_identity(&identity)
//!     .with_tier(Tier::Explorer);
//! let requirements = [
//!     RouteRequirement::AuthenticatedOnly,
//!     RouteRequirement::TierIn { tiers: TierSet::paid() },
//! ];
//!
//! let Evaluation::Decided(decision) = evaluate(&input, &requirements) else {
//!     unreachable!();
//! };
//! assert!(!decision.is_allowed());
//! assert_eq!(decision.redirect_to(), Some("/subscription"));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{Identity, Role, Tier, TierSet};

/// Sign-in view.
pub const LOGIN_PATH: &str = "/login";

/// Shown when the role is insufficient.
pub const FORBIDDEN_PATH: &str = "/forbidden";

/// Plan selection view, shown when the tier is insufficient.
pub const SUBSCRIPTION_PATH: &str = "/subscription";

// =============================================================================
// RouteRequirement
// =============================================================================

/// A condition a route places on the viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteRequirement {
    /// Any signed-in identity.
    AuthenticatedOnly,
    /// Role at or above `role`.
    RoleAtLeast {
        /// Minimum role.
        role: Role,
    },
    /// Tier is one of `tiers`.
    TierIn {
        /// Accepted tiers.
        tiers: TierSet,
    },
    /// Tier is anything except `tier`.
    TierNot {
        /// Rejected tier.
        tier: Tier,
    },
}

impl RouteRequirement {
    /// `RoleAtLeast(admin)`.
    pub fn admin() -> Self {
        Self::RoleAtLeast { role: Role::Admin }
    }

    /// `TierIn({artist, creator})`.
    pub fn paid_tier() -> Self {
        Self::TierIn {
            tiers: TierSet::paid(),
        }
    }

    /// `TierNot(explorer)`.
    pub fn not_explorer() -> Self {
        Self::TierNot {
            tier: Tier::Explorer,
        }
    }

    /// Returns `true` if the requirement reads role or tier.
    pub fn needs_entitlement(&self) -> bool {
        !matches!(self, Self::AuthenticatedOnly)
    }

    fn check(&self, role: Role, tier: Tier) -> Option<&'static str> {
        match self {
            Self::AuthenticatedOnly => None,
            Self::RoleAtLeast { role: min } => (role < *min).then_some(FORBIDDEN_PATH),
            Self::TierIn { tiers } => (!tiers.contains(tier)).then_some(SUBSCRIPTION_PATH),
            Self::TierNot { tier: rejected } => (tier == *rejected).then_some(SUBSCRIPTION_PATH),
        }
    }
}

impl fmt::Display for RouteRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthenticatedOnly => write!(f, "authenticated"),
            Self::RoleAtLeast { role } => write!(f, "role >= {}", role),
            Self::TierIn { tiers } => write!(f, "tier in {}", tiers),
            Self::TierNot { tier } => write!(f, "tier != {}", tier),
        }
    }
}

// =============================================================================
// Input / Output
// =============================================================================

/// Everything the evaluator reads.
#[derive(Debug, Clone, Copy)]
pub struct AccessInput<'a> {
    /// Session has not settled yet.
    pub session_loading: bool,
    /// Entitlement for the identity has not settled yet.
    pub entitlement_loading: bool,
    /// Signed-in identity.
    pub identity: Option<&'a Identity>,
    /// Resolved role.
    pub role: Option<Role>,
    /// Resolved tier.
    pub tier: Option<Tier>,
    /// The path being navigated to.
    pub current_path: &'a str,
}

impl<'a> AccessInput<'a> {
    /// Settled, signed-out input for `path`.
    pub fn new(current_path: &'a str) -> Self {
        Self {
            session_loading: false,
            entitlement_loading: false,
            identity: None,
            role: None,
            tier: None,
            current_path,
        }
    }

    /// Sets the identity.
    pub fn with_identity(mut self, identity: &'a Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Sets the role.
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Sets the tier.
    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = Some(tier);
        self
    }

    /// Sets both loading flags.
    pub fn with_loading(mut self, session: bool, entitlement: bool) -> Self {
        self.session_loading = session;
        self.entitlement_loading = entitlement;
        self
    }
}

/// Result of one access evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessDecision {
    allow: bool,
    redirect_to: Option<&'static str>,
    preserve_return_path: bool,
    return_path: Option<String>,
    denied_by: Option<RouteRequirement>,
}

impl AccessDecision {
    /// Grants access.
    pub fn allow() -> Self {
        Self {
            allow: true,
            redirect_to: None,
            preserve_return_path: false,
            return_path: None,
            denied_by: None,
        }
    }

    /// Denies access and redirects, carrying `return_path` back.
    pub fn deny(
        redirect_to: &'static str,
        return_path: &str,
        denied_by: Option<RouteRequirement>,
    ) -> Self {
        Self {
            allow: false,
            redirect_to: Some(redirect_to),
            preserve_return_path: true,
            return_path: Some(return_path.to_string()),
            denied_by,
        }
    }

    /// Returns `true` if access is granted.
    pub fn is_allowed(&self) -> bool {
        self.allow
    }

    /// Redirect target when denied.
    pub fn redirect_to(&self) -> Option<&'static str> {
        self.redirect_to
    }

    /// Returns `true` if the redirect should carry the requested path.
    pub fn preserve_return_path(&self) -> bool {
        self.preserve_return_path
    }

    /// The requested path, when preserved.
    pub fn return_path(&self) -> Option<&str> {
        self.return_path.as_deref()
    }

    /// The requirement that failed. `None` for allow and for sign-in redirects.
    pub fn denied_by(&self) -> Option<&RouteRequirement> {
        self.denied_by.as_ref()
    }
}

/// Outcome of [`evaluate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    /// Not enough is known yet.
    Pending,
    /// Allowed or denied.
    Decided(AccessDecision),
}

impl Evaluation {
    /// Returns `true` for `Pending`.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// The decision, if one was reached.
    pub fn decision(&self) -> Option<&AccessDecision> {
        match self {
            Self::Pending => None,
            Self::Decided(decision) => Some(decision),
        }
    }
}

// =============================================================================
// Evaluator
// =============================================================================

/// Decides access for `input` against `requirements`.
///
/// An empty requirement list is a public route and is allowed immediately.
pub fn evaluate(input: &AccessInput<'_>, requirements: &[RouteRequirement]) -> Evaluation {
    if requirements.is_empty() {
        return Evaluation::Decided(AccessDecision::allow());
    }

    if input.session_loading || (input.identity.is_some() && input.entitlement_loading) {
        return Evaluation::Pending;
    }

    if input.identity.is_none() {
        debug!(path = input.current_path, "No identity, redirecting to sign-in");
        return Evaluation::Decided(AccessDecision::deny(LOGIN_PATH, input.current_path, None));
    }

    let role = input.role.unwrap_or_default();
    let tier = input.tier.unwrap_or_default();

    for requirement in requirements {
        if let Some(target) = requirement.check(role, tier) {
            debug!(
                path = input.current_path,
                %role,
                %tier,
                requirement = %requirement,
                redirect = target,
                "Access denied"
            );
            return Evaluation::Decided(AccessDecision::deny(
                target,
                input.current_path,
                Some(requirement.clone()),
            ));
        }
    }

    Evaluation::Decided(AccessDecision::allow())
}

// =============================================================================
// Tests
// =============================================================================
