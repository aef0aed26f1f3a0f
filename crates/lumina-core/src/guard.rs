// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Route guard state machine.
//!
//! A guard wraps one protected view. It reads the shared session store and
//! entitlement cache, asks the policy evaluator for a decision, and only then
//! produces the view or a redirect.
//!
//! # States
//!
//! ```text
//!   mount ──▶ Pending ──decided──▶ Allowed ──▶ render(view)
//!                ▲          └────▶ Denied  ──▶ redirect
//!                │                    │
//!                └── identity / role / tier changed
//! ```
//!
//! The view is passed as a closure and invoked only in `Allowed`, so protected
//! content cannot be produced while access is undecided.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

use crate::entitlement::{EntitlementFetcher, EntitlementSnapshot};
use crate::policy::{evaluate, AccessDecision, AccessInput, Evaluation, RouteRequirement};
use crate::session::{SessionSnapshot, SessionStore};
use crate::types::{Role, Tier};

// =============================================================================
// Outcome Types
// =============================================================================

/// Guard state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardPhase {
    /// Access is undecided.
    Pending,
    /// The view may be shown.
    Allowed,
    /// The viewer is sent elsewhere.
    Denied,
}

impl fmt::Display for GuardPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Allowed => write!(f, "allowed"),
            Self::Denied => write!(f, "denied"),
        }
    }
}

/// A navigation the host should perform instead of showing the view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Redirect {
    /// Target path.
    pub to: &'static str,
    /// Path to come back to after the target view completes.
    pub return_path: Option<String>,
    /// Replace the history entry instead of pushing one.
    pub replace: bool,
}

impl Redirect {
    fn from_decision(decision: &AccessDecision) -> Option<Self> {
        let to = decision.redirect_to()?;
        let return_path = decision
            .preserve_return_path()
            .then(|| decision.return_path().map(str::to_string))
            .flatten();
        Some(Self {
            to,
            return_path,
            replace: true,
        })
    }
}

/// What the host should display for a guarded route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome<V> {
    /// A neutral loading indicator.
    Loading,
    /// The protected view.
    Render(V),
    /// A navigation elsewhere.
    Redirect(Redirect),
}

impl<V> GuardOutcome<V> {
    /// Returns `true` for `Loading`.
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// The redirect, if any.
    pub fn redirect(&self) -> Option<&Redirect> {
        match self {
            Self::Redirect(redirect) => Some(redirect),
            _ => None,
        }
    }
}

// =============================================================================
// GuardHandle
// =============================================================================

/// Cancels a guard from outside the task that drives it.
#[derive(Debug, Clone)]
pub struct GuardHandle {
    mounted: Arc<watch::Sender<bool>>,
}

impl GuardHandle {
    /// Unmounts the guard. Pending resolutions return `None`.
    pub fn unmount(&self) {
        self.mounted.send_replace(false);
    }

    /// Returns `true` while the guard is mounted.
    pub fn is_mounted(&self) -> bool {
        *self.mounted.borrow()
    }
}

// =============================================================================
// RouteGuard
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct AccessKey {
    email: Option<String>,
    role: Option<Role>,
    tier: Option<Tier>,
}

/// Access gate for one mounted route.
pub struct RouteGuard {
    id: Uuid,
    path: String,
    requirements: Vec<RouteRequirement>,
    entitlements: Arc<EntitlementFetcher>,
    session_rx: watch::Receiver<SessionSnapshot>,
    entitlement_rx: watch::Receiver<EntitlementSnapshot>,
    mounted: Arc<watch::Sender<bool>>,
    mounted_rx: watch::Receiver<bool>,
    phase: GuardPhase,
    decision: Option<AccessDecision>,
    key: AccessKey,
    ensured_for: Option<String>,
}

impl RouteGuard {
    /// Mounts a guard for `path` in the `Pending` state.
    pub fn mount(
        session: &SessionStore,
        entitlements: Arc<EntitlementFetcher>,
        path: impl Into<String>,
        requirements: Vec<RouteRequirement>,
    ) -> Self {
        let (mounted, mounted_rx) = watch::channel(true);
        let guard = Self {
            id: Uuid::now_v7(),
            path: path.into(),
            requirements,
            entitlement_rx: entitlements.subscribe(),
            entitlements,
            session_rx: session.subscribe(),
            mounted: Arc::new(mounted),
            mounted_rx,
            phase: GuardPhase::Pending,
            decision: None,
            key: AccessKey::default(),
            ensured_for: None,
        };
        debug!(guard = %guard.id, path = %guard.path, "Route guard mounted");
        guard
    }

    /// Unique guard id, for log correlation.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The guarded path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Requirements, outer to inner.
    pub fn requirements(&self) -> &[RouteRequirement] {
        &self.requirements
    }

    /// Current state.
    pub fn phase(&self) -> GuardPhase {
        self.phase
    }

    /// Last decision, cleared while pending.
    pub fn decision(&self) -> Option<&AccessDecision> {
        self.decision.as_ref()
    }

    /// Returns a handle that can unmount this guard from another task.
    pub fn handle(&self) -> GuardHandle {
        GuardHandle {
            mounted: Arc::clone(&self.mounted),
        }
    }

    /// Returns `true` while mounted.
    pub fn is_mounted(&self) -> bool {
        *self.mounted.borrow()
    }

    /// Unmounts the guard.
    pub fn unmount(&self) {
        if self.mounted.send_replace(false) {
            debug!(guard = %self.id, path = %self.path, "Route guard unmounted");
        }
    }

    // =========================================================================
    // Evaluation
    // =========================================================================

    /// Evaluates against the current state and updates the phase.
    ///
    /// Starts an entitlement fetch when the identity's entitlement is not
    /// settled. Must be called within a tokio runtime.
    pub fn evaluate_now(&mut self) -> Evaluation {
        let session = self.session_rx.borrow_and_update().clone();
        self.entitlement_rx.borrow_and_update();

        let email = session.email().map(str::to_string);
        let entitlement = match email.as_deref() {
            Some(email) if !self.requirements.is_empty() => self.entitlement_for(email),
            _ => EntitlementSnapshot::default(),
        };
        let entitlement_loading = email
            .as_deref()
            .is_some_and(|e| !entitlement.is_settled_for(e));

        let input = AccessInput {
            session_loading: session.loading,
            entitlement_loading,
            identity: session.identity.as_ref(),
            role: entitlement.role,
            tier: entitlement.tier,
            current_path: &self.path,
        };
        let evaluation = evaluate(&input, &self.requirements);

        self.key = AccessKey {
            email,
            role: entitlement.role,
            tier: entitlement.tier,
        };
        self.record(&evaluation);
        evaluation
    }

    fn entitlement_for(&mut self, email: &str) -> EntitlementSnapshot {
        let snapshot = self.entitlements.snapshot_for(Some(email));
        let unrequested = !(snapshot.loading || snapshot.resolved);
        if self.ensured_for.as_deref() == Some(email) && !unrequested {
            return snapshot;
        }

        self.ensured_for = Some(email.to_string());
        if self.entitlements.ensure(email) {
            self.entitlements.snapshot_for(Some(email))
        } else {
            snapshot
        }
    }

    fn record(&mut self, evaluation: &Evaluation) {
        let phase = match evaluation.decision() {
            None => GuardPhase::Pending,
            Some(d) if d.is_allowed() => GuardPhase::Allowed,
            Some(_) => GuardPhase::Denied,
        };
        if phase != self.phase {
            match evaluation.decision() {
                Some(decision) => info!(
                    guard = %self.id,
                    path = %self.path,
                    %phase,
                    redirect = decision.redirect_to(),
                    "Route guard decided"
                ),
                None => debug!(guard = %self.id, path = %self.path, "Route guard pending"),
            }
        }
        self.phase = phase;
        self.decision = evaluation.decision().cloned();
    }

    /// Waits until access is decided.
    ///
    /// Returns `None` if the guard is unmounted first.
    pub async fn resolve(&mut self) -> Option<AccessDecision> {
        loop {
            if !self.is_mounted() {
                return None;
            }
            if let Evaluation::Decided(decision) = self.evaluate_now() {
                return Some(decision);
            }
            if !self.wait_for_change().await {
                return None;
            }
        }
    }

    /// Waits until the identity, role or tier changes, then re-enters `Pending`.
    ///
    /// Returns `false` if the guard is unmounted first.
    pub async fn changed(&mut self) -> bool {
        loop {
            if !self.wait_for_change().await {
                return false;
            }
            let before = self.key.clone();
            self.evaluate_now();
            if self.key != before {
                debug!(guard = %self.id, path = %self.path, "Access inputs changed");
                self.phase = GuardPhase::Pending;
                self.decision = None;
                return true;
            }
        }
    }

    async fn wait_for_change(&mut self) -> bool {
        let changed = tokio::select! {
            changed = self.session_rx.changed() => changed.is_ok(),
            changed = self.entitlement_rx.changed() => changed.is_ok(),
            _ = self.mounted_rx.wait_for(|mounted| !*mounted) => false,
        };
        changed && self.is_mounted()
    }

    // =========================================================================
    // Output
    // =========================================================================

    /// Maps the current state to what the host displays.
    ///
    /// `view` runs only when the guard is mounted and `Allowed`.
    pub fn render<V>(&self, view: impl FnOnce() -> V) -> GuardOutcome<V> {
        if !self.is_mounted() {
            return GuardOutcome::Loading;
        }
        match (self.phase, &self.decision) {
            (GuardPhase::Allowed, _) => GuardOutcome::Render(view()),
            (GuardPhase::Denied, Some(decision)) => Redirect::from_decision(decision)
                .map(GuardOutcome::Redirect)
                .unwrap_or(GuardOutcome::Loading),
            _ => GuardOutcome::Loading,
        }
    }

    /// Resolves, then renders.
    pub async fn outcome<V>(&mut self, view: impl FnOnce() -> V) -> Option<GuardOutcome<V>> {
        self.resolve().await?;
        self.is_mounted().then(|| self.render(view))
    }
}

impl Drop for RouteGuard {
    fn drop(&mut self) {
        self.mounted.send_replace(false);
    }
}

impl fmt::Debug for RouteGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteGuard")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("phase", &self.phase)
            .field("mounted", &self.is_mounted())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
