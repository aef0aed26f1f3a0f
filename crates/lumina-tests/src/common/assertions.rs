// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Custom assertion helpers.

use std::fmt::Debug;

use lumina_core::{AccessDecision, GuardOutcome};

/// Asserts that the guard resolved and allowed access.
#[track_caller]
pub fn assert_allowed(decision: &Option<AccessDecision>) {
    match decision {
        Some(decision) => assert!(
            decision.is_allowed(),
            "expected allow, got redirect to {:?}",
            decision.redirect_to()
        ),
        None => panic!("guard was unmounted before deciding"),
    }
}

/// Asserts a redirect to `to` with the given return path.
#[track_caller]
pub fn assert_redirect(decision: &Option<AccessDecision>, to: &str, return_path: Option<&str>) {
    let decision = decision
        .as_ref()
        .expect("guard was unmounted before deciding");
    assert_eq!(decision.redirect_to(), Some(to), "unexpected redirect target");
    let kept = decision
        .preserve_return_path()
        .then(|| decision.return_path())
        .flatten();
    assert_eq!(kept, return_path, "unexpected return path");
}

/// Asserts that the outcome rendered the view and returns it.
#[track_caller]
pub fn assert_rendered<V: Debug>(outcome: Option<GuardOutcome<V>>) -> V {
    match outcome {
        Some(GuardOutcome::Render(view)) => view,
        other => panic!("expected rendered view, got {:?}", other),
    }
}
