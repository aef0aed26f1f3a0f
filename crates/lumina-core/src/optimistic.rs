// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Local-patch-then-reconcile state cells.
//!
//! One primitive backs every optimistic update in the client: entitlement
//! tier after a purchase, like counts, and favorite membership.
//!
//! # Reconciliation Rules
//!
//! - `apply` pushes a patch; readers see the newest patch immediately.
//! - `commit(id)` makes that patch the confirmed value and drops it together
//!   with every older patch. Newer patches stay on top.
//! - `rollback(id)` discards exactly that patch. Newer patches stay on top,
//!   since they carry the user's latest intent.
//! - `reconcile(value)` is a successful fetch: it replaces the confirmed value
//!   and clears all patches.
//!
//! ```
//! use lumina_core::optimistic::Optimistic;
//!
//! let mut count = Optimistic::new(10u64);
//! let patch = count.apply(11);
//! assert_eq!(*count.current(), 11);
//!
//! count.rollback(patch);
//! assert_eq!(*count.current(), 10);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one applied patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PatchId(u64);

impl PatchId {
    /// Returns the raw id.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "patch-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Patch<T> {
    id: PatchId,
    value: T,
}

/// A confirmed value with a stack of optimistic patches on top.
#[derive(Debug, Clone, PartialEq)]
pub struct Optimistic<T> {
    confirmed: T,
    patches: Vec<Patch<T>>,
    next_id: u64,
}

impl<T> Optimistic<T> {
    /// Creates a cell with a confirmed value and no patches.
    pub fn new(confirmed: T) -> Self {
        Self {
            confirmed,
            patches: Vec::new(),
            next_id: 1,
        }
    }

    /// The value readers should see: the newest patch, else the confirmed value.
    pub fn current(&self) -> &T {
        self.patches
            .last()
            .map(|p| &p.value)
            .unwrap_or(&self.confirmed)
    }

    /// The last value confirmed by the backend.
    pub fn confirmed(&self) -> &T {
        &self.confirmed
    }

    /// Returns `true` while at least one patch is outstanding.
    pub fn is_patched(&self) -> bool {
        !self.patches.is_empty()
    }

    /// Number of outstanding patches.
    pub fn pending(&self) -> usize {
        self.patches.len()
    }

    /// Pushes a patch and returns its id.
    pub fn apply(&mut self, value: T) -> PatchId {
        let id = PatchId(self.next_id);
        self.next_id += 1;
        self.patches.push(Patch { id, value });
        id
    }

    /// Confirms a patch. Returns `false` if the patch is no longer outstanding.
    pub fn commit(&mut self, id: PatchId) -> bool {
        let Some(index) = self.patches.iter().position(|p| p.id == id) else {
            return false;
        };
        let mut drained: Vec<Patch<T>> = self.patches.drain(..=index).collect();
        if let Some(patch) = drained.pop() {
            self.confirmed = patch.value;
        }
        true
    }

    /// Discards a patch. Returns `false` if the patch is no longer outstanding.
    pub fn rollback(&mut self, id: PatchId) -> bool {
        let before = self.patches.len();
        self.patches.retain(|p| p.id != id);
        self.patches.len() != before
    }

    /// Replaces the confirmed value with a fetched one and clears all patches.
    pub fn reconcile(&mut self, value: T) {
        self.confirmed = value;
        self.patches.clear();
    }

    /// Replaces the confirmed value but keeps outstanding patches.
    ///
    /// Used when a fetch fails: the confirmed value drops to the fallback
    /// while a patch from a confirmed purchase stays visible.
    pub fn set_confirmed(&mut self, value: T) {
        self.confirmed = value;
    }
}

impl<T: Default> Default for Optimistic<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_is_visible_immediately() {
        let mut cell = Optimistic::new("explorer");
        assert!(!cell.is_patched());

        cell.apply("artist");
        assert_eq!(*cell.current(), "artist");
        assert_eq!(*cell.confirmed(), "explorer");
    }

    #[test]
    fn test_commit_promotes_and_drops_older() {
        let mut cell = Optimistic::new(0);
        let first = cell.apply(1);
        let second = cell.apply(2);
        let third = cell.apply(3);

        assert!(cell.commit(second));
        assert_eq!(*cell.confirmed(), 2);
        assert_eq!(*cell.current(), 3);
        assert_eq!(cell.pending(), 1);

        assert!(!cell.commit(first));
        assert!(cell.commit(third));
        assert!(!cell.is_patched());
    }

    #[test]
    fn test_rollback_keeps_newer_patches() {
        let mut cell = Optimistic::new(false);
        let like = cell.apply(true);
        let unlike = cell.apply(false);

        assert!(cell.rollback(like));
        assert!(!*cell.current());
        assert_eq!(cell.pending(), 1);

        assert!(cell.rollback(unlike));
        assert!(!cell.rollback(unlike));
        assert!(!cell.is_patched());
    }

    #[test]
    fn test_set_confirmed_keeps_patches() {
        let mut cell = Optimistic::new(Some("explorer"));
        cell.apply(Some("artist"));
        cell.set_confirmed(None);

        assert_eq!(*cell.current(), Some("artist"));
        assert_eq!(*cell.confirmed(), None);
    }

    #[test]
    fn test_reconcile_overwrites_patches() {
        let mut cell = Optimistic::new(10);
        let patch = cell.apply(11);
        cell.reconcile(12);

        assert_eq!(*cell.current(), 12);
        assert!(!cell.rollback(patch));
    }
}
