//! Stabilized state cell
//!
//! A single mutable slot whose writes keep the stored reference stable when
//! the new value is semantically unchanged. Each write goes through:
//!
//! ```text
//! candidate → canonicalize → (inconclusive) → equality gate → commit
//! ```
//!
//! # Invariants
//!
//! 1. `read()` never returns a non-sentinel empty container.
//! 2. A write the gate accepts as "same" leaves `read()` pointer-equal to the
//!    value before the write, and does not bump `version()`.
//! 3. `version()` increments exactly once per write that changes the handle
//!    returned by `read()`.
//!
//! The cell holds no lock. `write` takes `&mut self`, so writes are
//! serialized by ownership; hosts that share a cell across threads must
//! wrap it themselves.

use std::sync::Arc;

use crate::canonical::{self, EmptyKind};
use crate::config::Options;
use crate::gate::EqualityGate;
use crate::Value;

/// What a write did to the cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum Commit {
    /// The candidate was empty; the sentinel of that kind is now stored.
    /// `changed` is false when the slot already held that sentinel.
    Canonical { kind: EmptyKind, changed: bool },
    /// The gate judged the candidate equal; nothing was stored
    Unchanged,
    /// The candidate was stored as the new value
    Replaced,
}

impl Commit {
    /// Whether a host should propagate a change notification
    pub fn is_change(self) -> bool {
        match self {
            Commit::Canonical { changed, .. } => changed,
            Commit::Unchanged => false,
            Commit::Replaced => true,
        }
    }
}

/// Referentially stable state container
#[derive(Clone)]
pub struct StabilizedCell {
    current: Arc<Value>,
    /// Last input considered; consulted by the canonicalizer
    last_raw: Arc<Value>,
    gate: EqualityGate,
    version: u64,
}

impl StabilizedCell {
    /// Create a cell. The initial value is canonicalized like any write.
    pub fn new(initial: impl Into<Arc<Value>>, options: Options) -> Self {
        let initial = initial.into();
        let current = canonical::canonicalize(&initial, None).unwrap_or(initial);
        Self {
            last_raw: Arc::clone(&current),
            current,
            gate: options.gate(),
            version: 0,
        }
    }

    /// Current stabilized value
    pub fn read(&self) -> Arc<Value> {
        Arc::clone(&self.current)
    }

    /// Borrow the current value without cloning the handle
    pub fn get(&self) -> &Value {
        &self.current
    }

    /// Number of writes that changed the stored handle
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Stabilize and commit a candidate value.
    ///
    /// The equality predicate, if any, is called at most once, and never for
    /// empty candidates. A panic inside it leaves the cell untouched.
    pub fn write(&mut self, candidate: impl Into<Arc<Value>>) -> Commit {
        let (commit, next) = stabilize(
            &self.gate,
            Some(&self.current),
            Some(&self.last_raw),
            candidate.into(),
        );

        if commit != Commit::Unchanged {
            if commit.is_change() {
                self.version += 1;
            }
            self.last_raw = Arc::clone(&next);
            self.current = next;
        }

        tracing::trace!(outcome = ?commit, version = self.version, "cell write");
        commit
    }
}

/// Shared canonicalize-then-gate step.
///
/// Returns the commit outcome and the handle the caller should now expose.
/// For [`Commit::Unchanged`] that is the existing `current` handle and
/// nothing needs to be stored.
pub(crate) fn stabilize(
    gate: &EqualityGate,
    current: Option<&Arc<Value>>,
    last_raw: Option<&Arc<Value>>,
    candidate: Arc<Value>,
) -> (Commit, Arc<Value>) {
    if let Some((kind, sentinel)) = canonical::canonicalize_kind(&candidate, last_raw) {
        let changed = !current.is_some_and(|c| Arc::ptr_eq(c, &sentinel));
        return (Commit::Canonical { kind, changed }, sentinel);
    }

    if let Some(current) = current {
        if gate.same_value(current, &candidate) {
            return (Commit::Unchanged, Arc::clone(current));
        }
    }

    (Commit::Replaced, candidate)
}

impl std::fmt::Debug for StabilizedCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StabilizedCell")
            .field("current", &self.current)
            .field("sentinel", &canonical::is_sentinel(&self.current))
            .field("version", &self.version)
            .field("gate", &self.gate)
            .finish()
    }
}
