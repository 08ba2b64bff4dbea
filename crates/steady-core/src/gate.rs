//! Equality gate — optional caller-supplied sameness check
//!
//! When canonicalization does not apply, the gate decides whether a new
//! non-empty candidate should be treated as the previous stabilized value.
//! Without a predicate it never substitutes.

use std::sync::Arc;

use crate::Value;

/// Caller-supplied equality predicate: `(previous, candidate) -> same?`
///
/// Assumed pure, total and reflexive. A panic inside the predicate unwinds
/// through the caller of `write`/`evaluate` untouched.
pub type Predicate = Arc<dyn Fn(&Value, &Value) -> bool + Send + Sync>;

/// Wraps the optional predicate captured at construction time
#[derive(Clone, Default)]
pub struct EqualityGate {
    predicate: Option<Predicate>,
}

impl EqualityGate {
    /// Gate that never substitutes
    pub fn open() -> Self {
        Self { predicate: None }
    }

    /// Gate backed by `predicate`
    pub fn new(predicate: Predicate) -> Self {
        Self {
            predicate: Some(predicate),
        }
    }

    pub fn from_option(predicate: Option<Predicate>) -> Self {
        Self { predicate }
    }

    /// Whether a predicate is configured
    pub fn is_configured(&self) -> bool {
        self.predicate.is_some()
    }

    /// Decide whether `candidate` should keep `previous`'s identity.
    ///
    /// Calls the predicate at most once.
    pub fn same_value(&self, previous: &Value, candidate: &Value) -> bool {
        match &self.predicate {
            Some(predicate) => predicate(previous, candidate),
            None => false,
        }
    }
}

impl std::fmt::Debug for EqualityGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EqualityGate")
            .field("configured", &self.is_configured())
            .finish()
    }
}
