//! Steady Core - referentially stable values for reactive state
//!
//! A reactive host re-renders or recomputes whenever a value's *reference*
//! changes. Steady decides when a new candidate value should keep the
//! previous reference because it is semantically unchanged, so the host
//! does not propagate spurious change notifications.
//!
//! # Architecture
//!
//! ```text
//! candidate → canonical (empty [] / {} → shared sentinel)
//!                 ↓ (not empty)
//!             gate (optional caller predicate)
//!                 ↓
//!             commit → StabilizedCell / StabilizedComputation
//! ```
//!
//! [`StabilizedComputation`] additionally skips the whole pipeline when its
//! dependency keys are unchanged.
//!
//! # Guarantees
//!
//! - **Stable empties**: every empty sequence or mapping is one shared handle
//! - **Gated**: a predicate-equal write keeps the previous handle
//! - **Memoized**: unchanged dependency keys never re-run the computation
//! - **Lock-free**: single-owner mutation; no I/O, no blocking
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::json;
//! use steady_core::{deps, EqualityPolicy, Options, StabilizedCell, StabilizedComputation};
//!
//! let mut cell = StabilizedCell::new(json!([{"a": 1}]), Options::from_policy(EqualityPolicy::Structural));
//! let before = cell.read();
//! cell.write(json!([{"a": 1}]));
//! assert!(Arc::ptr_eq(&before, &cell.read()));
//!
//! let mut memo = StabilizedComputation::default();
//! let state = cell.read();
//! let len = memo.evaluate(|| json!(state.as_array().map_or(0, Vec::len)), &deps![&state]);
//! assert_eq!(*len, json!(1));
//! ```

pub mod canonical;
pub mod cell;
pub mod config;
pub mod demo;
pub mod error;
pub mod gate;
pub mod memo;

pub use canonical::{
    canonicalize, empty_kind, empty_mapping, empty_sequence, is_sentinel, EmptyKind,
};
pub use cell::{Commit, StabilizedCell};
pub use config::{EqualityPolicy, Options};
pub use error::{Error, Result};
pub use gate::{EqualityGate, Predicate};
pub use memo::{Dep, StabilizedComputation};

/// Structured value flowing through cells and computations
pub type Value = serde_json::Value;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_cell_and_memo_compose() {
        let mut cell = StabilizedCell::new(json!([1, 2, 3]), Options::from_policy(EqualityPolicy::Structural));
        let mut memo = StabilizedComputation::new(Options::from_policy(EqualityPolicy::Structural));

        let state = cell.read();
        let sum = memo.evaluate(
            || json!(state.as_array().into_iter().flatten().filter_map(Value::as_i64).sum::<i64>()),
            &crate::deps![&state],
        );
        assert_eq!(*sum, json!(6));

        cell.write(json!([1, 2, 3]));
        let state = cell.read();
        let again = memo.evaluate(|| unreachable!("keys did not change"), &crate::deps![&state]);
        assert!(Arc::ptr_eq(&sum, &again));
    }

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
        assert_eq!(VERSION.split('.').count(), 3);
    }

    #[test]
    fn test_determinism_100_iterations() {
        let opts = Options::from_policy(EqualityPolicy::Serialized);
        let mut cell = StabilizedCell::new(json!({"k": [1, 2]}), opts);
        let first = cell.read();
        for i in 0..100 {
            let commit = cell.write(json!({"k": [1, 2]}));
            assert_eq!(commit, Commit::Unchanged, "Unstable at iteration {}", i);
            assert!(Arc::ptr_eq(&cell.read(), &first));
        }
        assert_eq!(cell.version(), 0);
    }
}
