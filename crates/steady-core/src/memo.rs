//! Stabilized memoized computation
//!
//! # Design
//!
//! A [`StabilizedComputation`] caches the last result of a compute function
//! together with the dependency keys it was computed for. On each
//! [`evaluate`](StabilizedComputation::evaluate):
//!
//! 1. If the keys are pairwise identical to the cached keys (same length,
//!    same order), the cached result is returned and the compute function
//!    is not called.
//! 2. Otherwise the compute function runs and its output goes through the
//!    same canonicalize-then-gate step a [`StabilizedCell`] write does.
//!
//! The host decides *when* to evaluate and *which* keys to pass; this type
//! only decides whether the result reference changes.
//!
//! # Invariants
//!
//! 1. The compute function is called at most once per key change.
//! 2. The cached result is always the stabilized output of the most recent
//!    compute call.
//! 3. `recomputations()` increments by exactly 1 per compute call.
//!
//! # Failure Modes
//!
//! - **Compute function panics**: cached keys and result are untouched, so
//!   retrying the keys that failed recomputes.
//! - **Compute function errors** (`try_evaluate`): the error is returned as-is
//!   and the cache is untouched.
//!
//! [`StabilizedCell`]: crate::cell::StabilizedCell

use std::any::Any;
use std::sync::Arc;

use crate::cell::{stabilize, Commit};
use crate::config::Options;
use crate::gate::EqualityGate;
use crate::Value;

/// A dependency key.
///
/// Scalars compare by value; [`Dep::Ref`] compares by pointer identity.
/// Floats compare by bit pattern, so `NaN` matches `NaN` and `0.0` does not
/// match `-0.0`.
#[derive(Clone)]
pub enum Dep {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    /// Identity of a shared allocation. Holding the handle keeps the address
    /// from being reused while it is cached.
    Ref(Arc<dyn Any + Send + Sync>),
}

impl Dep {
    /// Identity key for any shared handle
    pub fn of<T: Any + Send + Sync>(handle: &Arc<T>) -> Self {
        Dep::Ref(Arc::clone(handle) as Arc<dyn Any + Send + Sync>)
    }

    /// Whether two keys denote the same dependency
    pub fn same(&self, other: &Dep) -> bool {
        match (self, other) {
            (Dep::Null, Dep::Null) => true,
            (Dep::Bool(a), Dep::Bool(b)) => a == b,
            (Dep::Int(a), Dep::Int(b)) => a == b,
            (Dep::Float(a), Dep::Float(b)) => a.to_bits() == b.to_bits(),
            (Dep::Str(a), Dep::Str(b)) => a == b,
            (Dep::Ref(a), Dep::Ref(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            _ => false,
        }
    }
}

impl PartialEq for Dep {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl std::fmt::Debug for Dep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dep::Null => write!(f, "Null"),
            Dep::Bool(b) => write!(f, "Bool({})", b),
            Dep::Int(i) => write!(f, "Int({})", i),
            Dep::Float(v) => write!(f, "Float({})", v),
            Dep::Str(s) => write!(f, "Str({:?})", s),
            Dep::Ref(r) => write!(f, "Ref({:p})", Arc::as_ptr(r)),
        }
    }
}

impl From<bool> for Dep {
    fn from(b: bool) -> Self {
        Dep::Bool(b)
    }
}

impl From<i64> for Dep {
    fn from(i: i64) -> Self {
        Dep::Int(i)
    }
}

impl From<i32> for Dep {
    fn from(i: i32) -> Self {
        Dep::Int(i64::from(i))
    }
}

impl From<u32> for Dep {
    fn from(i: u32) -> Self {
        Dep::Int(i64::from(i))
    }
}

impl From<f64> for Dep {
    fn from(v: f64) -> Self {
        Dep::Float(v)
    }
}

impl From<&str> for Dep {
    fn from(s: &str) -> Self {
        Dep::Str(Arc::from(s))
    }
}

impl From<String> for Dep {
    fn from(s: String) -> Self {
        Dep::Str(Arc::from(s))
    }
}

impl From<&Arc<Value>> for Dep {
    fn from(handle: &Arc<Value>) -> Self {
        Dep::of(handle)
    }
}

impl<T: Into<Dep>> From<Option<T>> for Dep {
    fn from(value: Option<T>) -> Self {
        value.map_or(Dep::Null, Into::into)
    }
}

/// Build a `Vec<Dep>` from heterogeneous key expressions
#[macro_export]
macro_rules! deps {
    () => {
        ::std::vec::Vec::<$crate::memo::Dep>::new()
    };
    ($($key:expr),+ $(,)?) => {
        ::std::vec![$($crate::memo::Dep::from($key)),+]
    };
}

fn same_keys(a: &[Dep], b: &[Dep]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same(y))
}

/// Memoized computation with a referentially stable result
pub struct StabilizedComputation {
    keys: Option<Vec<Dep>>,
    result: Option<Arc<Value>>,
    /// Last raw result considered; consulted by the canonicalizer
    last_raw: Option<Arc<Value>>,
    gate: EqualityGate,
    recomputations: u64,
}

impl StabilizedComputation {
    /// Create an empty computation. Options are captured once here.
    pub fn new(options: Options) -> Self {
        Self {
            keys: None,
            result: None,
            last_raw: None,
            gate: options.gate(),
            recomputations: 0,
        }
    }

    /// Return the cached result for `deps`, recomputing when they changed.
    pub fn evaluate<F>(&mut self, compute: F, deps: &[Dep]) -> Arc<Value>
    where
        F: FnOnce() -> Value,
    {
        match self.try_evaluate(|| Ok::<_, std::convert::Infallible>(compute()), deps) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Fallible variant of [`evaluate`](Self::evaluate).
    ///
    /// # Errors
    /// Returns whatever `compute` returns, unchanged. The cache is left as
    /// it was, so the next call with the same keys retries.
    pub fn try_evaluate<F, E>(&mut self, compute: F, deps: &[Dep]) -> Result<Arc<Value>, E>
    where
        F: FnOnce() -> Result<Value, E>,
    {
        if let (Some(keys), Some(result)) = (&self.keys, &self.result) {
            if same_keys(keys, deps) {
                tracing::trace!(deps = deps.len(), "memo hit");
                return Ok(Arc::clone(result));
            }
        }

        let raw = Arc::new(compute()?);
        self.recomputations += 1;

        let (commit, next) = stabilize(&self.gate, self.result.as_ref(), self.last_raw.as_ref(), raw);
        if commit != Commit::Unchanged {
            self.last_raw = Some(Arc::clone(&next));
            self.result = Some(Arc::clone(&next));
        }
        self.keys = Some(deps.to_vec());

        tracing::debug!(
            outcome = ?commit,
            recomputations = self.recomputations,
            "memo recompute"
        );

        Ok(next)
    }

    /// Forget the cached keys so the next evaluation recomputes.
    ///
    /// The last result is kept so the equality gate can still preserve its
    /// identity.
    pub fn invalidate(&mut self) {
        self.keys = None;
    }

    /// Whether a result is cached for some key list
    pub fn is_cached(&self) -> bool {
        self.keys.is_some() && self.result.is_some()
    }

    /// Last result, without evaluating
    pub fn last(&self) -> Option<Arc<Value>> {
        self.result.clone()
    }

    /// Number of times the compute function has been called
    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }
}

impl Default for StabilizedComputation {
    fn default() -> Self {
        Self::new(Options::default())
    }
}

impl std::fmt::Debug for StabilizedComputation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StabilizedComputation")
            .field("keys", &self.keys)
            .field("result", &self.result)
            .field("recomputations", &self.recomputations)
            .field("gate", &self.gate)
            .finish()
    }
}
