//! Empty-value canonicalizer — collapses empty containers onto shared sentinels
//!
//! Two values are recognised as belonging to a canonical class:
//!
//! - an ordered sequence with zero elements (`[]`)
//! - a key-value mapping with zero entries (`{}`)
//!
//! Every empty sequence that flows through a cell or computation is replaced
//! by the same process-wide [`empty_sequence`] handle, and every empty
//! mapping by the [`empty_mapping`] handle. Both are created on first use,
//! never mutated, and shared freely across threads.
//!
//! # Guarantees
//!
//! - **Idempotent**: `canonicalize(a, x)` and `canonicalize(b, y)` are the same
//!   handle for any empty sequences `a`, `b` and any previous values `x`, `y`
//! - **Disjoint**: the sequence sentinel is never the mapping sentinel
//! - **Pure**: no side effects beyond first-use initialisation of the sentinels

use std::sync::{Arc, OnceLock};

use crate::Value;

static EMPTY_SEQUENCE: OnceLock<Arc<Value>> = OnceLock::new();
static EMPTY_MAPPING: OnceLock<Arc<Value>> = OnceLock::new();

/// Which canonical empty class a value belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyKind {
    /// Ordered sequence with no elements
    Sequence,
    /// Key-value mapping with no entries
    Mapping,
}

impl EmptyKind {
    /// The sentinel handle for this class
    pub fn sentinel(self) -> Arc<Value> {
        match self {
            EmptyKind::Sequence => empty_sequence(),
            EmptyKind::Mapping => empty_mapping(),
        }
    }
}

impl std::fmt::Display for EmptyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmptyKind::Sequence => write!(f, "empty sequence"),
            EmptyKind::Mapping => write!(f, "empty mapping"),
        }
    }
}

/// The shared empty-sequence sentinel
pub fn empty_sequence() -> Arc<Value> {
    Arc::clone(EMPTY_SEQUENCE.get_or_init(|| Arc::new(Value::Array(Vec::new()))))
}

/// The shared empty-mapping sentinel
pub fn empty_mapping() -> Arc<Value> {
    Arc::clone(EMPTY_MAPPING.get_or_init(|| Arc::new(Value::Object(serde_json::Map::new()))))
}

/// Classify a value as an empty sequence, an empty mapping, or neither.
///
/// `Null` is not a mapping, and scalars are never empty, even the empty
/// string.
pub fn empty_kind(value: &Value) -> Option<EmptyKind> {
    match value {
        Value::Array(items) if items.is_empty() => Some(EmptyKind::Sequence),
        Value::Object(entries) if entries.is_empty() => Some(EmptyKind::Mapping),
        _ => None,
    }
}

/// Whether `value` is one of the two sentinel handles
pub fn is_sentinel(value: &Arc<Value>) -> bool {
    Arc::ptr_eq(value, &empty_sequence()) || Arc::ptr_eq(value, &empty_mapping())
}

/// Map an empty container onto its sentinel.
///
/// Returns `None` when `candidate` is not empty; the caller then falls
/// through to the equality gate. When `previous` already holds the sentinel
/// of the same class it is handed back as-is, which is the same handle the
/// sentinel lookup would produce.
pub fn canonicalize(candidate: &Arc<Value>, previous: Option<&Arc<Value>>) -> Option<Arc<Value>> {
    canonicalize_kind(candidate, previous).map(|(_, sentinel)| sentinel)
}

/// [`canonicalize`], also reporting which class matched
pub fn canonicalize_kind(
    candidate: &Arc<Value>,
    previous: Option<&Arc<Value>>,
) -> Option<(EmptyKind, Arc<Value>)> {
    let kind = empty_kind(candidate)?;
    let sentinel = kind.sentinel();

    match previous {
        Some(prev) if Arc::ptr_eq(prev, &sentinel) => Some((kind, Arc::clone(prev))),
        _ => Some((kind, sentinel)),
    }
}
