//! Construction-time options for cells and computations
//!
//! Options are read once when a [`StabilizedCell`](crate::cell::StabilizedCell)
//! or [`StabilizedComputation`](crate::memo::StabilizedComputation) is built
//! and never revisited. Changing the predicate means building a new
//! container.
//!
//! Besides an arbitrary closure, a predicate can be selected by name through
//! [`EqualityPolicy`], which is what the JSON config document carries:
//!
//! ```json
//! { "equality": "serialized" }
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::gate::{EqualityGate, Predicate};
use crate::{Error, Result, Value};

/// Named equality predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EqualityPolicy {
    /// No gate; every non-empty value is a change
    #[default]
    None,
    /// Deep structural equality; mapping key order is ignored
    Structural,
    /// Equal compact JSON text; mapping key order matters
    Serialized,
}

impl EqualityPolicy {
    /// The predicate implementing this policy, if any
    pub fn predicate(self) -> Option<Predicate> {
        match self {
            EqualityPolicy::None => None,
            EqualityPolicy::Structural => Some(Arc::new(|a: &Value, b: &Value| a == b)),
            EqualityPolicy::Serialized => Some(Arc::new(serialized_eq)),
        }
    }
}

impl std::str::FromStr for EqualityPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(EqualityPolicy::None),
            "structural" => Ok(EqualityPolicy::Structural),
            "serialized" => Ok(EqualityPolicy::Serialized),
            other => Err(Error::Config(format!(
                "unknown equality policy '{}' (expected none, structural or serialized)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for EqualityPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EqualityPolicy::None => write!(f, "none"),
            EqualityPolicy::Structural => write!(f, "structural"),
            EqualityPolicy::Serialized => write!(f, "serialized"),
        }
    }
}

/// Serialized-form comparison.
///
/// Serializing a `serde_json::Value` cannot fail (keys are always strings),
/// so a failure is treated as "not equal".
fn serialized_eq(a: &Value, b: &Value) -> bool {
    match (serde_json::to_string(a), serde_json::to_string(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// On-disk shape of the configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionsDocument {
    #[serde(default)]
    pub equality: EqualityPolicy,
}

/// Configuration for a cell or computation
#[derive(Clone, Default)]
pub struct Options {
    predicate: Option<Predicate>,
    policy: Option<EqualityPolicy>,
}

impl Options {
    /// Options with a caller-supplied predicate
    pub fn with_predicate<F>(predicate: F) -> Self
    where
        F: Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Some(Arc::new(predicate)),
            policy: None,
        }
    }

    /// Options with a named predicate
    pub fn from_policy(policy: EqualityPolicy) -> Self {
        Self {
            predicate: policy.predicate(),
            policy: Some(policy),
        }
    }

    /// Parse a JSON configuration document
    ///
    /// # Errors
    /// Returns `Config` for malformed JSON, unknown fields and unknown
    /// policy names alike.
    pub fn from_json(text: &str) -> Result<Self> {
        let doc: OptionsDocument =
            serde_json::from_str(text).map_err(|e| Error::Config(format!("invalid config: {}", e)))?;
        Ok(Self::from_policy(doc.equality))
    }

    /// The named policy, when built from one
    pub fn policy(&self) -> Option<EqualityPolicy> {
        self.policy
    }

    pub(crate) fn gate(&self) -> EqualityGate {
        EqualityGate::from_option(self.predicate.clone())
    }
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("predicate", &self.predicate.is_some())
            .field("policy", &self.policy)
            .finish()
    }
}
