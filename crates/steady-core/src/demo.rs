//! Demo session — a state cell feeding a filtered memoized view
//!
//! Mirrors a typical host wiring: user input is written to a
//! [`StabilizedCell`], and a [`StabilizedComputation`] keyed on the identity
//! of the cell's current handle derives a filtered view from it. Each
//! submission reports whether the state and the view changed, so a caller
//! can count how many "renders" stabilization saved.
//!
//! The filter drops every element (of a sequence) or `[key, value]` entry
//! (of a mapping) whose compact JSON text contains the filter string.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cell::{Commit, StabilizedCell};
use crate::config::Options;
use crate::memo::{Dep, StabilizedComputation};
use crate::Value;

/// Default filter text
pub const DEFAULT_FILTER: &str = "x";

/// Default initial state
pub const DEFAULT_STATE: &str = r#"[{"d": "Duck"}, {"e": "Elephant"}]"#;

/// Outcome of one submitted value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    /// 1-based submission index
    pub step: usize,
    pub commit: Commit,
    pub state_changed: bool,
    pub view_changed: bool,
    pub state_updates: u64,
    pub view_updates: u64,
    pub view: Value,
}

/// Totals after a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub submissions: usize,
    pub state_updates: u64,
    pub view_updates: u64,
    pub recomputations: u64,
}

/// Cell + memoized filtered view
#[derive(Debug)]
pub struct Session {
    state: StabilizedCell,
    view: StabilizedComputation,
    current_view: Arc<Value>,
    filter: String,
    submissions: usize,
    state_updates: u64,
    view_updates: u64,
}

impl Session {
    /// Build a session. The initial render counts as one update of each.
    pub fn new(initial: Value, options: Options, filter: impl Into<String>) -> Self {
        let state = StabilizedCell::new(initial, options.clone());
        let mut view = StabilizedComputation::new(options);
        let filter = filter.into();

        let current = state.read();
        let current_view = view.evaluate(|| filter_value(&current, &filter), &[Dep::from(&current)]);

        Self {
            state,
            view,
            current_view,
            filter,
            submissions: 0,
            state_updates: 1,
            view_updates: 1,
        }
    }

    /// Write `value` to the state and re-derive the view.
    pub fn submit(&mut self, value: Value) -> StepReport {
        self.submissions += 1;

        let before = self.state.read();
        let commit = self.state.write(value);
        let after = self.state.read();
        let state_changed = !Arc::ptr_eq(&before, &after);
        if state_changed {
            self.state_updates += 1;
        }

        let filter = &self.filter;
        let view = self
            .view
            .evaluate(|| filter_value(&after, filter), &[Dep::from(&after)]);
        let view_changed = !Arc::ptr_eq(&view, &self.current_view);
        if view_changed {
            self.view_updates += 1;
            self.current_view = Arc::clone(&view);
        }

        tracing::debug!(
            step = self.submissions,
            state_changed,
            view_changed,
            "demo submission"
        );

        StepReport {
            step: self.submissions,
            commit,
            state_changed,
            view_changed,
            state_updates: self.state_updates,
            view_updates: self.view_updates,
            view: (*view).clone(),
        }
    }

    /// Current view handle
    pub fn view(&self) -> Arc<Value> {
        Arc::clone(&self.current_view)
    }

    pub fn summary(&self) -> Summary {
        Summary {
            submissions: self.submissions,
            state_updates: self.state_updates,
            view_updates: self.view_updates,
            recomputations: self.view.recomputations(),
        }
    }
}

/// Drop entries whose compact JSON contains `needle`.
///
/// Sequences keep their surviving elements; mappings become a sequence of
/// `[key, value]` pairs. Scalars have no entries and yield an empty sequence.
pub fn filter_value(value: &Value, needle: &str) -> Value {
    let keep = |v: &Value| !v.to_string().contains(needle);
    match value {
        Value::Array(items) => Value::Array(items.iter().filter(|v| keep(*v)).cloned().collect()),
        Value::Object(entries) => Value::Array(
            entries
                .iter()
                .map(|(k, v)| Value::Array(vec![Value::String(k.clone()), v.clone()]))
                .filter(|pair| keep(pair))
                .collect(),
        ),
        _ => Value::Array(Vec::new()),
    }
}
