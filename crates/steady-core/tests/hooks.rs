//! End-to-end scenarios for cells and computations
//!
//! These drive the public API the way a reactive host would: one cell or
//! computation per component, fed by repeated writes and evaluations.

use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;
use steady_core::{
    deps, empty_mapping, empty_sequence, Commit, Options, StabilizedCell, StabilizedComputation,
    Value,
};

// ── Helpers ───────────────────────────────────────────────

/// Serialized-form predicate that counts its calls
fn counting_is_equal() -> (Options, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let opts = Options::with_predicate(move |a, b| {
        counter.fetch_add(1, Ordering::SeqCst);
        serde_json::to_string(a).ok() == serde_json::to_string(b).ok()
    });
    (opts, calls)
}

fn parse(text: &str) -> Value {
    serde_json::from_str(text).unwrap()
}

// ── Cell ──────────────────────────────────────────────────

#[test]
fn test_cell_initializes_with_value() {
    let cell = StabilizedCell::new(json!(0), Options::default());
    assert_eq!(*cell.read(), json!(0));
}

#[test]
fn test_cell_updates_state() {
    let mut cell = StabilizedCell::new(json!(0), Options::default());
    cell.write(json!(1));
    assert_eq!(*cell.read(), json!(1));
}

#[test]
fn test_cell_initial_empty_object() {
    let cell = StabilizedCell::new(json!({}), Options::default());
    assert!(cell.read().as_object().is_some_and(|m| m.is_empty()));
}

#[test]
fn test_cell_two_empty_arrays_share_instance() {
    let (opts, calls) = counting_is_equal();
    let mut cell = StabilizedCell::new(json!([]), opts);
    let first = cell.read();
    cell.write(json!([]));
    assert!(Arc::ptr_eq(&cell.read(), &first));
    cell.write(json!([]));
    assert!(Arc::ptr_eq(&cell.read(), &empty_sequence()));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_cell_two_empty_objects_share_instance() {
    let (opts, calls) = counting_is_equal();
    let mut cell = StabilizedCell::new(json!({}), opts);
    let first = cell.read();
    assert!(!cell.write(json!({})).is_change());
    assert!(Arc::ptr_eq(&cell.read(), &first));
    assert!(Arc::ptr_eq(&first, &empty_mapping()));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_cell_deeply_equal_keeps_original() {
    let (opts, calls) = counting_is_equal();
    let initial = Arc::new(parse(r#"[{"a": 1}, {"b": []}]"#));
    let mut cell = StabilizedCell::new(Arc::clone(&initial), opts);

    let copy = parse(&serde_json::to_string(&*initial).unwrap());
    assert_eq!(cell.write(copy), Commit::Unchanged);

    assert!(Arc::ptr_eq(&cell.read(), &initial));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_cell_duck_elephant_scenario() {
    let (opts, calls) = counting_is_equal();
    let original = Arc::new(parse(r#"[{"d":"Duck"},{"e":"Elephant"}]"#));
    let mut cell = StabilizedCell::new(Arc::clone(&original), opts);

    cell.write(parse(r#"[{"d":"Duck"},{"e":"Elephant"}]"#));

    assert!(Arc::ptr_eq(&cell.read(), &original));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_cell_options_are_fixed_at_construction() {
    let mut cell = StabilizedCell::new(json!([1]), Options::default());
    let before = cell.read();
    // a later gated cell does not affect this one
    let _other = StabilizedCell::new(json!([1]), Options::with_predicate(|_, _| true));
    assert_eq!(cell.write(json!([1])), Commit::Replaced);
    assert!(!Arc::ptr_eq(&cell.read(), &before));
}

#[test]
fn test_cell_gate_keeps_distinct_value_judged_equal() {
    let opts = Options::with_predicate(|a, b| a["id"] == b["id"]);
    let v1 = Arc::new(json!({"id": 7, "name": "Duck"}));
    let mut cell = StabilizedCell::new(Arc::clone(&v1), opts);

    let commit = cell.write(json!({"id": 7, "name": "Goose", "extra": [1]}));

    assert_eq!(commit, Commit::Unchanged);
    assert!(Arc::ptr_eq(&cell.read(), &v1));
    assert_eq!(cell.read()["name"], "Duck");
    assert_eq!(cell.version(), 0);

    assert_eq!(cell.write(json!({"id": 8})), Commit::Replaced);
    assert_eq!(*cell.read(), json!({"id": 8}));
}

// ── Computation ───────────────────────────────────────────

#[test]
fn test_memo_uses_is_equal_on_recompute() {
    let (opts, calls) = counting_is_equal();
    let mut memo = StabilizedComputation::new(opts);
    let initial = json!({"a": 1});

    let first = memo.evaluate(|| initial.clone(), &deps![1]);
    let second = memo.evaluate(|| json!({"a": 1}), &deps![2]);

    assert_eq!(memo.recomputations(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_memo_stable_empty_array() {
    let mut memo = StabilizedComputation::default();
    let first = memo.evaluate(|| json!([]), &deps![]);
    let second = memo.evaluate(|| json!([]), &deps![]);
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_memo_stable_empty_object() {
    let mut memo = StabilizedComputation::default();
    let first = memo.evaluate(|| json!({}), &deps![]);
    let second = memo.evaluate(|| json!({}), &deps!["other"]);
    assert!(Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&first, &empty_mapping()));
}

#[test]
fn test_memo_new_value_when_dependencies_change() {
    let calls = Cell::new(0);
    let factory = || {
        calls.set(calls.get() + 1);
        json!({"a": 1})
    };
    let mut memo = StabilizedComputation::default();

    let first = memo.evaluate(factory, &deps![1]);
    let second = memo.evaluate(factory, &deps![2]);

    assert_eq!(calls.get(), 2);
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(*second, json!({"a": 1}));
}

#[test]
fn test_memo_identity_keys_follow_cell_handle() {
    let mut cell = StabilizedCell::new(json!([1, 2]), Options::from_policy(steady_core::EqualityPolicy::Structural));
    let mut memo = StabilizedComputation::default();
    let calls = Cell::new(0);

    for value in [json!([1, 2]), json!([1, 2]), json!([3])] {
        cell.write(value);
        let state = cell.read();
        memo.evaluate(
            || {
                calls.set(calls.get() + 1);
                (*state).clone()
            },
            &deps![&state],
        );
    }

    // [1, 2] twice keeps the handle; only [3] forces a second compute
    assert_eq!(calls.get(), 2);
}
