//! Layered deep-merge for configuration and view data.
//!
//! Layers are applied left to right, least specific first:
//!
//! - objects merge key by key, recursively;
//! - when both layers hold an array at the same key, the arrays are
//!   concatenated, earlier elements first;
//! - any other value in a later layer replaces the earlier one. A key that is
//!   absent from the later layer leaves the earlier value untouched. A later
//!   scalar replaces an earlier array rather than being appended to it.
//!
//! Merging is pure: inputs are borrowed, the result is a fresh value. Merging a
//! layer with itself duplicates its arrays; this is expected and not deduplicated.

use serde_json::{Map, Value};

/// Merges `layers` left to right into a new value.
///
/// An empty slice yields an empty object, so the result is always a valid
/// property bag for a component.
pub fn merge(layers: &[&Value]) -> Value {
    let mut merged = Value::Object(Map::new());
    for layer in layers {
        merge_into(&mut merged, layer);
    }
    merged
}

/// Merges `layer` over `target` in place.
pub fn merge_into(target: &mut Value, layer: &Value) {
    match (target, layer) {
        (Value::Object(base), Value::Object(over)) => {
            for (key, value) in over {
                match base.get_mut(key) {
                    Some(existing) => merge_into(existing, value),
                    None => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (Value::Array(base), Value::Array(over)) => {
            base.extend(over.iter().cloned());
        }
        (target, layer) => *target = layer.clone(),
    }
}

/// Convenience for the common two-layer case: `global` overlaid by an optional
/// per-call layer.
pub fn merge_over(global: &Value, call: Option<&Value>) -> Value {
    match call {
        Some(call) => merge(&[global, call]),
        None => merge(&[global]),
    }
}
