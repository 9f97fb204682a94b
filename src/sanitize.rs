//! Recursive pruning of empty values.
//!
//! `null`, `""`, `[]` and `{}` are dropped; objects are pruned bottom-up so
//! a container disappears only once every child is gone. Array elements are
//! user data and are not inspected.

use serde_json::{Map, Value};

/// Prunes a node, returning `None` when nothing survives.
pub fn sanitize(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::Array(items) if items.is_empty() => None,
        Value::Object(map) => {
            let pruned = sanitize_object(map);
            if pruned.is_empty() {
                None
            } else {
                Some(Value::Object(pruned))
            }
        }
        other => Some(other.clone()),
    }
}

/// Prunes the children of an object, keeping the object itself even when it ends up empty.
pub fn sanitize_object(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .filter_map(|(key, child)| sanitize(child).map(|child| (key.clone(), child)))
        .collect()
}
