use serde_json::{Map, Value};

/// Coerce a JSON value into an object map, discarding anything else.
///
/// Component props and global settings are object-shaped by contract; stray
/// scalars or arrays from an external source are replaced with an empty
/// object rather than propagated.
pub fn value_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Shallow-merge `patch` into `target`.
///
/// Top-level keys of `patch` overwrite keys of `target`; nested objects are
/// replaced wholesale, matching the original spread-based update semantics.
/// A non-object `patch` replaces `target` entirely.
pub fn merge_object(target: &mut Value, patch: &Value) {
    match (target.as_object_mut(), patch.as_object()) {
        (Some(dest), Some(src)) => {
            for (key, value) in src {
                dest.insert(key.clone(), value.clone());
            }
        }
        _ => *target = patch.clone(),
    }
}
