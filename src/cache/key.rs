//! Deterministic cache key derivation.

use serde_json::{Map, Value};

/// Compute the cache key for an operation and its parameters.
///
/// The key is `"{operation}:{params}"` where `params` is serialised with
/// object keys sorted at every depth, so logically identical requests
/// whose fields were built in a different order collide on the same key.
///
/// Sorting is done explicitly instead of relying on `serde_json`'s default
/// `BTreeMap` backing, which any crate in the graph can switch off by
/// enabling `preserve_order`.
pub fn cache_key(operation: &str, params: &Value) -> String {
    format!("{operation}:{}", sorted(params))
}

/// Prefix shared by every key in an operation's namespace.
pub(crate) fn namespace_prefix(operation: &str) -> String {
    format!("{operation}:")
}

fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = Map::with_capacity(map.len());
            for key in keys {
                out.insert(key.clone(), sorted(&map[key.as_str()]));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}
