//! Merging of configuration values along the option file chain.

use serde_yaml::{Mapping, Value};

/// Merges two maps, `child` taking precedence. Nested maps are merged
/// recursively; any other value of `child` replaces the parent's.
pub fn merge_mappings(child: Mapping, parent: Mapping) -> Mapping {
    let mut merged = parent;
    for (key, value) in child {
        let combined = match (value, merged.remove(&key)) {
            (Value::Mapping(c), Some(Value::Mapping(p))) => Value::Mapping(merge_mappings(c, p)),
            (value, _) => value,
        };
        merged.insert(key, combined);
    }
    merged
}

/// Merges optional maps; absent maps are neutral.
pub fn merge_optional(child: Option<Mapping>, parent: Option<Mapping>) -> Option<Mapping> {
    match (child, parent) {
        (Some(c), Some(p)) => Some(merge_mappings(c, p)),
        (c, p) => c.or(p),
    }
}
