//! Configuration merge logic
//!
//! Objects deep-merge by key, scalars take the override, and arrays are
//! concatenated unless their dotted path is registered as replace-only.

use std::collections::BTreeSet;

use serde_json::Value;

/// Per-path array handling for [`deep_merge`]
#[derive(Debug, Clone, Default)]
pub struct MergeStrategy {
    replace: BTreeSet<String>,
}

impl MergeStrategy {
    /// Strategy that concatenates every array
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a dotted key path (e.g. `static.ignore`) as replaced wholesale
    pub fn replace(mut self, path: &str) -> Self {
        self.replace.insert(path.to_string());
        self
    }

    pub fn is_replaced(&self, path: &str) -> bool {
        self.replace.contains(path)
    }
}

/// Deep merge `overlay` onto `base`.
///
/// Merge semantics:
/// - Objects: deep-merge by key (recursive)
/// - Arrays at a replace path: overlay wins entirely
/// - Other arrays: base items followed by overlay items
/// - Scalars and mismatched kinds: overlay wins
pub fn deep_merge(base: Value, overlay: Value, strategy: &MergeStrategy) -> Value {
    merge_at(base, overlay, strategy, "")
}

fn merge_at(base: Value, overlay: Value, strategy: &MergeStrategy, path: &str) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let child = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                let merged = match base_map.remove(&key) {
                    Some(base_value) => merge_at(base_value, overlay_value, strategy, &child),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }

        (Value::Array(mut base_items), Value::Array(overlay_items)) => {
            if strategy.is_replaced(path) {
                Value::Array(overlay_items)
            } else {
                base_items.extend(overlay_items);
                Value::Array(base_items)
            }
        }

        (_, overlay) => overlay,
    }
}
