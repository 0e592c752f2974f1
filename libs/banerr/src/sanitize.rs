//! Recursive key-based scrubbing of JSON payloads

use serde_json::Value;

/// Remove every object member named in `keys` from `value`, at any depth.
///
/// The rule is uniform: objects drop matching keys and recurse into the
/// remaining members, arrays recurse into their elements, scalars pass
/// through untouched. Matching is by key name only, never by value.
///
/// An empty `keys` slice is the identity fast path: the value is returned
/// immediately without being traversed. Callers rely on this when no
/// sanitize list is configured.
#[must_use]
pub fn scrub(mut value: Value, keys: &[String]) -> Value {
    if keys.is_empty() {
        return value;
    }
    scrub_in_place(&mut value, keys);
    value
}

fn scrub_in_place(value: &mut Value, keys: &[String]) {
    match value {
        Value::Object(map) => {
            map.retain(|k, _| !keys.iter().any(|key| key == k));
            for child in map.values_mut() {
                scrub_in_place(child, keys);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                scrub_in_place(item, keys);
            }
        }
        _ => {}
    }
}
