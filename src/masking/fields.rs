//! Shallow body masking: top-level keys of a JSON object.

use serde_json::Value;

use crate::masking::predicate::MaskPredicate;
use crate::masking::SENTINEL;

/// Replace the value of every top-level key matching `predicate` with the
/// sentinel string, whatever its original type.
///
/// Non-object roots are left alone. Nested objects are never visited.
/// Returns the number of keys masked.
pub fn mask_top_level_fields(root: &mut Value, predicate: &MaskPredicate) -> usize {
    let Value::Object(map) = root else {
        return 0;
    };
    if predicate.is_never() {
        return 0;
    }

    let mut masked = 0;
    for (key, value) in map.iter_mut() {
        if predicate.test(key) {
            *value = Value::String(SENTINEL.to_string());
            masked += 1;
        }
    }
    masked
}
