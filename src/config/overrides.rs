use serde::Serialize;
use serde_json::Value;

/// Serialize CLI overrides, dropping every value the user did not set.
///
/// `null`s and empty arrays are removed, then objects left empty, so an
/// absent flag never masks a lower configuration layer.
pub fn prune_unset<T: Serialize>(input: &T) -> Value {
    let mut value = serde_json::to_value(input).unwrap_or(Value::Null);
    prune_recursive(&mut value);
    value
}

/// Returns true when `value` carries nothing and should be dropped.
fn prune_recursive(value: &mut Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(arr) => arr.is_empty(),
        Value::Object(map) => {
            map.retain(|_, v| !prune_recursive(v));
            map.is_empty()
        }
        _ => false,
    }
}
