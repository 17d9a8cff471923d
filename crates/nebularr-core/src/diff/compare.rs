// Payload comparison.

use serde_json::Value;

/// Placeholder Servarr returns in place of secret field values.
pub const REDACTED: &str = "********";

/// Whether `current` already satisfies `desired`.
///
/// `desired` is compared as a subset: keys it does not mention are ignored,
/// arrays must match element-wise, and a redacted current value matches
/// anything since the real secret cannot be read back.
pub fn payload_matches(desired: &Value, current: &Value) -> bool {
    if current.as_str() == Some(REDACTED) {
        return true;
    }
    match (desired, current) {
        (Value::Object(want), Value::Object(have)) => want.iter().all(|(k, v)| match have.get(k) {
            Some(cv) => payload_matches(v, cv),
            None => v.is_null(),
        }),
        (Value::Array(want), Value::Array(have)) => {
            want.len() == have.len()
                && want
                    .iter()
                    .zip(have.iter())
                    .all(|(w, h)| payload_matches(w, h))
        }
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => a.as_f64() == b.as_f64(),
        },
        _ => desired == current,
    }
}
