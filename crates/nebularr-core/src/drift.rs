// ── Drift fingerprint ──
//
// A short, stable hash of a desired spec. The format is fixed so persisted
// hashes stay comparable across releases:
//
//   1. flatten to `path=value` lines (dotted object keys, `[i]` for list
//      indices, `{}` / `[]` for empty containers). Key bytes `\ . [ ] =`
//      and newline are backslash-escaped; strings are JSON-quoted
//   2. sort lines lexicographically, terminate each with `\n`
//   3. SHA-256, keep the first 8 bytes, lowercase hex (16 chars)

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Fingerprint of any serializable spec.
pub fn fingerprint<T: Serialize + ?Sized>(spec: &T) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(spec)?;
    Ok(fingerprint_value(&value))
}

pub fn fingerprint_value(value: &Value) -> String {
    let mut lines = Vec::new();
    flatten("", value, &mut lines);
    lines.sort_unstable();

    let mut hasher = Sha256::new();
    for line in &lines {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    let digest = hasher.finalize();
    hex::encode(&digest[..8])
}

fn flatten(prefix: &str, value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) if map.is_empty() => out.push(format!("{prefix}={{}}")),
        Value::Object(map) => {
            for (k, v) in map {
                let k = escape_key(k);
                let path = if prefix.is_empty() {
                    k
                } else {
                    format!("{prefix}.{k}")
                };
                flatten(&path, v, out);
            }
        }
        Value::Array(items) if items.is_empty() => out.push(format!("{prefix}=[]")),
        Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                flatten(&format!("{prefix}[{i}]"), v, out);
            }
        }
        Value::String(s) => out.push(format!("{prefix}={}", Value::from(s.as_str()))),
        Value::Null => out.push(format!("{prefix}=null")),
        Value::Bool(b) => out.push(format!("{prefix}={b}")),
        Value::Number(n) => out.push(format!("{prefix}={n}")),
    }
}

fn escape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for c in key.chars() {
        match c {
            '\\' | '.' | '[' | ']' | '=' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn is_sixteen_lowercase_hex_chars() {
        let hash = fingerprint_value(&json!({ "a": 1 }));
        assert_eq!(hash.len(), 16);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn stable_and_key_order_independent() {
        let one: Value = serde_json::from_str(r#"{"b":{"y":1,"x":[1,2]},"a":"s"}"#).unwrap();
        let two: Value = serde_json::from_str(r#"{"a":"s","b":{"x":[1,2],"y":1}}"#).unwrap();
        assert_eq!(fingerprint_value(&one), fingerprint_value(&one));
        assert_eq!(fingerprint_value(&one), fingerprint_value(&two));
    }

    #[test]
    fn list_order_matters() {
        assert_ne!(
            fingerprint_value(&json!({ "x": [1, 2] })),
            fingerprint_value(&json!({ "x": [2, 1] }))
        );
    }

    #[test]
    fn empty_containers_are_distinct() {
        assert_ne!(
            fingerprint_value(&json!({ "x": {} })),
            fingerprint_value(&json!({ "x": [] }))
        );
        assert_ne!(
            fingerprint_value(&json!({ "x": {} })),
            fingerprint_value(&json!({}))
        );
    }

    #[test]
    fn hashes_sorted_flattened_lines() {
        let digest = Sha256::digest(b"a.b[0]=true\na.c=null\nz=\"x\"\n");
        assert_eq!(
            fingerprint_value(&json!({ "z": "x", "a": { "c": null, "b": [true] } })),
            hex::encode(&digest[..8])
        );
    }

    #[test]
    fn values_cannot_forge_lines() {
        assert_ne!(
            fingerprint_value(&json!({ "a": "x\nb=y" })),
            fingerprint_value(&json!({ "a": "x", "b": "y" }))
        );
        assert_ne!(
            fingerprint_value(&json!({ "a": "1" })),
            fingerprint_value(&json!({ "a": 1 }))
        );
        assert_ne!(
            fingerprint_value(&json!({ "a": "null" })),
            fingerprint_value(&json!({ "a": null }))
        );
    }

    #[test]
    fn keys_cannot_forge_paths() {
        assert_ne!(
            fingerprint_value(&json!({ "a.b": 1 })),
            fingerprint_value(&json!({ "a": { "b": 1 } }))
        );
        assert_ne!(
            fingerprint_value(&json!({ "a[0]": 1 })),
            fingerprint_value(&json!({ "a": [1] }))
        );
        assert_ne!(
            fingerprint_value(&json!({ "a=1\nb": 2 })),
            fingerprint_value(&json!({ "a": 1, "b": 2 }))
        );
    }
}
