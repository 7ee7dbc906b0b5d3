//! Canonical JSON encoding and content digests
//!
//! Objects are written with their keys sorted lexicographically, arrays keep
//! their order and primitives use serde_json's own encoding. The output does
//! not depend on map insertion order, so it can be hashed for
//! content-addressed identifiers.

use serde_json::Value;

/// Encode a JSON value canonically
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        primitive => out.push_str(&primitive.to_string()),
    }
}

/// BLAKE3 digest over the given parts, hex encoded and truncated to `len`
/// characters (at most 64).
pub fn digest_hex(parts: &[&[u8]], len: usize) -> String {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    let hex = hasher.finalize().to_hex();
    hex.as_str()[..len.min(hex.len())].to_string()
}
