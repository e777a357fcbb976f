//! Content fingerprints and structural compaction
//!
//! - [`fingerprint`]: stable identifier for any [`Value`], independent of map
//!   key order: `SCXQ2-v1:` followed by the first 32 hex digits of the
//!   SHA-256 of the canonical JSON encoding
//! - [`compaction`]: reversible key-abbreviation envelope for program trees
//!
//! # Canonical Encoding
//!
//! Keys are sorted at every level, output is compact, integral numbers are
//! written without a fraction and non-finite numbers become `null`. Two
//! values that compare equal always canonicalize to the same string.

pub mod compaction;

pub use compaction::{compress, decompress, Compacted};

use crate::memory::value::{dict, format_number, Dict, Value};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

/// Prefix and version tag of every fingerprint
pub const FINGERPRINT_VERSION: &str = "SCXQ2-v1";

/// Hex digits of the digest kept in a fingerprint
const DIGEST_HEX_LEN: usize = 32;

/// Canonical JSON encoding of `value`.
pub fn canonicalize(value: &Value) -> String {
    let mut out = String::new();
    canon_value(value, &mut out);
    out
}

fn canon_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&format_number(*n)),
        Value::Text(s) => canon_string(s, out),
        Value::List(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                canon_value(item, out);
            }
            out.push(']');
        }
        // Dict is a BTreeMap, so iteration is already in key order.
        Value::Dict(map) => {
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                canon_string(key, out);
                out.push(':');
                canon_value(item, out);
            }
            out.push('}');
        }
    }
}

fn canon_string(s: &str, out: &mut String) {
    out.push_str(&serde_json::Value::String(s.to_string()).to_string());
}

/// Fingerprint of `value`: `SCXQ2-v1:` plus 32 lowercase hex digits.
pub fn fingerprint(value: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonicalize(value).as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("{}:{}", FINGERPRINT_VERSION, &digest[..DIGEST_HEX_LEN])
}

/// `true` when `id` is the fingerprint of `value`.
pub fn verify(value: &Value, id: &str) -> bool {
    fingerprint(value) == id
}

/// Fingerprint of one handler execution, bucketed to the current minute.
///
/// Only the shape of the call is hashed: the handler name, the sorted context
/// keys and the result's type, so repeated calls within a minute collide.
pub fn fingerprint_execution(handler: &str, context: &Dict, result: &Value) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    fingerprint_execution_at(handler, context, result, now)
}

/// [`fingerprint_execution`] with an explicit unix timestamp in seconds.
pub fn fingerprint_execution_at(
    handler: &str,
    context: &Dict,
    result: &Value,
    unix_secs: u64,
) -> String {
    let context_keys: Vec<Value> = context.keys().map(|k| Value::from(k.as_str())).collect();
    let record = Value::Dict(dict([
        ("handler", Value::from(handler)),
        ("context_keys", Value::List(context_keys)),
        ("result_type", Value::from(result_type(result))),
        ("timestamp_bucket", Value::Number((unix_secs / 60) as f64)),
    ]));
    fingerprint(&record)
}

fn result_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.fract() == 0.0 => "int",
        Value::Number(_) => "float",
        Value::Text(_) => "string",
        Value::List(_) => "array",
        Value::Dict(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_form() {
        let value: Value =
            serde_json::from_str(r#"{"b": [1, 2.5, "x\"y"], "a": {"z": null, "c": true}}"#)
                .unwrap();
        assert_eq!(
            canonicalize(&value),
            r#"{"a":{"c":true,"z":null},"b":[1,2.5,"x\"y"]}"#
        );
        assert_eq!(canonicalize(&Value::Number(f64::NAN)), "null");
    }

    #[test]
    fn test_fingerprint_format() {
        let id = fingerprint(&Value::from("hello"));
        assert_eq!(id.len(), FINGERPRINT_VERSION.len() + 1 + 32);
        assert!(id.starts_with("SCXQ2-v1:"));
        assert!(id[9..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_verify() {
        let value = Value::Dict(dict([("x", 1i64)]));
        let id = fingerprint(&value);
        assert!(verify(&value, &id));
        assert!(!verify(&Value::Dict(dict([("x", 2i64)])), &id));
    }

    #[test]
    fn test_execution_bucket() {
        let context = dict([("key", "a"), ("value", "b")]);
        let result = Value::Bool(true);

        let first = fingerprint_execution_at("ram_set", &context, &result, 120);
        assert_eq!(first, fingerprint_execution_at("ram_set", &context, &result, 179));
        assert_ne!(first, fingerprint_execution_at("ram_set", &context, &result, 180));
        assert_ne!(first, fingerprint_execution_at("ram_get", &context, &result, 120));
    }
}
