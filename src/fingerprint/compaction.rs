//! Key-abbreviation compaction for program trees
//!
//! [`compress`] rewrites well-known keys to short forms at every depth and
//! wraps the result with a version tag, the root's `type` and a short
//! diagnostic signature. [`decompress`] expands the keys again. Keys outside
//! the table pass through unchanged, except those that already look like a
//! short form or start with [`ESCAPE`]; those gain an `ESCAPE` prefix so the
//! round trip stays exact.

use crate::memory::value::{Dict, Value};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Version tag of the compacted envelope
pub const COMPACTION_VERSION: &str = "XCFE-v1";

/// Prefix marking a raw key that would otherwise collide with a short form
pub const ESCAPE: char = '~';

/// `(full key, abbreviation)` pairs
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("type", "t"),
    ("name", "n"),
    ("value", "v"),
    ("params", "p"),
    ("handler", "h"),
    ("content", "c"),
    ("body", "b"),
    ("manifest", "m"),
    ("capabilityBlocks", "cb"),
    ("capabilityVectors", "cv"),
    ("capabilityVariables", "cx"),
    ("atomicBlocks", "ab"),
    ("declarations", "d"),
    ("assignments", "a"),
    ("blocks", "bk"),
];

/// A compacted value with its envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Compacted {
    #[serde(rename = "@xcfe")]
    pub version: String,
    #[serde(rename = "@type")]
    pub type_tag: String,
    #[serde(rename = "@sig")]
    pub signature: String,
    #[serde(rename = "@data")]
    pub data: Value,
}

fn is_short_form(key: &str) -> bool {
    ABBREVIATIONS.iter().any(|(_, short)| *short == key)
}

fn abbreviate(key: &str) -> Cow<'_, str> {
    if let Some((_, short)) = ABBREVIATIONS.iter().find(|(full, _)| *full == key) {
        return Cow::Borrowed(*short);
    }
    if key.starts_with(ESCAPE) || is_short_form(key) {
        return Cow::Owned(format!("{}{}", ESCAPE, key));
    }
    Cow::Borrowed(key)
}

fn expand(key: &str) -> Cow<'_, str> {
    if let Some(raw) = key.strip_prefix(ESCAPE) {
        return Cow::Borrowed(raw);
    }
    ABBREVIATIONS
        .iter()
        .find(|(_, short)| *short == key)
        .map_or(Cow::Borrowed(key), |(full, _)| Cow::Borrowed(*full))
}

fn rewrite_keys(value: &Value, rename: fn(&str) -> Cow<'_, str>) -> Value {
    match value {
        Value::Dict(map) => Value::Dict(
            map.iter()
                .map(|(k, v)| (rename(k).into_owned(), rewrite_keys(v, rename)))
                .collect(),
        ),
        Value::List(items) => {
            Value::List(items.iter().map(|item| rewrite_keys(item, rename)).collect())
        }
        other => other.clone(),
    }
}

/// Compact `value`. Returns `None` for `Null`.
pub fn compress(value: &Value) -> Option<Compacted> {
    if value.is_null() {
        return None;
    }
    let type_tag = value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();

    Some(Compacted {
        version: COMPACTION_VERSION.to_string(),
        type_tag,
        signature: value.as_dict().map(signature).unwrap_or_default(),
        data: rewrite_keys(value, abbreviate),
    })
}

/// Restore the full keys of a compacted value.
pub fn decompress(compacted: &Compacted) -> Value {
    rewrite_keys(&compacted.data, expand)
}

/// Short structural summary, e.g. `P.M.C2.V0.X1`. Not unique.
fn signature(map: &Dict) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(first) = map
        .get("type")
        .and_then(Value::as_str)
        .and_then(|t| t.chars().next())
    {
        parts.push(first.to_string());
    }
    if let Some(name) = map.get("name").and_then(Value::as_str) {
        if name.chars().count() >= 3 {
            parts.push(name.chars().take(3).collect());
        }
    }
    if map.contains_key("manifest") {
        parts.push("M".to_string());
    }
    for (key, tag) in [
        ("capabilityBlocks", 'C'),
        ("capabilityVectors", 'V'),
        ("capabilityVariables", 'X'),
    ] {
        if let Some(Value::Dict(entries)) = map.get(key) {
            parts.push(format!("{}{}", tag, entries.len()));
        }
    }

    parts.join(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::value::dict;
    use pretty_assertions::assert_eq;

    fn sample() -> Value {
        let block = Value::Dict(dict([
            ("type", Value::from("CapabilityBlock")),
            ("name", Value::from("boot")),
            ("params", Value::Dict(dict([("handler", "kernel_boot")]))),
        ]));
        Value::Dict(dict([
            ("type", Value::from("Program")),
            ("manifest", Value::Null),
            ("capabilityBlocks", Value::Dict(dict([("boot", block)]))),
            ("capabilityVectors", Value::Dict(Dict::new())),
            ("extra", Value::List(vec![Value::Dict(dict([("value", 1i64)]))])),
        ]))
    }

    #[test]
    fn test_keys_are_abbreviated() {
        let compacted = compress(&sample()).unwrap();
        let data = &compacted.data;

        assert_eq!(compacted.version, "XCFE-v1");
        assert_eq!(compacted.type_tag, "Program");
        assert_eq!(data.get("t"), Some(&Value::from("Program")));
        assert!(data.get("cb").and_then(|cb| cb.get("boot")).and_then(|b| b.get("p")).is_some());
        assert_eq!(
            data.get("extra").and_then(Value::as_list).and_then(|l| l[0].get("v")),
            Some(&Value::Number(1.0))
        );
    }

    #[test]
    fn test_round_trip() {
        let value = sample();
        let compacted = compress(&value).unwrap();
        assert_eq!(decompress(&compacted), value);
    }

    #[test]
    fn test_raw_short_keys_are_escaped() {
        let value = Value::Dict(dict([
            ("type", Value::from("Note")),
            ("t", Value::from(2i64)),
            ("a", Value::from(1i64)),
            ("~t", Value::from(3i64)),
        ]));
        let compacted = compress(&value).unwrap();

        assert_eq!(compacted.data.get("t"), Some(&Value::from("Note")));
        assert_eq!(compacted.data.get("~t"), Some(&Value::Number(2.0)));
        assert_eq!(compacted.data.get("~a"), Some(&Value::Number(1.0)));
        assert_eq!(compacted.data.get("~~t"), Some(&Value::Number(3.0)));
        assert_eq!(decompress(&compacted), value);
    }

    #[test]
    fn test_signature() {
        let compacted = compress(&sample()).unwrap();
        assert_eq!(compacted.signature, "P.M.C1.V0");

        let named = Value::Dict(dict([("type", "AtomicBlock"), ("name", "ab")]));
        assert_eq!(compress(&named).unwrap().signature, "A");
    }

    #[test]
    fn test_null_and_scalars() {
        assert!(compress(&Value::Null).is_none());

        let compacted = compress(&Value::from(5i64)).unwrap();
        assert_eq!(compacted.type_tag, "unknown");
        assert_eq!(compacted.signature, "");
        assert_eq!(decompress(&compacted), Value::Number(5.0));
    }

    #[test]
    fn test_envelope_json() {
        let compacted = compress(&Value::Dict(dict([("name", "x")]))).unwrap();
        let json = serde_json::to_string(&compacted).unwrap();
        assert_eq!(
            json,
            r#"{"@xcfe":"XCFE-v1","@type":"unknown","@sig":"","@data":{"n":"x"}}"#
        );
    }
}
