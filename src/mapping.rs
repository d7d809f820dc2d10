//! # Mapping Resolver
//!
//! Extracts named scalar values from a decrypted document.
//!
//! Resolution never fails: a path that cannot be walked, or a value the
//! encoding cannot represent, simply leaves the key out of the result.

use crate::properties::{Mapping, MappingEncoding, MappingSet};
use serde_json::Value;
use std::collections::BTreeMap;

/// Walk `path` into `data`
///
/// Objects are indexed by key. Arrays are indexed when the segment is a
/// canonical decimal index. Anything else ends the walk.
fn lookup<'a>(data: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(data, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .filter(|index| index.to_string() == *segment)
            .and_then(|index| items.get(index)),
        _ => None,
    })
}

fn encode(value: &Value, encoding: MappingEncoding) -> Option<String> {
    match encoding {
        MappingEncoding::String => match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            // null, arrays and objects have no string form
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        },
        MappingEncoding::Json => Some(value.to_string()),
    }
}

/// Resolve a single mapping, `None` when the value is absent
#[must_use]
pub fn resolve_mapping(data: &Value, mapping: &Mapping) -> Option<String> {
    lookup(data, &mapping.path).and_then(|value| encode(value, mapping.encoding))
}

/// Resolve every mapping into a flat key to string record
///
/// Keys whose value is absent are omitted, never set to null.
#[must_use]
pub fn resolve_mappings(data: &Value, mappings: &MappingSet) -> BTreeMap<String, String> {
    mappings
        .iter()
        .filter_map(|(key, mapping)| {
            resolve_mapping(data, mapping).map(|value| (key.clone(), value))
        })
        .collect()
}
