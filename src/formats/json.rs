//! JSON documents as flat tables
//!
//! Nested objects and arrays are flattened into `_`-joined column names
//! (`track_artist_0_name`). The column set of a table is the sorted union of
//! the flattened keys of all its records.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use super::read_text;
use crate::database::Row;
use crate::pipeline::headers::sanitize_header_strings;
use crate::pipeline::{IngestError, IngestResult};

/// Separator between nested key segments
pub const KEY_SEPARATOR: &str = "_";

/// Parse a JSON file, tolerating a BOM and Latin-1 text
pub fn read_json(path: &Path) -> IngestResult<Value> {
    let (text, _) = read_text(path)?;
    serde_json::from_str(&text).map_err(|e| IngestError::Json {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Pick the record list out of a document
///
/// A top-level array is the record list. An object whose single value is an
/// array is a wrapper around that array. Any other object is one record. A
/// bare scalar yields no records. Records that are not objects are wrapped as
/// `{"value": ...}`.
pub fn extract_records(document: Value) -> Vec<Map<String, Value>> {
    let items = match document {
        Value::Array(items) => items,
        Value::Object(map) => {
            if map.len() == 1 && map.values().all(Value::is_array) {
                match map.into_iter().next() {
                    Some((_, Value::Array(items))) => items,
                    _ => Vec::new(),
                }
            } else {
                vec![Value::Object(map)]
            }
        }
        _ => Vec::new(),
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => map,
            Value::Array(_) => single("value", Value::String(item.to_string())),
            scalar => single("value", scalar),
        })
        .collect()
}

fn single(key: &str, value: Value) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    map
}

/// Text form of a JSON scalar; `null` is `None`
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// Flatten one value into `(key, text)` pairs, in document order
pub fn flatten(value: &Value) -> Vec<(String, Option<String>)> {
    let mut out = Vec::new();
    flatten_into(value, "", &mut out);
    out
}

fn flatten_into(value: &Value, prefix: &str, out: &mut Vec<(String, Option<String>)>) {
    let join = |key: &str| {
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}{}{}", prefix, KEY_SEPARATOR, key)
        }
    };
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                flatten_into(v, &join(k), out);
            }
        }
        Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                flatten_into(v, &join(&i.to_string()), out);
            }
        }
        scalar => out.push((prefix.to_string(), scalar_text(scalar))),
    }
}

/// Records flattened into one column list and positional rows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatTable {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl FlatTable {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() || self.rows.is_empty()
    }
}

/// Flatten records and align them on the sorted union of their keys
///
/// Keys are sorted in their raw form, then sanitized, so two raw keys that
/// clean to the same name still get distinct columns.
pub fn flatten_records(records: &[Map<String, Value>]) -> FlatTable {
    let flattened: Vec<Vec<(String, Option<String>)>> = records
        .iter()
        .map(|r| flatten(&Value::Object(r.clone())))
        .collect();

    let raw_keys: BTreeSet<&str> = flattened
        .iter()
        .flat_map(|pairs| pairs.iter().map(|(k, _)| k.as_str()))
        .collect();
    let raw_keys: Vec<&str> = raw_keys.into_iter().collect();
    let columns = sanitize_header_strings(&raw_keys);
    let position: BTreeMap<&str, usize> = raw_keys.iter().enumerate().map(|(i, k)| (*k, i)).collect();

    let rows = flattened
        .iter()
        .map(|pairs| {
            let mut row = vec![None; columns.len()];
            for (key, value) in pairs {
                if let Some(&idx) = position.get(key.as_str()) {
                    row[idx] = value.clone();
                }
            }
            row
        })
        .collect();

    FlatTable { columns, rows }
}
