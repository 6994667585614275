//! Synthetic primary key derivation

use crate::error::{Error, Result};
use jsonpath_rust::JsonPath;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Hash the values selected by `jsonpaths` into a stable key.
///
/// Matches are collected in path order into a JSON array (null where a path
/// selects nothing) and the compact serialization is SHA-256 hashed.
pub fn derive_primary_key(record: &Value, jsonpaths: &[String]) -> Result<String> {
    let mut parts = Vec::with_capacity(jsonpaths.len());
    for path in jsonpaths {
        parts.push(select(record, path)?);
    }

    let encoded = serde_json::to_string(&Value::Array(parts))?;
    Ok(hex::encode(Sha256::digest(encoded.as_bytes())))
}

fn select(record: &Value, path: &str) -> Result<Value> {
    let jp = JsonPath::try_from(path)
        .map_err(|e| Error::json_path(format!("Invalid JSONPath '{path}': {e}")))?;

    Ok(match jp.find(record) {
        Value::Array(mut matches) => match matches.len() {
            0 => Value::Null,
            1 => matches.remove(0),
            _ => Value::Array(matches),
        },
        other => other,
    })
}
