//! Schema construction from GAQL field lists and schema files

use super::types::{JsonSchema, JsonType, SchemaProperty};
use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Convert a snake_case GAQL segment to the API's lowerCamelCase
/// (`cost_micros` becomes `costMicros`)
pub fn to_camel_case(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut upper_next = false;
    for c in segment.chars() {
        if c == '_' {
            upper_next = !out.is_empty();
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Build a record schema from the fields a query selects.
///
/// Search results nest each resource under its own object, so
/// `ad_group.id` becomes `{"adGroup": {"id": ...}}`.
pub fn schema_from_fields(fields: &[(&str, JsonType)]) -> JsonSchema {
    let mut schema = JsonSchema::new();

    for (path, json_type) in fields {
        let segments: Vec<String> = path.split('.').map(to_camel_case).collect();
        let mut leaf = SchemaProperty::nullable(*json_type);
        if *path == "segments.date" {
            leaf = leaf.with_format("date");
        }
        insert_path(&mut schema.properties, &segments, leaf);
    }

    schema
}

fn insert_path(
    properties: &mut BTreeMap<String, SchemaProperty>,
    path: &[String],
    leaf: SchemaProperty,
) {
    match path {
        [] => {}
        [last] => {
            properties.insert(last.clone(), leaf);
        }
        [head, rest @ ..] => {
            let parent = properties
                .entry(head.clone())
                .or_insert_with(|| SchemaProperty::object(BTreeMap::new()));
            let nested = parent.properties.get_or_insert_with(BTreeMap::new);
            insert_path(nested, rest, leaf);
        }
    }
}

/// Read a stream's JSON schema from disk
pub fn load_schema_file(stream: &str, path: impl AsRef<Path>) -> Result<Value> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound {
                path: path.display().to_string(),
            }
        } else {
            Error::schema(stream, format!("failed to read '{}': {e}", path.display()))
        }
    })?;

    let schema: Value = serde_json::from_str(&content)
        .map_err(|e| Error::schema(stream, format!("invalid JSON in '{}': {e}", path.display())))?;

    match schema.get("properties") {
        Some(Value::Object(_)) => Ok(schema),
        _ => Err(Error::schema(
            stream,
            format!("'{}' has no top-level \"properties\" object", path.display()),
        )),
    }
}
