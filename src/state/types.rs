//! State types for tracking sync progress
//!
//! Serialized in the Singer shape:
//! `{"bookmarks": {"<stream>": {"replication_key": ..., "replication_key_value": ...}}}`

use crate::types::JsonObject;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Complete tap state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Per-stream bookmarks
    #[serde(default)]
    pub bookmarks: BTreeMap<String, Bookmark>,

    /// Top-level keys written by other tools, preserved as-is
    #[serde(flatten)]
    pub extra: JsonObject,
}

impl State {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Bookmark for a stream
    pub fn get_bookmark(&self, stream: &str) -> Option<&Bookmark> {
        self.bookmarks.get(stream)
    }

    /// Stored replication key value for a stream
    pub fn get_bookmark_value(&self, stream: &str) -> Option<&Value> {
        self.bookmarks.get(stream)?.replication_key_value.as_ref()
    }

    /// Record the replication key value reached for a stream
    pub fn set_bookmark(&mut self, stream: &str, replication_key: &str, value: Value) {
        let bookmark = self.bookmarks.entry(stream.to_string()).or_default();
        bookmark.replication_key = Some(replication_key.to_string());
        bookmark.replication_key_value = Some(value);
    }

    /// Drop the bookmark for a stream
    pub fn clear_stream(&mut self, stream: &str) {
        self.bookmarks.remove(stream);
    }

    /// Serialize to a JSON value
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Bookmark for a single stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    /// Field the bookmark tracks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_key: Option<String>,

    /// Highest value seen for the field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_key_value: Option<Value>,

    #[serde(flatten)]
    pub extra: JsonObject,
}
