//! Engine types
//!
//! Singer messages and configuration for the sync engine.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};

/// A message emitted during sync
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Stream schema, emitted before any record of the stream
    Schema {
        /// Stream name
        stream: String,
        /// JSON schema of the records
        schema: Value,
        /// Primary key fields
        key_properties: Vec<String>,
        /// Replication key, as a dotted path into the record
        /// (`segments.date` names `record["segments"]["date"]`)
        bookmark_properties: Vec<String>,
    },
    /// A single record
    Record {
        /// Stream name
        stream: String,
        /// Record data
        record: Value,
        /// Extraction timestamp
        time_extracted: DateTime<Utc>,
    },
    /// Full state snapshot
    State {
        /// State document
        value: Value,
    },
}

impl Message {
    /// Create a schema message
    pub fn schema(
        stream: impl Into<String>,
        schema: Value,
        key_properties: Vec<String>,
        bookmark_properties: Vec<String>,
    ) -> Self {
        Self::Schema {
            stream: stream.into(),
            schema,
            key_properties,
            bookmark_properties,
        }
    }

    /// Create a record message stamped with the current time
    pub fn record(stream: impl Into<String>, record: Value) -> Self {
        Self::Record {
            stream: stream.into(),
            record,
            time_extracted: Utc::now(),
        }
    }

    /// Create a state message
    pub fn state(value: Value) -> Self {
        Self::State { value }
    }

    /// Check if this is a schema message
    pub fn is_schema(&self) -> bool {
        matches!(self, Self::Schema { .. })
    }

    /// Check if this is a record message
    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record { .. })
    }

    /// Check if this is a state message
    pub fn is_state(&self) -> bool {
        matches!(self, Self::State { .. })
    }

    /// Singer wire representation
    pub fn to_json(&self) -> Value {
        match self {
            Self::Schema {
                stream,
                schema,
                key_properties,
                bookmark_properties,
            } => json!({
                "type": "SCHEMA",
                "stream": stream,
                "schema": schema,
                "key_properties": key_properties,
                "bookmark_properties": bookmark_properties,
            }),
            Self::Record {
                stream,
                record,
                time_extracted,
            } => json!({
                "type": "RECORD",
                "stream": stream,
                "record": record,
                "time_extracted": time_extracted.to_rfc3339_opts(SecondsFormat::Micros, true),
            }),
            Self::State { value } => json!({
                "type": "STATE",
                "value": value,
            }),
        }
    }
}

/// Configuration for sync operation
#[derive(Debug, Clone, Default)]
pub struct SyncConfig {
    /// Maximum records per stream (0 = unlimited)
    pub max_records: usize,
}

impl SyncConfig {
    /// Create a new sync config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set max records
    #[must_use]
    pub fn with_max_records(mut self, max: usize) -> Self {
        self.max_records = max;
        self
    }
}

/// Statistics from a sync operation
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Total records synced
    pub records_synced: usize,
    /// Total pages fetched
    pub pages_fetched: usize,
    /// Total streams synced
    pub streams_synced: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl SyncStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Add records
    pub fn add_records(&mut self, count: usize) {
        self.records_synced += count;
    }

    /// Add a page
    pub fn add_page(&mut self) {
        self.pages_fetched += 1;
    }

    /// Add a stream
    pub fn add_stream(&mut self) {
        self.streams_synced += 1;
    }

    /// Add elapsed time
    pub fn add_duration(&mut self, ms: u64) {
        self.duration_ms += ms;
    }
}
