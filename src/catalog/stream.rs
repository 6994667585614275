//! Resolved streams

use super::builtin::{BuiltinStream, Endpoint, SYNTHETIC_PRIMARY_KEY};
use super::keys::derive_primary_key;
use crate::config::TapContext;
use crate::error::{Error, Result};
use crate::schema::load_schema_file;
use crate::template::{render, TemplateContext};
use crate::types::SyncMode;
use chrono::NaiveDate;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

/// A validated custom report definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomReport {
    /// GAQL query template
    pub query: String,
    /// Schema file, read when the schema is first requested
    pub schema_filepath: PathBuf,
}

/// Where a resolved stream came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamKind {
    Builtin(BuiltinStream),
    Custom(CustomReport),
}

/// A stream ready to be discovered or synced
#[derive(Debug, Clone)]
pub struct ResolvedStream {
    name: String,
    kind: StreamKind,
    primary_keys: Vec<String>,
    primary_keys_jsonpaths: Vec<String>,
    replication_key: Option<String>,
    context: Arc<TapContext>,
}

impl ResolvedStream {
    /// Instantiate a built-in stream
    pub fn builtin(stream: BuiltinStream, context: Arc<TapContext>) -> Self {
        let desc = stream.descriptor();
        Self {
            name: desc.name.to_string(),
            kind: StreamKind::Builtin(stream),
            primary_keys: desc.primary_keys.iter().map(|s| s.to_string()).collect(),
            primary_keys_jsonpaths: desc
                .primary_keys_jsonpaths
                .iter()
                .map(|s| s.to_string())
                .collect(),
            replication_key: desc.replication_key.map(str::to_string),
            context,
        }
    }

    /// Instantiate a custom report stream from validated parts
    pub fn custom(
        name: String,
        report: CustomReport,
        primary_keys: Vec<String>,
        primary_keys_jsonpaths: Vec<String>,
        replication_key: Option<String>,
        context: Arc<TapContext>,
    ) -> Self {
        Self {
            name,
            kind: StreamKind::Custom(report),
            primary_keys,
            primary_keys_jsonpaths,
            replication_key,
            context,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &StreamKind {
        &self.kind
    }

    pub fn primary_keys(&self) -> &[String] {
        &self.primary_keys
    }

    pub fn primary_keys_jsonpaths(&self) -> &[String] {
        &self.primary_keys_jsonpaths
    }

    pub fn replication_key(&self) -> Option<&str> {
        self.replication_key.as_deref()
    }

    /// Shared run context
    pub fn context(&self) -> &Arc<TapContext> {
        &self.context
    }

    /// Incremental when a replication key is declared
    pub fn sync_mode(&self) -> SyncMode {
        if self.replication_key.is_some() {
            SyncMode::Incremental
        } else {
            SyncMode::FullTable
        }
    }

    pub fn is_full_refresh(&self) -> bool {
        self.sync_mode() == SyncMode::FullTable
    }

    /// How records for this stream are fetched
    pub fn endpoint(&self) -> Endpoint {
        match &self.kind {
            StreamKind::Builtin(b) => b.descriptor().endpoint,
            StreamKind::Custom(_) => Endpoint::Search,
        }
    }

    /// Render the GAQL query for a date range.
    ///
    /// Returns `None` for streams that are not fetched with a query.
    pub fn query(&self, start: NaiveDate, end: NaiveDate) -> Result<Option<String>> {
        let template = match &self.kind {
            StreamKind::Builtin(b) => match b.query_template() {
                Some(q) => q,
                None => return Ok(None),
            },
            StreamKind::Custom(report) => report.query.clone(),
        };

        let config = serde_json::to_value(&self.context.config)?;
        let mut ctx = TemplateContext::with_config(config);
        ctx.set_vars(json!({
            "start_date": start.format("%Y-%m-%d").to_string(),
            "end_date": end.format("%Y-%m-%d").to_string(),
            "customer_id": self.context.config.customer_id_digits(),
        }));

        render(&template, &ctx).map(Some)
    }

    /// JSON schema of emitted records
    pub fn schema(&self) -> Result<Value> {
        let mut schema = match &self.kind {
            StreamKind::Builtin(b) => b.schema().to_json(),
            StreamKind::Custom(report) => load_schema_file(&self.name, &report.schema_filepath)?,
        };

        if self.derives_synthetic_key() {
            let properties = schema
                .get_mut("properties")
                .and_then(Value::as_object_mut)
                .ok_or_else(|| Error::schema(&self.name, "schema has no properties object"))?;
            properties
                .entry(SYNTHETIC_PRIMARY_KEY)
                .or_insert_with(|| json!({"type": "string"}));
        }

        Ok(schema)
    }

    /// Attach `_sdc_primary_key` to a raw record
    pub fn process_record(&self, mut record: Value) -> Result<Value> {
        if !self.derives_synthetic_key() {
            return Ok(record);
        }

        let key = derive_primary_key(&record, &self.primary_keys_jsonpaths)?;
        match record.as_object_mut() {
            Some(obj) => {
                obj.insert(SYNTHETIC_PRIMARY_KEY.to_string(), Value::String(key));
                Ok(record)
            }
            None => Err(Error::RecordExtraction {
                path: self.name.clone(),
                message: format!("expected an object record, got {record}"),
            }),
        }
    }

    /// Whether records carry `_sdc_primary_key`. Schema and records agree on this.
    fn derives_synthetic_key(&self) -> bool {
        !self.primary_keys_jsonpaths.is_empty()
    }

    /// Singer discovery entry for this stream
    pub fn to_catalog_entry(&self) -> Result<Value> {
        let mut stream_metadata = json!({
            "inclusion": "available",
            "selected": true,
            "table-key-properties": self.primary_keys,
            "forced-replication-method": self.sync_mode().as_str(),
        });
        if let Some(key) = &self.replication_key {
            stream_metadata["valid-replication-keys"] = json!([key]);
        }

        let mut entry = json!({
            "tap_stream_id": self.name,
            "stream": self.name,
            "schema": self.schema()?,
            "key_properties": self.primary_keys,
            "replication_method": self.sync_mode().as_str(),
            "metadata": [{
                "breadcrumb": [],
                "metadata": stream_metadata,
            }],
        });
        if let Some(key) = &self.replication_key {
            entry["replication_key"] = json!(key);
        }

        Ok(entry)
    }
}
