//! Execution engine module
//!
//! Main read loop for resolved streams.
//!
//! # Overview
//!
//! The engine module provides:
//! - `SyncEngine` - Fetches a stream's records and keeps its bookmark
//! - `SyncConfig` - Configuration for sync operations
//! - Singer message types for output (Schema, Record, State)

mod types;

pub use types::{Message, SyncConfig, SyncStats};

use crate::catalog::{Endpoint, ResolvedStream};
use crate::config::parse_date;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::pagination::{NextPage, PageTokenPaginator, PaginationState, Paginator};
use crate::state::StateManager;
use crate::types::get_path;
use chrono::NaiveDate;
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Sync engine for orchestrating data extraction
pub struct SyncEngine {
    /// HTTP client
    client: HttpClient,
    /// State manager
    state: StateManager,
    /// Sync configuration
    config: SyncConfig,
    /// Statistics
    stats: SyncStats,
}

impl SyncEngine {
    /// Create a new sync engine
    pub fn new(client: HttpClient, state: StateManager) -> Self {
        Self {
            client,
            state,
            config: SyncConfig::default(),
            stats: SyncStats::default(),
        }
    }

    /// Set sync configuration
    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the state manager
    pub fn state(&self) -> &StateManager {
        &self.state
    }

    /// Get statistics
    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Sync a single stream.
    ///
    /// Emits SCHEMA, then one RECORD per row, then STATE when the stream
    /// advanced its bookmark.
    pub async fn sync_stream(&mut self, stream: &ResolvedStream) -> Result<Vec<Message>> {
        let started = Instant::now();
        let name = stream.name();
        info!(stream = name, mode = stream.sync_mode().as_str(), "Starting sync");

        let mut messages = vec![Message::schema(
            name,
            stream.schema()?,
            stream.primary_keys().to_vec(),
            stream
                .replication_key()
                .map(|k| vec![k.to_string()])
                .unwrap_or_default(),
        )];

        let raw = match stream.endpoint() {
            Endpoint::Search => {
                let start = self.effective_start(stream).await;
                let end = stream.context().dates.end;
                match stream.query(start, end)? {
                    Some(query) => self.fetch_search(stream, &query).await?,
                    None => Vec::new(),
                }
            }
            Endpoint::ListAccessibleCustomers => self.fetch_accessible_customers(stream).await?,
        };

        let mut max_replication: Option<Value> = None;
        for record in raw {
            let record = stream.process_record(record)?;
            if let Some(value) = stream.replication_key().and_then(|k| get_path(&record, k)) {
                let advances = match &max_replication {
                    None => compare_replication(value, value).is_some(),
                    Some(current) => {
                        compare_replication(value, current) == Some(Ordering::Greater)
                    }
                };
                if advances {
                    max_replication = Some(value.clone());
                }
            }
            messages.push(Message::record(name, record));
        }

        let count = messages.iter().filter(|m| m.is_record()).count();
        self.stats.add_records(count);

        if let (Some(key), Some(value)) = (stream.replication_key(), max_replication) {
            self.state
                .set_bookmark(name, key, value)
                .await?;
            messages.push(Message::state(self.state.to_value().await));
        }

        self.stats.add_stream();
        self.stats
            .add_duration(u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX));

        info!(stream = name, records = count, "Completed sync");
        Ok(messages)
    }

    /// Configured start, advanced to the stream's bookmark when that is later
    async fn effective_start(&self, stream: &ResolvedStream) -> NaiveDate {
        let configured = stream.context().dates.start;
        if stream.is_full_refresh() {
            return configured;
        }

        let Some(bookmark) = self.state.get_bookmark_value(stream.name()).await else {
            return configured;
        };
        let Some(text) = bookmark.as_str() else {
            return configured;
        };

        let prefix: String = text.chars().take(10).collect();
        match parse_date("bookmark", &prefix) {
            Ok(date) if date > configured => {
                debug!(stream = stream.name(), %date, "Resuming from bookmark");
                date
            }
            Ok(_) => configured,
            Err(e) => {
                warn!(stream = stream.name(), error = %e, "Ignoring unparseable bookmark");
                configured
            }
        }
    }

    /// Page through `googleAds:search` until the token runs out or the
    /// record limit is hit
    async fn fetch_search(&mut self, stream: &ResolvedStream, query: &str) -> Result<Vec<Value>> {
        let ctx = stream.context();
        let url = format!(
            "{}/customers/{}/googleAds:search",
            ctx.api_root(),
            ctx.config.customer_id_digits()
        );

        let paginator = PageTokenPaginator::default();
        let mut pagination_state = PaginationState::new();
        let mut records = Vec::new();

        loop {
            let mut body = json!({ "query": query });
            if let Some(obj) = body.as_object_mut() {
                obj.extend(paginator.initial_body_fields(&pagination_state));
            }

            let response: Value = self.client.post_json(&url, body).await?;
            self.stats.add_page();

            let page = match response.get("results") {
                Some(Value::Array(rows)) => rows.clone(),
                None | Some(Value::Null) => Vec::new(),
                Some(other) => {
                    return Err(Error::RecordExtraction {
                        path: "$.results".to_string(),
                        message: format!("expected an array, got {other}"),
                    })
                }
            };

            debug!(
                stream = stream.name(),
                page = pagination_state.pages + 1,
                records = page.len(),
                "Fetched page"
            );

            let page_len = page.len();
            records.extend(page);

            if self.limit_reached(records.len()) {
                records.truncate(self.config.max_records);
                break;
            }

            match paginator.process_response(&response, page_len, &mut pagination_state) {
                NextPage::Continue { .. } => {}
                NextPage::Done => break,
            }
        }

        Ok(records)
    }

    async fn fetch_accessible_customers(&mut self, stream: &ResolvedStream) -> Result<Vec<Value>> {
        let url = format!("{}/customers:listAccessibleCustomers", stream.context().api_root());
        let response: Value = self.client.get_json(&url).await?;
        self.stats.add_page();

        let mut records: Vec<Value> = response
            .get("resourceNames")
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|name| json!({ "resourceName": name }))
                    .collect()
            })
            .unwrap_or_default();

        if self.limit_reached(records.len()) {
            records.truncate(self.config.max_records);
        }
        Ok(records)
    }

    fn limit_reached(&self, count: usize) -> bool {
        self.config.max_records > 0 && count >= self.config.max_records
    }
}

/// Order two replication values: numbers numerically, strings
/// lexically (ISO dates sort correctly). Mixed or other types don't compare.
fn compare_replication(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
        },
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

#[cfg(test)]
mod tests;
