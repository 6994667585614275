//! Catalog resolution
//!
//! Merges the built-in streams with the user's custom reports into a single
//! ordered catalog. Resolution fails on the first invalid or duplicate
//! definition; a partially built catalog is never returned.

use super::builtin::{BuiltinStream, SYNTHETIC_PRIMARY_KEY};
use super::stream::{CustomReport, ResolvedStream};
use crate::config::{CustomReportConfig, TapContext};
use crate::error::{Error, Result};
use crate::types::OptionStringExt;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Ordered, immutable set of resolved streams
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    streams: Vec<ResolvedStream>,
}

impl Catalog {
    /// Stream names in catalog order
    pub fn names(&self) -> Vec<&str> {
        self.streams.iter().map(ResolvedStream::name).collect()
    }

    /// Look up a stream by name
    pub fn get(&self, name: &str) -> Option<&ResolvedStream> {
        self.streams.iter().find(|s| s.name() == name)
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedStream> {
        self.streams.iter()
    }

    /// Streams named in `names`, in catalog order. An empty selection
    /// selects every stream.
    pub fn select(&self, names: &[String]) -> Result<Vec<&ResolvedStream>> {
        if names.is_empty() {
            return Ok(self.streams.iter().collect());
        }

        for name in names {
            if self.get(name).is_none() {
                return Err(Error::StreamNotFound {
                    stream: name.clone(),
                });
            }
        }

        Ok(self
            .streams
            .iter()
            .filter(|s| names.iter().any(|n| n == s.name()))
            .collect())
    }

    /// Singer discovery document
    pub fn to_singer_catalog(&self) -> Result<Value> {
        let entries = self
            .streams
            .iter()
            .map(ResolvedStream::to_catalog_entry)
            .collect::<Result<Vec<_>>>()?;
        Ok(json!({ "streams": entries }))
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a ResolvedStream;
    type IntoIter = std::slice::Iter<'a, ResolvedStream>;

    fn into_iter(self) -> Self::IntoIter {
        self.streams.iter()
    }
}

/// Resolve built-in and custom report streams into a catalog.
///
/// Names are compared case-insensitively, so `Campaigns` collides with the
/// built-in `campaigns`.
pub fn resolve(
    builtins: &[BuiltinStream],
    custom_reports: &[CustomReportConfig],
    context: Arc<TapContext>,
) -> Result<Catalog> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut streams = Vec::with_capacity(builtins.len() + custom_reports.len());

    for builtin in builtins {
        if !seen.insert(builtin.name().to_ascii_lowercase()) {
            return Err(Error::duplicate_stream(builtin.name()));
        }
        debug!(stream = builtin.name(), "Resolved built-in stream");
        streams.push(ResolvedStream::builtin(*builtin, Arc::clone(&context)));
    }

    for (index, report) in custom_reports.iter().enumerate() {
        let stream = resolve_custom(index, report, Arc::clone(&context))?;
        if !seen.insert(stream.name().to_ascii_lowercase()) {
            return Err(Error::duplicate_stream(stream.name()));
        }
        debug!(
            stream = stream.name(),
            sync_mode = stream.sync_mode().as_str(),
            "Resolved custom report"
        );
        streams.push(stream);
    }

    info!(
        streams = streams.len(),
        custom_reports = custom_reports.len(),
        "Resolved stream catalog"
    );
    Ok(Catalog { streams })
}

fn resolve_custom(
    index: usize,
    report: &CustomReportConfig,
    context: Arc<TapContext>,
) -> Result<ResolvedStream> {
    let name = report
        .name
        .clone()
        .none_if_empty()
        .ok_or_else(|| Error::invalid_stream(format!("custom_reports[{index}]"), "name"))?;

    let query = report
        .query
        .clone()
        .none_if_empty()
        .ok_or_else(|| Error::invalid_stream(&name, "query"))?;

    let jsonpaths = report
        .primary_keys_jsonpaths
        .clone()
        .filter(|paths| !paths.is_empty() && paths.iter().all(|p| !p.trim().is_empty()))
        .ok_or_else(|| Error::invalid_stream(&name, "primary_keys_jsonpaths"))?;

    let schema_filepath = report
        .schema_filepath
        .clone()
        .none_if_empty()
        .ok_or_else(|| Error::invalid_stream(&name, "schema_filepath"))?;

    let primary_keys = report
        .primary_keys
        .clone()
        .unwrap_or_else(|| vec![SYNTHETIC_PRIMARY_KEY.to_string()]);

    Ok(ResolvedStream::custom(
        name,
        CustomReport {
            query,
            schema_filepath: PathBuf::from(schema_filepath),
        },
        primary_keys,
        jsonpaths,
        report.replication_key.clone().none_if_empty(),
        context,
    ))
}
