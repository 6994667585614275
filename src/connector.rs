//! Connector trait and the Google Ads tap
//!
//! Defines the operations a tap exposes (spec, check, discover, read) and
//! the `GoogleAdsTap` implementation that wires the catalog resolver, the
//! HTTP client and the sync engine together.

use crate::auth::AuthConfig;
use crate::catalog::{resolve, BuiltinStream, Catalog, ResolvedStream};
use crate::config::{config_spec, SpecConfig, TapConfig, TapContext};
use crate::engine::{Message, SyncConfig, SyncEngine};
use crate::error::Result;
use crate::http::{HttpClient, HttpClientConfig};
use crate::state::StateManager;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use futures::{stream, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::pin::Pin;
use std::sync::Arc;
use tracing::{info, warn};

// ============================================================================
// Connector Spec
// ============================================================================

/// Connector specification returned by spec()
#[derive(Debug, Clone)]
pub struct ConnectorSpec {
    /// Connector name
    pub name: String,

    /// Human-readable title
    pub title: String,

    /// Description
    pub description: Option<String>,

    /// Configuration specification
    pub spec: SpecConfig,
}

impl ConnectorSpec {
    /// Render with the config surface as a JSON schema
    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "title": self.title,
            "description": self.description,
            "connectionSpecification": self.spec.to_json_schema(),
        })
    }
}

// ============================================================================
// Check Result
// ============================================================================

/// Result of a connection check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    /// Whether the check succeeded
    pub success: bool,

    /// Error message if failed
    pub message: Option<String>,
}

impl CheckResult {
    /// Create a successful check result
    pub fn success() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    /// Create a failed check result
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

// ============================================================================
// Connector Trait
// ============================================================================

/// Type alias for the message stream returned by read()
pub type MessageStream = Pin<Box<dyn Stream<Item = Result<Message>> + Send>>;

/// Core trait for taps
#[async_trait]
pub trait Connector: Send + Sync {
    /// Returns the connector specification
    fn spec(&self) -> ConnectorSpec;

    /// Tests if credentials and configuration are valid
    async fn check(&self, config: &TapConfig) -> Result<CheckResult>;

    /// Resolves the stream catalog
    async fn discover(&self, config: &TapConfig) -> Result<Catalog>;

    /// Reads the selected streams (all when `selection` is empty).
    ///
    /// Returns SCHEMA, RECORD and STATE messages in stream order. The stream
    /// ends after the first error.
    async fn read(
        &self,
        config: &TapConfig,
        selection: &[String],
        state: StateManager,
        sync: SyncConfig,
    ) -> Result<MessageStream>;
}

// ============================================================================
// Google Ads Tap
// ============================================================================

/// The Google Ads tap
#[derive(Debug, Clone)]
pub struct GoogleAdsTap {
    today: NaiveDate,
}

impl Default for GoogleAdsTap {
    fn default() -> Self {
        Self::new()
    }
}

impl GoogleAdsTap {
    /// Create a tap whose default report dates are today's UTC date
    pub fn new() -> Self {
        Self::with_today(Utc::now().date_naive())
    }

    /// Create a tap with a fixed "today"
    pub fn with_today(today: NaiveDate) -> Self {
        Self { today }
    }

    /// Resolve the catalog without touching the network
    pub fn catalog(&self, config: &TapConfig) -> Result<Catalog> {
        let context = Arc::new(TapContext::new(config.clone(), self.today)?);
        resolve(&BuiltinStream::ALL, &config.custom_reports, context)
    }

    fn client(config: &TapConfig) -> Result<HttpClient> {
        HttpClient::with_auth(
            HttpClientConfig::google_ads(config),
            AuthConfig::google_ads(config),
        )
    }
}

#[async_trait]
impl Connector for GoogleAdsTap {
    fn spec(&self) -> ConnectorSpec {
        ConnectorSpec {
            name: crate::NAME.to_string(),
            title: "Google Ads".to_string(),
            description: Some(
                "Extracts Google Ads reporting data, including user-defined GAQL reports"
                    .to_string(),
            ),
            spec: config_spec(),
        }
    }

    async fn check(&self, config: &TapConfig) -> Result<CheckResult> {
        let context = TapContext::new(config.clone(), self.today)?;
        let client = Self::client(&context.config)?;

        let url = format!("{}/customers:listAccessibleCustomers", context.api_root());
        match client.get_json::<Value>(&url).await {
            Ok(body) => {
                let count = body
                    .get("resourceNames")
                    .and_then(Value::as_array)
                    .map_or(0, Vec::len);
                info!(accessible_customers = count, "Connection check succeeded");
                Ok(CheckResult::success())
            }
            Err(e) => {
                warn!(error = %e, "Connection check failed");
                Ok(CheckResult::failure(e.to_string()))
            }
        }
    }

    async fn discover(&self, config: &TapConfig) -> Result<Catalog> {
        self.catalog(config)
    }

    async fn read(
        &self,
        config: &TapConfig,
        selection: &[String],
        state: StateManager,
        sync: SyncConfig,
    ) -> Result<MessageStream> {
        let catalog = self.catalog(config)?;
        let streams: Vec<ResolvedStream> =
            catalog.select(selection)?.into_iter().cloned().collect();

        let Some(first) = streams.first() else {
            return Ok(Box::pin(stream::empty()));
        };
        let client = Self::client(&first.context().config)?;
        let engine = SyncEngine::new(client, state).with_config(sync);

        info!(streams = streams.len(), "Starting read");

        let batches = stream::unfold(
            (engine, streams.into_iter(), false),
            |(mut engine, mut remaining, failed)| async move {
                if failed {
                    return None;
                }
                let stream = remaining.next()?;
                let batch: Vec<Result<Message>> = match engine.sync_stream(&stream).await {
                    Ok(messages) => messages.into_iter().map(Ok).collect(),
                    Err(e) => {
                        return Some((vec![Err(e)], (engine, remaining, true)));
                    }
                };
                Some((batch, (engine, remaining, false)))
            },
        );

        Ok(Box::pin(batches.flat_map(stream::iter)))
    }
}
