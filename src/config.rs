//! Configuration types for the tap
//!
//! This module contains the configuration object supplied by the user
//! (credentials, date range, custom reports) and the immutable run context
//! that resolved streams keep a reference to.

use crate::error::{Error, Result};
use crate::types::{OptionStringExt, PropertyType};
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;
use url::Url;

/// Credential fields that must be present and non-empty
pub const REQUIRED_FIELDS: [&str; 6] = [
    "client_id",
    "client_secret",
    "developer_token",
    "refresh_token",
    "customer_id",
    "login_customer_id",
];

// ============================================================================
// Tap Config
// ============================================================================

/// Complete tap configuration loaded from JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TapConfig {
    /// OAuth2 client ID
    #[serde(default)]
    pub client_id: String,

    /// OAuth2 client secret
    #[serde(default)]
    pub client_secret: String,

    /// Google Ads developer token
    #[serde(default)]
    pub developer_token: String,

    /// OAuth2 refresh token
    #[serde(default)]
    pub refresh_token: String,

    /// Customer account to extract from
    #[serde(default)]
    pub customer_id: String,

    /// Manager account used to access the customer
    #[serde(default)]
    pub login_customer_id: String,

    /// First report date (defaults to today)
    #[serde(default)]
    pub start_date: Option<String>,

    /// Last report date (defaults to today)
    #[serde(default)]
    pub end_date: Option<String>,

    /// User-defined report streams
    #[serde(default, deserialize_with = "deserialize_custom_reports")]
    pub custom_reports: Vec<CustomReportConfig>,

    /// Google Ads API version segment
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Google Ads API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// OAuth2 token endpoint
    #[serde(default = "default_token_url")]
    pub token_url: String,

    /// Request rate limit
    #[serde(default = "default_rps")]
    pub requests_per_second: u32,

    /// Maximum number of retries per request
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_api_version() -> String {
    "v17".to_string()
}

fn default_base_url() -> String {
    "https://googleads.googleapis.com".to_string()
}

fn default_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_rps() -> u32 {
    10
}

fn default_max_retries() -> u32 {
    5
}

/// `null` and a missing key both mean "no custom reports"
fn deserialize_custom_reports<'de, D>(
    deserializer: D,
) -> std::result::Result<Vec<CustomReportConfig>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<CustomReportConfig>>::deserialize(deserializer)?.unwrap_or_default())
}

impl TapConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                Error::config(format!(
                    "Failed to read config file '{}': {e}",
                    path.display()
                ))
            }
        })?;
        Self::from_json(&content)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| Error::config(format!("Invalid config JSON: {e}")))?;
        Self::from_value(value)
    }

    /// Build configuration from a JSON value, validating its shape
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::config("Config must be a JSON object"));
        }

        match value.get("custom_reports") {
            None | Some(Value::Null | Value::Array(_)) => {}
            Some(other) => {
                return Err(Error::invalid_value(
                    "custom_reports",
                    format!("expected an array of report definitions, got {other}"),
                ));
            }
        }

        let config: TapConfig = serde_json::from_value(value)
            .map_err(|e| Error::config(format!("Invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every credential is present
    pub fn validate(&self) -> Result<()> {
        for field in REQUIRED_FIELDS {
            if self.credential(field).trim().is_empty() {
                return Err(Error::missing_field(field));
            }
        }

        if self.requests_per_second == 0 {
            return Err(Error::invalid_value(
                "requests_per_second",
                "must be greater than zero",
            ));
        }

        for (field, value) in [("base_url", &self.base_url), ("token_url", &self.token_url)] {
            let url = Url::parse(value).map_err(|e| Error::invalid_value(field, e.to_string()))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(Error::invalid_value(field, "must be an http(s) URL"));
            }
        }

        Ok(())
    }

    fn credential(&self, field: &str) -> &str {
        match field {
            "client_id" => &self.client_id,
            "client_secret" => &self.client_secret,
            "developer_token" => &self.developer_token,
            "refresh_token" => &self.refresh_token,
            "customer_id" => &self.customer_id,
            "login_customer_id" => &self.login_customer_id,
            _ => "",
        }
    }

    /// Resolve the report date range, using `today` for missing bounds
    pub fn date_range(&self, today: NaiveDate) -> Result<DateRange> {
        let start = match self.start_date.clone().none_if_empty() {
            Some(s) => parse_date("start_date", &s)?,
            None => today,
        };
        let end = match self.end_date.clone().none_if_empty() {
            Some(s) => parse_date("end_date", &s)?,
            None => today,
        };

        if start > end {
            return Err(Error::invalid_value(
                "start_date",
                format!("{start} is after end_date {end}"),
            ));
        }

        Ok(DateRange { start, end })
    }

    /// Customer ID with the dashes stripped
    pub fn customer_id_digits(&self) -> String {
        strip_dashes(&self.customer_id)
    }

    /// Login customer ID with the dashes stripped
    pub fn login_customer_id_digits(&self) -> String {
        strip_dashes(&self.login_customer_id)
    }
}

fn strip_dashes(id: &str) -> String {
    id.trim().replace('-', "")
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp
pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.date_naive())
        .map_err(|_| Error::invalid_value(field, format!("'{value}' is not a valid date")))
}

// ============================================================================
// Custom Report Config
// ============================================================================

/// A user-defined report stream as it appears in the config.
///
/// Every field is optional at this level so that the catalog resolver can
/// report exactly which one is missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomReportConfig {
    /// Stream name, unique across the catalog
    #[serde(default)]
    pub name: Option<String>,

    /// GAQL report query
    #[serde(default, alias = "gaql")]
    pub query: Option<String>,

    /// JSONPaths used to derive `_sdc_primary_key`
    #[serde(default)]
    pub primary_keys_jsonpaths: Option<Vec<String>>,

    /// Primary key field names in the emitted schema
    #[serde(default)]
    pub primary_keys: Option<Vec<String>>,

    /// Bookmark field (dot path); absent means full table
    #[serde(default)]
    pub replication_key: Option<String>,

    /// Path to the JSON schema for this report
    #[serde(default)]
    pub schema_filepath: Option<String>,
}

impl CustomReportConfig {
    /// Create a report config with all required fields set
    pub fn new(
        name: impl Into<String>,
        query: impl Into<String>,
        primary_keys_jsonpaths: Vec<String>,
        schema_filepath: impl Into<String>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            query: Some(query.into()),
            primary_keys_jsonpaths: Some(primary_keys_jsonpaths),
            primary_keys: None,
            replication_key: None,
            schema_filepath: Some(schema_filepath.into()),
        }
    }

    /// Set explicit primary keys
    #[must_use]
    pub fn with_primary_keys(mut self, keys: Vec<String>) -> Self {
        self.primary_keys = Some(keys);
        self
    }

    /// Set the replication key
    #[must_use]
    pub fn with_replication_key(mut self, key: impl Into<String>) -> Self {
        self.replication_key = Some(key.into());
        self
    }
}

// ============================================================================
// Run Context
// ============================================================================

/// Inclusive report date range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Immutable per-run context shared by every resolved stream
#[derive(Debug, Clone)]
pub struct TapContext {
    /// The validated configuration
    pub config: TapConfig,
    /// Report date range with defaults applied
    pub dates: DateRange,
}

impl TapContext {
    /// Build a run context, applying `today` to missing dates
    pub fn new(config: TapConfig, today: NaiveDate) -> Result<Self> {
        let dates = config.date_range(today)?;
        Ok(Self { config, dates })
    }

    /// Versioned API root, e.g. `https://googleads.googleapis.com/v17`
    pub fn api_root(&self) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.api_version
        )
    }
}

// ============================================================================
// Spec Config (config JSON schema)
// ============================================================================

/// Configuration specification for tap setup
#[derive(Debug, Clone, Default)]
pub struct SpecConfig {
    /// Configuration properties, in declaration order
    pub properties: Vec<(String, PropertyConfig)>,
}

/// Configuration property definition
#[derive(Debug, Clone, Default)]
pub struct PropertyConfig {
    /// Property type
    pub property_type: PropertyType,
    /// Property description
    pub description: Option<String>,
    /// Whether this is a secret (should be masked)
    pub secret: bool,
    /// Whether this property is required
    pub required: bool,
    /// Default value
    pub default: Option<Value>,
    /// Format hint (e.g., "date")
    pub format: Option<String>,
    /// For arrays: item type
    pub items: Option<Box<PropertyConfig>>,
    /// For objects: nested properties
    pub properties: Option<Vec<(String, PropertyConfig)>>,
}

impl PropertyConfig {
    fn of(property_type: PropertyType) -> Self {
        Self {
            property_type,
            ..Default::default()
        }
    }

    fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    fn describe(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Render as a JSON schema fragment
    pub fn to_json_schema(&self) -> Value {
        let mut schema = serde_json::Map::new();
        schema.insert("type".into(), serde_json::to_value(&self.property_type).unwrap_or_default());
        if let Some(description) = &self.description {
            schema.insert("description".into(), json!(description));
        }
        if self.secret {
            schema.insert("secret".into(), json!(true));
        }
        if let Some(default) = &self.default {
            schema.insert("default".into(), default.clone());
        }
        if let Some(format) = &self.format {
            schema.insert("format".into(), json!(format));
        }
        if let Some(items) = &self.items {
            schema.insert("items".into(), items.to_json_schema());
        }
        if let Some(properties) = &self.properties {
            let (props, required) = render_properties(properties);
            schema.insert("properties".into(), props);
            schema.insert("required".into(), required);
        }
        Value::Object(schema)
    }
}

fn render_properties(properties: &[(String, PropertyConfig)]) -> (Value, Value) {
    let props: BTreeMap<&str, Value> = properties
        .iter()
        .map(|(name, prop)| (name.as_str(), prop.to_json_schema()))
        .collect();
    let required: Vec<&str> = properties
        .iter()
        .filter(|(_, prop)| prop.required)
        .map(|(name, _)| name.as_str())
        .collect();
    (json!(props), json!(required))
}

impl SpecConfig {
    /// Render the whole specification as a JSON schema document
    pub fn to_json_schema(&self) -> Value {
        let (properties, required) = render_properties(&self.properties);
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// The configuration surface accepted by the tap
pub fn config_spec() -> SpecConfig {
    let string = || PropertyConfig::of(PropertyType::String);
    let string_array = || PropertyConfig {
        items: Some(Box::new(string())),
        ..PropertyConfig::of(PropertyType::Array)
    };
    let date = |description: &str| PropertyConfig {
        format: Some("date".to_string()),
        ..string().describe(description)
    };

    let report = PropertyConfig {
        properties: Some(vec![
            ("name".into(), string().required()),
            ("query".into(), string().required().describe("GAQL report query")),
            ("primary_keys_jsonpaths".into(), string_array().required()),
            (
                "primary_keys".into(),
                PropertyConfig {
                    default: Some(json!(["_sdc_primary_key"])),
                    ..string_array()
                },
            ),
            (
                "replication_key".into(),
                string().describe("Bookmark field; omit for full table replication"),
            ),
            ("schema_filepath".into(), string().required()),
        ]),
        ..PropertyConfig::of(PropertyType::Object)
    };

    SpecConfig {
        properties: vec![
            ("client_id".into(), string().required()),
            ("client_secret".into(), string().required().secret()),
            ("developer_token".into(), string().required().secret()),
            ("refresh_token".into(), string().required().secret()),
            ("customer_id".into(), string().required()),
            ("login_customer_id".into(), string().required()),
            ("start_date".into(), date("First report date, defaults to today")),
            ("end_date".into(), date("Last report date, defaults to today")),
            (
                "custom_reports".into(),
                PropertyConfig {
                    items: Some(Box::new(report)),
                    default: Some(json!([])),
                    ..PropertyConfig::of(PropertyType::Array)
                },
            ),
            (
                "base_url".into(),
                PropertyConfig {
                    default: Some(json!(default_base_url())),
                    format: Some("uri".to_string()),
                    ..string().describe("Google Ads API host")
                },
            ),
            (
                "token_url".into(),
                PropertyConfig {
                    default: Some(json!(default_token_url())),
                    format: Some("uri".to_string()),
                    ..string().describe("OAuth2 token endpoint")
                },
            ),
            (
                "api_version".into(),
                PropertyConfig {
                    default: Some(json!(default_api_version())),
                    ..string()
                },
            ),
            (
                "requests_per_second".into(),
                PropertyConfig {
                    default: Some(json!(default_rps())),
                    ..PropertyConfig::of(PropertyType::Integer)
                },
            ),
            (
                "max_retries".into(),
                PropertyConfig {
                    default: Some(json!(default_max_retries())),
                    ..PropertyConfig::of(PropertyType::Integer)
                },
            ),
        ],
    }
}
