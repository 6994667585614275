//! Tests for the stream catalog

use super::*;
use crate::config::{CustomReportConfig, TapConfig, TapContext};
use crate::error::Error;
use crate::types::SyncMode;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use test_case::test_case;

fn context() -> Arc<TapContext> {
    let config = TapConfig::from_value(json!({
        "client_id": "client",
        "client_secret": "secret",
        "developer_token": "dev-token",
        "refresh_token": "refresh",
        "customer_id": "123-456-7890",
        "login_customer_id": "111-222-3333",
        "start_date": "2024-01-01",
        "end_date": "2024-01-31"
    }))
    .unwrap();
    let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
    Arc::new(TapContext::new(config, today).unwrap())
}

fn report(name: &str) -> CustomReportConfig {
    CustomReportConfig::new(
        name,
        "SELECT customer.id, metrics.cost_micros FROM customer",
        vec!["$.customer.id".to_string()],
        format!("schemas/{name}.json"),
    )
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// ============================================================================
// Built-in Streams
// ============================================================================

#[test]
fn test_builtin_names_are_unique() {
    let mut names: Vec<&str> = BuiltinStream::ALL.iter().map(|s| s.name()).collect();
    let total = names.len();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), total);
}

#[test]
fn test_builtin_from_name() {
    for stream in BuiltinStream::ALL {
        assert_eq!(BuiltinStream::from_name(stream.name()), Some(stream));
    }
    assert_eq!(BuiltinStream::from_name("daily_spend"), None);
}

#[test]
fn test_builtin_query_with_date_filter() {
    let query = BuiltinStream::CampaignPerformance.query_template().unwrap();
    assert!(query.starts_with("SELECT campaign.id, campaign.name"));
    assert!(query.contains(" FROM campaign WHERE "));
    assert!(query.ends_with(DATE_FILTER));
}

#[test]
fn test_builtin_query_combines_filters() {
    let query = BuiltinStream::CustomerHierarchy.query_template().unwrap();
    assert!(query.ends_with("FROM customer_client WHERE customer_client.level <= 1"));
}

#[test]
fn test_builtin_query_without_filter() {
    let query = BuiltinStream::Geotargets.query_template().unwrap();
    assert!(query.ends_with("FROM geo_target_constant"));
    assert!(!query.contains("WHERE"));
}

#[test]
fn test_accessible_customers_has_no_query() {
    assert_eq!(BuiltinStream::AccessibleCustomers.query_template(), None);
    assert_eq!(
        BuiltinStream::AccessibleCustomers.descriptor().endpoint,
        Endpoint::ListAccessibleCustomers
    );
}

#[test_case(BuiltinStream::AdGroupsPerformance)]
#[test_case(BuiltinStream::CampaignPerformance)]
#[test_case(BuiltinStream::CampaignPerformanceByAgeRangeAndDevice)]
#[test_case(BuiltinStream::CampaignPerformanceByGenderAndDevice)]
#[test_case(BuiltinStream::CampaignPerformanceByLocation)]
#[test_case(BuiltinStream::ConversionsByLocation)]
fn test_report_streams_are_incremental(stream: BuiltinStream) {
    let desc = stream.descriptor();
    assert!(desc.date_filtered);
    assert_eq!(desc.replication_key, Some("segments.date"));
}

// ============================================================================
// Resolution
// ============================================================================

#[test]
fn test_resolve_builtins_only() {
    let catalog = resolve(&BuiltinStream::ALL, &[], context()).unwrap();

    let expected: Vec<&str> = BuiltinStream::ALL.iter().map(|s| s.name()).collect();
    assert_eq!(catalog.names(), expected);
    assert_eq!(catalog.len(), BuiltinStream::ALL.len());
}

#[test]
fn test_resolve_appends_custom_reports_in_order() {
    let customs = vec![report("daily_spend"), report("weekly_clicks"), report("audiences")];
    let catalog = resolve(&BuiltinStream::ALL, &customs, context()).unwrap();

    assert_eq!(catalog.len(), BuiltinStream::ALL.len() + customs.len());
    let names = catalog.names();
    assert_eq!(
        &names[BuiltinStream::ALL.len()..],
        &["daily_spend", "weekly_clicks", "audiences"]
    );
    assert_eq!(names[0], "customer");
}

#[test]
fn test_resolve_end_to_end() {
    let builtins = [
        BuiltinStream::Customer,
        BuiltinStream::Campaigns,
        BuiltinStream::AdGroups,
    ];
    let customs = vec![CustomReportConfig::new(
        "X",
        "SELECT customer.id FROM customer",
        vec!["$.id".to_string()],
        "x.json",
    )];

    let catalog = resolve(&builtins, &customs, context()).unwrap();
    assert_eq!(catalog.names(), vec!["customer", "campaigns", "ad_groups", "X"]);

    let x = catalog.get("X").unwrap();
    assert_eq!(x.primary_keys(), &["_sdc_primary_key".to_string()]);
    assert_eq!(x.replication_key(), None);
    assert!(x.is_full_refresh());
}

#[test]
fn test_resolve_empty_builtins() {
    let catalog = resolve(&[], &[report("daily_spend")], context()).unwrap();
    assert_eq!(catalog.names(), vec!["daily_spend"]);
}

#[test]
fn test_resolve_nothing() {
    let catalog = resolve(&[], &[], context()).unwrap();
    assert!(catalog.is_empty());
}

#[test]
fn test_resolve_is_idempotent() {
    let customs = vec![report("daily_spend"), report("weekly_clicks")];
    let ctx = context();

    let first = resolve(&BuiltinStream::ALL, &customs, Arc::clone(&ctx)).unwrap();
    let second = resolve(&BuiltinStream::ALL, &customs, ctx).unwrap();
    assert_eq!(first.names(), second.names());
}

#[test]
fn test_default_primary_keys() {
    let catalog = resolve(&[], &[report("daily_spend")], context()).unwrap();
    let stream = catalog.get("daily_spend").unwrap();
    assert_eq!(stream.primary_keys(), &[SYNTHETIC_PRIMARY_KEY.to_string()]);
    assert_eq!(stream.primary_keys_jsonpaths(), &["$.customer.id".to_string()]);
}

#[test]
fn test_explicit_primary_keys_and_replication_key() {
    let custom = report("daily_spend")
        .with_primary_keys(vec!["customer_id".to_string(), "date".to_string()])
        .with_replication_key("segments.date");
    let catalog = resolve(&[], &[custom], context()).unwrap();
    let stream = catalog.get("daily_spend").unwrap();

    assert_eq!(stream.primary_keys(), &["customer_id".to_string(), "date".to_string()]);
    assert_eq!(stream.replication_key(), Some("segments.date"));
    assert_eq!(stream.sync_mode(), SyncMode::Incremental);
}

#[test]
fn test_missing_replication_key_is_full_refresh() {
    let catalog = resolve(&[], &[report("daily_spend")], context()).unwrap();
    let stream = catalog.get("daily_spend").unwrap();
    assert!(stream.is_full_refresh());
    assert_eq!(stream.sync_mode(), SyncMode::FullTable);
}

#[test]
fn test_resolution_does_not_touch_schema_files() {
    let custom = CustomReportConfig::new(
        "daily_spend",
        "SELECT customer.id FROM customer",
        vec!["$.customer.id".to_string()],
        "/nonexistent/daily_spend.json",
    );
    assert!(resolve(&[], &[custom], context()).is_ok());
}

// ============================================================================
// Resolution Errors
// ============================================================================

#[test]
fn test_duplicate_custom_names() {
    let customs = vec![report("daily_spend"), report("daily_spend")];
    let err = resolve(&BuiltinStream::ALL, &customs, context()).unwrap_err();
    assert!(matches!(err, Error::DuplicateStreamName { ref name } if name == "daily_spend"));
}

#[test_case("campaigns" ; "exact")]
#[test_case("Campaigns" ; "different case")]
fn test_custom_collides_with_builtin(name: &str) {
    let err = resolve(&BuiltinStream::ALL, &[report(name)], context()).unwrap_err();
    assert!(matches!(err, Error::DuplicateStreamName { name: ref n } if n == name));
}

#[test]
fn test_duplicate_builtins() {
    let builtins = [BuiltinStream::Customer, BuiltinStream::Customer];
    let err = resolve(&builtins, &[], context()).unwrap_err();
    assert!(matches!(err, Error::DuplicateStreamName { ref name } if name == "customer"));
}

#[test]
fn test_missing_query() {
    let mut custom = report("daily_spend");
    custom.query = None;

    let err = resolve(&BuiltinStream::ALL, &[custom], context()).unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidStreamConfig { ref stream, ref field }
            if stream == "daily_spend" && field == "query"
    ));
}

#[test]
fn test_missing_name_uses_index() {
    let mut nameless = report("ignored");
    nameless.name = Some("  ".to_string());

    let err = resolve(&[], &[report("first"), nameless], context()).unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidStreamConfig { ref stream, ref field }
            if stream == "custom_reports[1]" && field == "name"
    ));
}

#[test_case("primary_keys_jsonpaths", None ; "jsonpaths absent")]
#[test_case("primary_keys_jsonpaths", Some("") ; "jsonpaths empty")]
#[test_case("schema_filepath", None ; "schema absent")]
#[test_case("query", Some("") ; "query empty")]
fn test_missing_required_field(field: &str, value: Option<&str>) {
    let mut custom = report("daily_spend");
    let value = value.map(str::to_string);
    match field {
        "primary_keys_jsonpaths" => {
            custom.primary_keys_jsonpaths = value.map(|_| Vec::new());
        }
        "schema_filepath" => custom.schema_filepath = value,
        "query" => custom.query = value,
        _ => unreachable!(),
    }

    let err = resolve(&[], &[custom], context()).unwrap_err();
    assert!(err.is_catalog_error());
    assert!(matches!(err, Error::InvalidStreamConfig { field: ref f, .. } if f == field));
}

#[test]
fn test_invalid_report_before_duplicate_fails_on_first() {
    let mut invalid = report("daily_spend");
    invalid.schema_filepath = None;
    let customs = vec![invalid, report("campaigns")];

    let err = resolve(&BuiltinStream::ALL, &customs, context()).unwrap_err();
    assert!(matches!(err, Error::InvalidStreamConfig { .. }));
}

// ============================================================================
// Catalog Queries
// ============================================================================

#[test]
fn test_select_streams() {
    let catalog = resolve(&BuiltinStream::ALL, &[report("daily_spend")], context()).unwrap();

    let selected = catalog
        .select(&["daily_spend".to_string(), "campaigns".to_string()])
        .unwrap();
    let names: Vec<&str> = selected.iter().map(|s| s.name()).collect();
    assert_eq!(names, vec!["campaigns", "daily_spend"]);

    assert_eq!(catalog.select(&[]).unwrap().len(), catalog.len());
}

#[test]
fn test_select_unknown_stream() {
    let catalog = resolve(&BuiltinStream::ALL, &[], context()).unwrap();
    let err = catalog.select(&["nope".to_string()]).unwrap_err();
    assert!(matches!(err, Error::StreamNotFound { ref stream } if stream == "nope"));
}

// ============================================================================
// Resolved Stream Behaviour
// ============================================================================

#[test]
fn test_builtin_query_rendering() {
    let stream = ResolvedStream::builtin(BuiltinStream::AdGroupsPerformance, context());
    let query = stream
        .query(date(2024, 1, 1), date(2024, 1, 31))
        .unwrap()
        .unwrap();
    assert!(query.ends_with(
        "WHERE segments.date >= '2024-01-01' AND segments.date <= '2024-01-31'"
    ));
}

#[test]
fn test_custom_query_rendering() {
    let custom = CustomReportConfig::new(
        "daily_spend",
        "SELECT metrics.cost_micros FROM customer WHERE segments.date BETWEEN '{{ start_date }}' AND '{{ end_date }}' AND customer.id = {{ customer_id }}",
        vec!["$.customer.id".to_string()],
        "daily_spend.json",
    );
    let catalog = resolve(&[], &[custom], context()).unwrap();
    let query = catalog
        .get("daily_spend")
        .unwrap()
        .query(date(2024, 2, 1), date(2024, 2, 2))
        .unwrap()
        .unwrap();
    assert_eq!(
        query,
        "SELECT metrics.cost_micros FROM customer WHERE segments.date BETWEEN '2024-02-01' AND '2024-02-02' AND customer.id = 1234567890"
    );
}

#[test]
fn test_custom_query_undefined_variable() {
    let custom = CustomReportConfig::new(
        "daily_spend",
        "SELECT x FROM y WHERE z = '{{ nope }}'",
        vec!["$.x".to_string()],
        "daily_spend.json",
    );
    let catalog = resolve(&[], &[custom], context()).unwrap();
    let err = catalog
        .get("daily_spend")
        .unwrap()
        .query(date(2024, 1, 1), date(2024, 1, 1))
        .unwrap_err();
    assert!(matches!(err, Error::UndefinedVariable { .. }));
}

#[test]
fn test_builtin_schema_has_synthetic_key() {
    let stream = ResolvedStream::builtin(BuiltinStream::Campaigns, context());
    let schema = stream.schema().unwrap();
    assert_eq!(schema["properties"]["_sdc_primary_key"]["type"], "string");
    assert!(schema["properties"]["campaign"]["properties"]["advertisingChannelType"].is_object());
}

#[test]
fn test_accessible_customers_schema() {
    let stream = ResolvedStream::builtin(BuiltinStream::AccessibleCustomers, context());
    let schema = stream.schema().unwrap();
    assert!(schema["properties"]["resourceName"].is_object());
    assert!(schema["properties"].get("_sdc_primary_key").is_none());
}

#[test]
fn test_custom_schema_loaded_lazily() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"type": "object", "properties": {{"customer": {{"type": ["object", "null"]}}}}}}"#
    )
    .unwrap();

    let custom = CustomReportConfig::new(
        "daily_spend",
        "SELECT customer.id FROM customer",
        vec!["$.customer.id".to_string()],
        file.path().to_string_lossy(),
    );
    let catalog = resolve(&[], &[custom], context()).unwrap();
    let schema = catalog.get("daily_spend").unwrap().schema().unwrap();

    assert!(schema["properties"]["customer"].is_object());
    assert_eq!(schema["properties"]["_sdc_primary_key"]["type"], "string");
}

#[test]
fn test_custom_schema_missing_file() {
    let custom = CustomReportConfig::new(
        "daily_spend",
        "SELECT customer.id FROM customer",
        vec!["$.customer.id".to_string()],
        "/nonexistent/daily_spend.json",
    );
    let catalog = resolve(&[], &[custom], context()).unwrap();
    let err = catalog.get("daily_spend").unwrap().schema().unwrap_err();
    assert!(matches!(err, Error::FileNotFound { .. }));
}

#[test]
fn test_process_record_adds_key() {
    let stream = ResolvedStream::builtin(BuiltinStream::CampaignPerformance, context());
    let record = json!({
        "campaign": {"id": "42", "name": "Brand"},
        "segments": {"device": "MOBILE", "date": "2024-01-05"},
        "metrics": {"clicks": "10"}
    });

    let processed = stream.process_record(record.clone()).unwrap();
    let key = processed["_sdc_primary_key"].as_str().unwrap();
    assert_eq!(
        key,
        derive_primary_key(&record, stream.primary_keys_jsonpaths()).unwrap()
    );
    assert_eq!(processed["campaign"]["name"], "Brand");
}

#[test]
fn test_process_record_without_jsonpaths() {
    let stream = ResolvedStream::builtin(BuiltinStream::AccessibleCustomers, context());
    let record = json!({"resourceName": "customers/1"});
    assert_eq!(stream.process_record(record.clone()).unwrap(), record);
}

#[test]
fn test_explicit_primary_keys_schema_declares_record_fields() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"type": "object", "properties": {{"campaign": {{"type": "object"}}}}}}"#
    )
    .unwrap();
    let custom = CustomReportConfig::new(
        "campaign_ids",
        "SELECT campaign.id FROM campaign",
        vec!["$.campaign.id".to_string()],
        file.path().to_string_lossy(),
    )
    .with_primary_keys(vec!["campaign_id".to_string()]);
    let catalog = resolve(&[], &[custom], context()).unwrap();
    let stream = catalog.get("campaign_ids").unwrap();

    let schema = stream.schema().unwrap();
    let record = stream
        .process_record(json!({"campaign": {"id": "42"}}))
        .unwrap();

    let properties = schema["properties"].as_object().unwrap();
    for key in record.as_object().unwrap().keys() {
        assert!(properties.contains_key(key), "{key} missing from schema");
    }
}

#[test]
fn test_process_record_invalid_jsonpath() {
    let custom = CustomReportConfig::new(
        "daily_spend",
        "SELECT customer.id FROM customer",
        vec!["$[?(".to_string()],
        "daily_spend.json",
    );
    let catalog = resolve(&[], &[custom], context()).unwrap();
    let err = catalog
        .get("daily_spend")
        .unwrap()
        .process_record(json!({"customer": {"id": "1"}}))
        .unwrap_err();
    assert!(matches!(err, Error::JsonPath { .. }));
}

#[test]
fn test_singer_catalog_entry() {
    let catalog = resolve(&[BuiltinStream::CampaignPerformance], &[], context()).unwrap();
    let doc = catalog.to_singer_catalog().unwrap();

    let entry = &doc["streams"][0];
    assert_eq!(entry["tap_stream_id"], "campaign_performance");
    assert_eq!(entry["key_properties"], json!(["_sdc_primary_key"]));
    assert_eq!(entry["replication_key"], "segments.date");
    assert_eq!(entry["replication_method"], "INCREMENTAL");
    assert_eq!(
        entry["metadata"][0]["metadata"]["valid-replication-keys"],
        json!(["segments.date"])
    );
}
