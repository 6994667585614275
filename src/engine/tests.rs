//! Tests for engine module

use super::*;
use crate::catalog::{BuiltinStream, CustomReport};
use crate::config::{TapConfig, TapContext};
use crate::http::HttpClientConfig;
use chrono::NaiveDate;
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use wiremock::matchers::{body_partial_json, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SEARCH_PATH: &str = "/v17/customers/1234567890/googleAds:search";

fn context(server: &MockServer) -> Arc<TapContext> {
    let config = TapConfig::from_value(json!({
        "client_id": "client",
        "client_secret": "secret",
        "developer_token": "dev-token",
        "refresh_token": "refresh",
        "customer_id": "123-456-7890",
        "login_customer_id": "111-222-3333",
        "start_date": "2024-01-01",
        "end_date": "2024-01-31",
        "base_url": server.uri()
    }))
    .unwrap();
    let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
    Arc::new(TapContext::new(config, today).unwrap())
}

fn engine(state: StateManager) -> SyncEngine {
    let config = HttpClientConfig::builder().no_rate_limit().max_retries(0).build();
    SyncEngine::new(HttpClient::with_config(config).unwrap(), state)
}

fn records(messages: &[Message]) -> Vec<&Value> {
    messages
        .iter()
        .filter_map(|m| match m {
            Message::Record { record, .. } => Some(record),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Message Tests
// ============================================================================

#[test]
fn test_message_schema_json() {
    let msg = Message::schema(
        "campaign_performance",
        json!({"type": "object"}),
        vec!["_sdc_primary_key".to_string()],
        vec!["segments.date".to_string()],
    );
    assert!(msg.is_schema());
    assert_eq!(
        msg.to_json(),
        json!({
            "type": "SCHEMA",
            "stream": "campaign_performance",
            "schema": {"type": "object"},
            "key_properties": ["_sdc_primary_key"],
            "bookmark_properties": ["segments.date"]
        })
    );
}

#[test]
fn test_message_record_json() {
    let msg = Message::record("campaigns", json!({"campaign": {"id": "1"}}));
    assert!(msg.is_record());
    assert!(!msg.is_state());

    let value = msg.to_json();
    assert_eq!(value["type"], "RECORD");
    assert_eq!(value["record"]["campaign"]["id"], "1");
    let extracted = value["time_extracted"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(extracted).is_ok());
}

#[test]
fn test_message_state_json() {
    let msg = Message::state(json!({"bookmarks": {}}));
    assert!(msg.is_state());
    assert_eq!(msg.to_json(), json!({"type": "STATE", "value": {"bookmarks": {}}}));
}

// ============================================================================
// SyncConfig / SyncStats Tests
// ============================================================================

#[test]
fn test_sync_config() {
    assert_eq!(SyncConfig::default().max_records, 0);
    assert_eq!(SyncConfig::new().with_max_records(25).max_records, 25);
}

#[test]
fn test_sync_stats_mutations() {
    let mut stats = SyncStats::new();
    stats.add_records(100);
    stats.add_page();
    stats.add_page();
    stats.add_stream();
    stats.add_duration(1500);

    assert_eq!(stats.records_synced, 100);
    assert_eq!(stats.pages_fetched, 2);
    assert_eq!(stats.streams_synced, 1);
    assert_eq!(stats.duration_ms, 1500);
}

// ============================================================================
// SyncEngine Tests
// ============================================================================

#[tokio::test]
async fn test_sync_full_table_stream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .and(body_string_contains("FROM campaign"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"campaign": {"id": "1", "name": "Brand"}},
                {"campaign": {"id": "2", "name": "Generic"}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let stream = ResolvedStream::builtin(BuiltinStream::Campaigns, context(&server));
    let mut engine = engine(StateManager::in_memory());
    let messages = engine.sync_stream(&stream).await.unwrap();

    assert!(messages[0].is_schema());
    let rows = records(&messages);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["campaign"]["name"], "Brand");
    assert_eq!(rows[0]["_sdc_primary_key"].as_str().unwrap().len(), 64);
    assert_ne!(rows[0]["_sdc_primary_key"], rows[1]["_sdc_primary_key"]);
    assert!(!messages.iter().any(Message::is_state));

    assert_eq!(engine.stats().records_synced, 2);
    assert_eq!(engine.stats().pages_fetched, 1);
    assert_eq!(engine.stats().streams_synced, 1);
}

#[tokio::test]
async fn test_sync_follows_page_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .and(body_partial_json(json!({"pageToken": "PAGE2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"campaign": {"id": "3"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"campaign": {"id": "1"}}, {"campaign": {"id": "2"}}],
            "nextPageToken": "PAGE2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let stream = ResolvedStream::builtin(BuiltinStream::Campaigns, context(&server));
    let mut engine = engine(StateManager::in_memory());
    let messages = engine.sync_stream(&stream).await.unwrap();

    let ids: Vec<&str> = records(&messages)
        .iter()
        .map(|r| r["campaign"]["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
    assert_eq!(engine.stats().pages_fetched, 2);
}

#[tokio::test]
async fn test_sync_max_records_stops_paging() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"campaign": {"id": "1"}}, {"campaign": {"id": "2"}}],
            "nextPageToken": "MORE"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let stream = ResolvedStream::builtin(BuiltinStream::Campaigns, context(&server));
    let mut engine =
        engine(StateManager::in_memory()).with_config(SyncConfig::new().with_max_records(1));
    let messages = engine.sync_stream(&stream).await.unwrap();

    assert_eq!(records(&messages).len(), 1);
    assert_eq!(engine.stats().records_synced, 1);
}

#[tokio::test]
async fn test_sync_incremental_emits_state() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .and(body_string_contains("segments.date >= '2024-01-01'"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"campaign": {"id": "1"}, "segments": {"date": "2024-01-03", "device": "MOBILE"}},
                {"campaign": {"id": "1"}, "segments": {"date": "2024-01-05", "device": "MOBILE"}},
                {"campaign": {"id": "1"}, "segments": {"date": "2024-01-04", "device": "MOBILE"}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let stream = ResolvedStream::builtin(BuiltinStream::CampaignPerformance, context(&server));
    let mut engine = engine(StateManager::in_memory());
    let messages = engine.sync_stream(&stream).await.unwrap();

    let last = messages.last().unwrap();
    assert_eq!(
        last.to_json()["value"]["bookmarks"]["campaign_performance"],
        json!({"replication_key": "segments.date", "replication_key_value": "2024-01-05"})
    );
    assert_eq!(
        engine.state().get_bookmark_value("campaign_performance").await,
        Some(json!("2024-01-05"))
    );
}

#[tokio::test]
async fn test_sync_bookmark_property_resolves_in_records() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"campaign": {"id": "1"}, "segments": {"date": "2024-01-03", "device": "MOBILE"}}]
        })))
        .mount(&server)
        .await;

    let stream = ResolvedStream::builtin(BuiltinStream::CampaignPerformance, context(&server));
    let messages = engine(StateManager::in_memory())
        .sync_stream(&stream)
        .await
        .unwrap();

    let Message::Schema { bookmark_properties, .. } = &messages[0] else {
        panic!("Expected schema, got {:?}", messages[0]);
    };
    assert_eq!(bookmark_properties, &vec!["segments.date".to_string()]);

    let record = records(&messages)[0];
    assert!(record.get("segments.date").is_none());
    assert_eq!(get_path(record, &bookmark_properties[0]), Some(&json!("2024-01-03")));
}

#[tokio::test]
async fn test_sync_numeric_replication_key_compares_numbers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"id": 9}, {"id": 10}, {"id": 2}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut schema = NamedTempFile::new().unwrap();
    write!(
        schema,
        r#"{{"type": "object", "properties": {{"id": {{"type": "integer"}}}}}}"#
    )
    .unwrap();

    let stream = ResolvedStream::custom(
        "change_events".to_string(),
        CustomReport {
            query: "SELECT change_event.resource_name FROM change_event".to_string(),
            schema_filepath: schema.path().to_path_buf(),
        },
        vec!["_sdc_primary_key".to_string()],
        vec!["$.id".to_string()],
        Some("id".to_string()),
        context(&server),
    );

    let mut engine = engine(StateManager::in_memory());
    engine.sync_stream(&stream).await.unwrap();

    assert_eq!(
        engine.state().get_bookmark_value("change_events").await,
        Some(json!(10))
    );
}

#[tokio::test]
async fn test_sync_resumes_from_bookmark() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .and(body_string_contains("segments.date >= '2024-01-20'"))
        .and(body_string_contains("segments.date <= '2024-01-31'"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .expect(1)
        .mount(&server)
        .await;

    let state = StateManager::from_json(
        r#"{"bookmarks": {"campaign_performance": {"replication_key": "segments.date", "replication_key_value": "2024-01-20T00:00:00Z"}}}"#,
    )
    .unwrap();

    let stream = ResolvedStream::builtin(BuiltinStream::CampaignPerformance, context(&server));
    let mut engine = engine(state);
    let messages = engine.sync_stream(&stream).await.unwrap();

    assert!(records(&messages).is_empty());
    assert!(!messages.iter().any(Message::is_state));
}

#[tokio::test]
async fn test_sync_ignores_older_bookmark() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .and(body_string_contains("segments.date >= '2024-01-01'"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .expect(1)
        .mount(&server)
        .await;

    let state = StateManager::from_json(
        r#"{"bookmarks": {"campaign_performance": {"replication_key_value": "2023-06-01"}}}"#,
    )
    .unwrap();

    let stream = ResolvedStream::builtin(BuiltinStream::CampaignPerformance, context(&server));
    engine(state).sync_stream(&stream).await.unwrap();
}

#[tokio::test]
async fn test_sync_accessible_customers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v17/customers:listAccessibleCustomers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resourceNames": ["customers/1234567890", "customers/9876543210"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let stream = ResolvedStream::builtin(BuiltinStream::AccessibleCustomers, context(&server));
    let mut engine = engine(StateManager::in_memory());
    let messages = engine.sync_stream(&stream).await.unwrap();

    let rows = records(&messages);
    assert_eq!(rows.len(), 2);
    assert_eq!(*rows[0], json!({"resourceName": "customers/1234567890"}));
}

#[tokio::test]
async fn test_sync_custom_report() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .and(body_partial_json(json!({
            "query": "SELECT customer.id FROM customer WHERE segments.date = '2024-01-31'"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"customer": {"id": "1234567890"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut schema = NamedTempFile::new().unwrap();
    write!(
        schema,
        r#"{{"type": "object", "properties": {{"customer": {{"type": "object"}}}}}}"#
    )
    .unwrap();

    let stream = ResolvedStream::custom(
        "daily_customer".to_string(),
        CustomReport {
            query: "SELECT customer.id FROM customer WHERE segments.date = '{{ end_date }}'"
                .to_string(),
            schema_filepath: schema.path().to_path_buf(),
        },
        vec!["_sdc_primary_key".to_string()],
        vec!["$.customer.id".to_string()],
        None,
        context(&server),
    );

    let mut engine = engine(StateManager::in_memory());
    let messages = engine.sync_stream(&stream).await.unwrap();

    match &messages[0] {
        Message::Schema { schema, .. } => {
            assert_eq!(schema["properties"]["_sdc_primary_key"], json!({"type": "string"}));
        }
        other => panic!("Expected schema, got {other:?}"),
    }
    assert_eq!(records(&messages).len(), 1);
}

#[tokio::test]
async fn test_sync_http_error_propagates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad query"))
        .mount(&server)
        .await;

    let stream = ResolvedStream::builtin(BuiltinStream::Customer, context(&server));
    let err = engine(StateManager::in_memory())
        .sync_stream(&stream)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 400, .. }));
}

#[tokio::test]
async fn test_sync_rejects_non_array_results() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": "oops"})))
        .mount(&server)
        .await;

    let stream = ResolvedStream::builtin(BuiltinStream::Customer, context(&server));
    let err = engine(StateManager::in_memory())
        .sync_stream(&stream)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::RecordExtraction { .. }));
}
