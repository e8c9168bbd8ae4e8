use super::*;
use crate::AssistError;
use crate::config::ConfigError;
use crate::cosmos::{AccessToken, CosmosError, StaticTokenCredential};
use chrono::Utc;
use serde_json::{Map, Value};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

const CATALOG: &str = "\
ProductID,ProductName,ProductCategory,ProductDescription,Price
OM-403,Effervescent Jade,Paint,Jade green paint,24.99
OM-404,Amber Glow,Paint,Warm amber paint,19.5
1001,Canvas,,Stretched cotton canvas,12
";

/// Container stand-in keyed by document id
#[derive(Debug, Default)]
struct MemorySink {
    field: String,
    documents: RefCell<BTreeMap<String, Map<String, Value>>>,
    fail_after: Option<usize>,
    writes: Cell<usize>,
}

impl MemorySink {
    fn new(field: &str) -> Self {
        Self {
            field: field.to_string(),
            ..Self::default()
        }
    }

    fn failing_after(field: &str, writes: usize) -> Self {
        Self {
            fail_after: Some(writes),
            ..Self::new(field)
        }
    }

    fn snapshot(&self) -> BTreeMap<String, Map<String, Value>> {
        self.documents.borrow().clone()
    }
}

impl ItemSink for MemorySink {
    fn partition_key_field(&self) -> &str {
        &self.field
    }

    fn upsert_item(&self, item: &Map<String, Value>) -> Result<(), CosmosError> {
        if self.fail_after.is_some_and(|limit| self.writes.get() >= limit) {
            return Err(CosmosError::from_response(
                429,
                None,
                r#"{"code":"TooManyRequests","message":"Request rate is large"}"#,
            ));
        }

        let id = item
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| CosmosError::InvalidDocument("missing id".to_string()))?;
        self.documents
            .borrow_mut()
            .insert(id.to_string(), item.clone());
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}

fn table() -> CatalogTable {
    let mut table = CatalogTable::parse(CATALOG).expect("catalog should parse");
    table.derive_search_text();
    table
}

#[test]
fn uploads_every_row_in_order() {
    let sink = MemorySink::new("ProductID");
    let mut seen = Vec::new();

    let uploaded = upload_documents(&sink, &table(), |id| seen.push(id.to_string()))
        .expect("upload should succeed");

    assert_eq!(uploaded, 3);
    assert_eq!(seen, vec!["OM-403", "OM-404", "1001"]);
    assert_eq!(sink.snapshot().len(), 3);
}

#[test]
fn every_document_keys_on_product_id() {
    let sink = MemorySink::new("ProductID");
    upload_documents(&sink, &table(), |_| {}).expect("upload should succeed");

    for (key, document) in sink.snapshot() {
        assert_eq!(document["id"], Value::from(key.as_str()));
        assert_eq!(document["id"], document["ProductID"]);
        assert!(document["ProductID"].is_string());
    }
}

#[test]
fn custom_partition_field_mirrors_product_id() {
    let sink = MemorySink::new("sku");
    upload_documents(&sink, &table(), |_| {}).expect("upload should succeed");

    let documents = sink.snapshot();
    let canvas = &documents["1001"];
    assert_eq!(canvas["sku"], Value::from("1001"));
    assert_eq!(canvas["ProductID"], Value::from("1001"));
}

#[test]
fn reingest_of_unchanged_catalog_is_idempotent() {
    let sink = MemorySink::new("ProductID");

    upload_documents(&sink, &table(), |_| {}).expect("first run should succeed");
    let first = sink.snapshot();

    upload_documents(&sink, &table(), |_| {}).expect("second run should succeed");
    let second = sink.snapshot();

    assert_eq!(first, second);
    assert_eq!(sink.writes.get(), 6);
}

#[test]
fn sink_failure_halts_remaining_rows() {
    let sink = MemorySink::failing_after("ProductID", 1);
    let mut seen = Vec::new();

    let result = upload_documents(&sink, &table(), |id| seen.push(id.to_string()));

    assert!(matches!(result, Err(AssistError::Cosmos(_))));
    assert_eq!(seen, vec!["OM-403"]);
    assert_eq!(sink.snapshot().len(), 1);
}

#[test]
fn malformed_row_halts_remaining_rows() {
    let mut table = CatalogTable::parse(
        "ProductID,ProductName\nOM-1,Widget\nOM-2,Gadget,extra\nOM-3,Sprocket\n",
    )
    .expect("catalog should parse");
    table.derive_search_text();

    let sink = MemorySink::new("ProductID");
    let result = upload_documents(&sink, &table, |_| {});

    assert!(matches!(
        result,
        Err(AssistError::Catalog(CatalogError::RowShape { row: 2, .. }))
    ));
    let stored: Vec<String> = sink.snapshot().into_keys().collect();
    assert_eq!(stored, vec!["OM-1"]);
}

fn credential() -> Arc<dyn TokenCredential> {
    Arc::new(StaticTokenCredential::new(AccessToken::new(
        "unused",
        Utc::now() + chrono::Duration::hours(1),
    )))
}

#[test]
fn missing_database_name_fails_before_reading_catalog() {
    let mut config = Config::default();
    config.cosmos.endpoint = "https://retail.documents.azure.com/".to_string();
    config.cosmos.container = "products".to_string();
    config.ingest.catalog_path = "does/not/exist.csv".into();

    let result = run_ingestion(&config, None, credential(), |_| {});

    assert!(matches!(
        result,
        Err(AssistError::Config(ConfigError::Missing(_)))
    ));
}

#[test]
fn missing_catalog_fails_before_connecting() {
    let mut config = Config::default();
    config.cosmos.database = "retail".to_string();
    config.cosmos.container = "products".to_string();

    let dir = tempfile::tempdir().expect("should create temp dir");
    let missing = dir.path().join("catalog.csv");

    let result = run_ingestion(&config, Some(missing.as_path()), credential(), |_| {});

    assert!(matches!(
        result,
        Err(AssistError::Catalog(CatalogError::Read { .. }))
    ));
}

#[test]
fn empty_endpoint_is_reported_after_catalog_loads() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let path = dir.path().join("catalog.csv");
    std::fs::write(&path, CATALOG).expect("should write catalog");

    let mut config = Config::default();
    config.cosmos.database = "retail".to_string();
    config.cosmos.container = "products".to_string();

    let result = run_ingestion(&config, Some(path.as_path()), credential(), |_| {});

    assert!(matches!(
        result,
        Err(AssistError::Connect(ConnectError::MissingEndpoint))
    ));
}
