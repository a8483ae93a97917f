//! CSV export, sample template, and bulk import through the engine.

mod common;

use async_trait::async_trait;
use backoffice::{
	AdminConfig, AdminError, AdminResult, CrudEngine, ListParams, ObjectStorage, Permissions,
	RegistryBuilder, ResourceDescriptor,
};
use common::{MemoryStore, widget_revision_schema, widget_row, widget_schema};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::Mutex;

fn widget_descriptor() -> ResourceDescriptor {
	ResourceDescriptor::builder("widget", "widgets")
		.list_display(["name", "qty"])
		.permissions(Permissions::all())
		.protected_fields(["internal_code"])
		.secret_field("api_key")
		.build()
}

async fn setup(descriptor: ResourceDescriptor) -> (CrudEngine<Arc<MemoryStore>>, Arc<MemoryStore>) {
	let store = Arc::new(MemoryStore::new(vec![
		widget_schema(),
		widget_revision_schema(),
	]));
	let registry = RegistryBuilder::new()
		.register(descriptor)
		.unwrap()
		.build(store.as_ref())
		.await
		.unwrap();
	let engine = CrudEngine::new(
		Arc::new(registry),
		Arc::clone(&store),
		AdminConfig::default(),
	);
	(engine, store)
}

#[derive(Default)]
struct RecordingStorage {
	puts: Mutex<Vec<(String, usize)>>,
}

#[async_trait]
impl ObjectStorage for RecordingStorage {
	async fn put(&self, data: &[u8], filename: &str, _content_type: &str) -> AdminResult<String> {
		self.puts
			.lock()
			.unwrap()
			.push((filename.to_string(), data.len()));
		Ok(format!("uploads/{filename}"))
	}
}

struct FailingStorage;

#[async_trait]
impl ObjectStorage for FailingStorage {
	async fn put(&self, _data: &[u8], _filename: &str, _content_type: &str) -> AdminResult<String> {
		Err(AdminError::Archive("bucket unreachable".to_string()))
	}
}

#[tokio::test]
async fn test_export_covers_all_columns_and_rows() {
	let (engine, store) = setup(widget_descriptor()).await;
	store.seed(
		"widgets",
		vec![
			widget_row(1, "Alpha", 5, "2024-01-10 08:00:00"),
			widget_row(2, "Beta", 42, "2024-02-20 08:00:00"),
		],
	);

	let bytes = engine
		.export_csv("widget", &ListParams::default())
		.await
		.unwrap();
	let text = String::from_utf8(bytes).unwrap();
	let mut lines = text.lines();

	assert_eq!(
		lines.next().unwrap(),
		"id,name,qty,active,api_key,internal_code,created_at,updated_at"
	);
	// NULL api_key renders as an empty cell
	assert_eq!(
		lines.next().unwrap(),
		"1,Alpha,5,true,,W,2024-01-10 08:00:00,2024-01-10 08:00:00"
	);
	assert_eq!(lines.clone().count(), 1);
}

#[tokio::test]
async fn test_export_applies_filters_but_not_pagination() {
	let (engine, store) = setup(widget_descriptor()).await;
	store.seed(
		"widgets",
		vec![
			widget_row(1, "Match One", 5, "2024-01-10 08:00:00"),
			widget_row(2, "Other", 6, "2024-01-11 08:00:00"),
			widget_row(3, "Match Two", 7, "2024-01-12 08:00:00"),
		],
	);

	let params = ListParams {
		search: "match".to_string(),
		page: 1,
		page_size: Some(1),
		..ListParams::default()
	};
	let bytes = engine.export_csv("widget", &params).await.unwrap();
	let text = String::from_utf8(bytes).unwrap();

	// One header plus both matches, despite the one-row page size
	assert_eq!(text.lines().count(), 3);
	assert!(!text.contains("Other"));
}

#[tokio::test]
async fn test_export_requires_permission() {
	let descriptor = ResourceDescriptor::builder("widget", "widgets")
		.list_display(["name"])
		.build();
	let (engine, _) = setup(descriptor).await;

	let result = engine.export_csv("widget", &ListParams::default()).await;

	assert!(matches!(result, Err(AdminError::PermissionDenied(_))));
}

#[tokio::test]
async fn test_sample_has_editable_headers_and_one_blank_row() {
	let (engine, _) = setup(widget_descriptor()).await;

	let bytes = engine.sample_csv("widget").await.unwrap();
	let text = String::from_utf8(bytes).unwrap();

	assert_eq!(text, "name,qty,active,api_key\n,,,\n");
}

#[tokio::test]
async fn test_import_creates_rows_and_skips_malformed_ones() {
	let (engine, store) = setup(widget_descriptor()).await;

	let csv = "name,qty\nAlpha,1\nBeta,lots\nGamma,3\n";
	let outcome = engine
		.import_csv("widget", csv.as_bytes(), "widgets.csv", None)
		.await
		.unwrap();

	assert_eq!(outcome.created, 2);
	assert_eq!(outcome.skipped, 1);
	assert_eq!(outcome.errors.len(), 1);
	assert_eq!(outcome.errors[0].row, 2);

	let rows = store.rows("widgets");
	assert_eq!(rows.len(), 2);
	assert_eq!(rows[0]["name"], json!("Alpha"));
	assert_eq!(rows[1]["qty"], json!(3));
}

#[tokio::test]
async fn test_import_restricts_to_editable_columns() {
	let (engine, store) = setup(widget_descriptor()).await;

	// id and internal_code are not editable; bogus is not a column at all
	let csv = "id,name,internal_code,bogus\n999,Alpha,SNEAKY,x\n";
	let outcome = engine
		.import_csv("widget", csv.as_bytes(), "widgets.csv", None)
		.await
		.unwrap();

	assert_eq!(outcome.created, 1);
	let rows = store.rows("widgets");
	assert_ne!(rows[0]["id"], json!(999));
	assert!(!rows[0].contains_key("internal_code"));
	assert!(!rows[0].contains_key("bogus"));
	// Editable columns missing from the file land as NULL
	assert_eq!(rows[0]["qty"], Value::Null);
}

#[tokio::test]
async fn test_import_hashes_secret_column() {
	let (engine, store) = setup(widget_descriptor()).await;

	let csv = "name,api_key\nAlpha,raw-secret\n";
	engine
		.import_csv("widget", csv.as_bytes(), "widgets.csv", None)
		.await
		.unwrap();

	let stored = store.rows("widgets")[0]["api_key"]
		.as_str()
		.unwrap()
		.to_string();
	assert!(stored.starts_with("$argon2"));
}

#[tokio::test]
async fn test_export_then_import_reproduces_editable_values() {
	let (engine, store) = setup(widget_descriptor()).await;
	let mut with_secret = widget_row(1, "Alpha", 5, "2024-01-10 08:00:00");
	with_secret.insert("api_key".to_string(), json!("$argon2id$stored-digest"));
	store.seed(
		"widgets",
		vec![with_secret, widget_row(2, "Beta", 42, "2024-02-20 08:00:00")],
	);

	let bytes = engine
		.export_csv("widget", &ListParams::default())
		.await
		.unwrap();

	let (fresh_engine, fresh_store) = setup(widget_descriptor()).await;
	let outcome = fresh_engine
		.import_csv("widget", &bytes, "widgets.csv", None)
		.await
		.unwrap();

	assert_eq!(outcome.created, 2);
	assert!(outcome.errors.is_empty());

	let rows = fresh_store.rows("widgets");
	assert_eq!(rows[0]["name"], json!("Alpha"));
	assert_eq!(rows[0]["qty"], json!(5));
	assert_eq!(rows[0]["active"], json!(true));
	assert_eq!(rows[1]["name"], json!("Beta"));
	assert_eq!(rows[1]["qty"], json!(42));
	// The exported digest is treated as raw input and re-hashed, never
	// copied back verbatim
	let reimported = rows[0]["api_key"].as_str().unwrap();
	assert_ne!(reimported, "$argon2id$stored-digest");
	assert!(reimported.starts_with("$argon2"));
}

#[tokio::test]
async fn test_import_archives_the_upload() {
	let (engine, _) = setup(widget_descriptor()).await;
	let storage = RecordingStorage::default();

	let csv = "name\nAlpha\n";
	engine
		.import_csv("widget", csv.as_bytes(), "widgets.csv", Some(&storage))
		.await
		.unwrap();

	let puts = storage.puts.lock().unwrap().clone();
	assert_eq!(puts, vec![("widgets.csv".to_string(), csv.len())]);
}

#[tokio::test]
async fn test_archive_failure_does_not_fail_the_import() {
	let (engine, store) = setup(widget_descriptor()).await;

	let csv = "name\nAlpha\n";
	let outcome = engine
		.import_csv("widget", csv.as_bytes(), "widgets.csv", Some(&FailingStorage))
		.await
		.unwrap();

	assert_eq!(outcome.created, 1);
	assert_eq!(store.rows("widgets").len(), 1);
}

#[tokio::test]
async fn test_import_requires_permission() {
	let descriptor = ResourceDescriptor::builder("widget", "widgets")
		.list_display(["name"])
		.build();
	let (engine, _) = setup(descriptor).await;

	let result = engine
		.import_csv("widget", b"name\nAlpha\n", "widgets.csv", None)
		.await;

	assert!(matches!(result, Err(AdminError::PermissionDenied(_))));
}
