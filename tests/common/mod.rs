//! Shared test fixtures: an in-memory [`ResourceStore`] faithful to the
//! engine's list semantics, plus schema and descriptor builders.

use async_trait::async_trait;
use backoffice::{
	AdminResult, FieldDescriptor, FieldType, ListParams, Page, Record, RegisteredResource,
	ResourceHooks, ResourceStore, SchemaSource, SortDirection, TableSchema,
};
use serde_json::{Value, json};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};

/// In-memory store with search/sort/pagination semantics matching the SQL
/// adapter closely enough for engine-level tests
pub struct MemoryStore {
	schemas: HashMap<String, TableSchema>,
	tables: Mutex<HashMap<String, Vec<Record>>>,
	next_id: AtomicI64,
}

impl MemoryStore {
	pub fn new(schemas: Vec<TableSchema>) -> Self {
		Self {
			schemas: schemas.into_iter().map(|s| (s.table.clone(), s)).collect(),
			tables: Mutex::new(HashMap::new()),
			next_id: AtomicI64::new(1),
		}
	}

	pub fn seed(&self, table: &str, rows: Vec<Record>) {
		let mut tables = self.tables.lock().unwrap();
		let max_id = rows
			.iter()
			.filter_map(|r| r.get("id").and_then(Value::as_i64))
			.max()
			.unwrap_or(0);
		self.next_id.fetch_max(max_id + 1, AtomicOrdering::SeqCst);
		tables.entry(table.to_string()).or_default().extend(rows);
	}

	pub fn rows(&self, table: &str) -> Vec<Record> {
		self.tables
			.lock()
			.unwrap()
			.get(table)
			.cloned()
			.unwrap_or_default()
	}
}

fn value_text(value: Option<&Value>) -> String {
	match value {
		None | Some(Value::Null) => String::new(),
		Some(Value::String(s)) => s.clone(),
		Some(Value::Bool(b)) => b.to_string(),
		Some(Value::Number(n)) => n.to_string(),
		Some(other) => other.to_string(),
	}
}

fn display_value(
	entry: &RegisteredResource,
	tables: &HashMap<String, Vec<Record>>,
	record: &Record,
	display: &str,
) -> String {
	match display.split_once('.') {
		Some((relation, field)) => {
			let Some(spec) = entry.descriptor.relation(relation) else {
				return String::new();
			};
			let local = record.get(&spec.local_key);
			match tables
				.get(&spec.table)
				.and_then(|rows| rows.iter().find(|r| r.get(&spec.foreign_key) == local))
			{
				Some(row) => value_text(row.get(field)),
				None => String::new(),
			}
		}
		None => value_text(record.get(display)),
	}
}

fn matches(
	entry: &RegisteredResource,
	tables: &HashMap<String, Vec<Record>>,
	record: &Record,
	params: &ListParams,
) -> bool {
	let term = params.search.trim().to_lowercase();
	if !term.is_empty() {
		let hit = entry.descriptor.list_display().iter().any(|display| {
			display_value(entry, tables, record, display)
				.to_lowercase()
				.contains(&term)
		});
		if !hit {
			return false;
		}
	}

	if params.from_date.is_some() || params.to_date.is_some() {
		let raw = value_text(record.get(entry.descriptor.date_field()));
		let date: String = raw.chars().take(10).collect();
		if let Some(from) = &params.from_date {
			if date.as_str() < from.as_str() {
				return false;
			}
		}
		if let Some(to) = &params.to_date {
			if date.as_str() > to.as_str() {
				return false;
			}
		}
	}

	true
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
	match (a, b) {
		(Some(Value::Number(x)), Some(Value::Number(y))) => x
			.as_f64()
			.partial_cmp(&y.as_f64())
			.unwrap_or(Ordering::Equal),
		(Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
		(x, y) => value_text(x).cmp(&value_text(y)),
	}
}

#[async_trait]
impl ResourceStore for MemoryStore {
	async fn list(&self, entry: &RegisteredResource, params: &ListParams) -> AdminResult<Page> {
		let tables = self.tables.lock().unwrap();
		let mut items: Vec<Record> = tables
			.get(entry.descriptor.table())
			.cloned()
			.unwrap_or_default()
			.into_iter()
			.filter(|r| matches(entry, &tables, r, params))
			.collect();
		drop(tables);

		let criteria = if params.sort.is_empty() {
			entry.descriptor.sort().to_vec()
		} else {
			params.sort.clone()
		};
		let valid: Vec<_> = criteria
			.into_iter()
			.filter(|c| entry.schema.has_field(&c.field))
			.collect();
		if valid.is_empty() {
			if let Some(pk) = entry.schema.primary_key() {
				items.sort_by(|a, b| compare(a.get(&pk.name), b.get(&pk.name)));
			}
		} else {
			items.sort_by(|a, b| {
				for criterion in &valid {
					let ord = compare(a.get(&criterion.field), b.get(&criterion.field));
					let ord = match criterion.direction {
						SortDirection::Asc => ord,
						SortDirection::Desc => ord.reverse(),
					};
					if ord != Ordering::Equal {
						return ord;
					}
				}
				Ordering::Equal
			});
		}

		let total = items.len() as u64;
		if let Some(size) = params.page_size {
			let start = ((params.page.max(1) - 1) * size) as usize;
			items = items.into_iter().skip(start).take(size as usize).collect();
		}

		Ok(Page::new(items, total, params.page.max(1), params.page_size))
	}

	async fn get(&self, entry: &RegisteredResource, id: &str) -> AdminResult<Option<Record>> {
		let pk = entry.schema.primary_key().map(|f| f.name.clone());
		let Some(pk) = pk else { return Ok(None) };
		let tables = self.tables.lock().unwrap();
		Ok(tables
			.get(entry.descriptor.table())
			.and_then(|rows| {
				rows.iter()
					.find(|r| value_text(r.get(&pk)) == id)
					.cloned()
			}))
	}

	async fn insert(&self, table: &str, record: &Record) -> AdminResult<Record> {
		let mut stored = record.clone();
		if let Some(schema) = self.schemas.get(table) {
			if let Some(pk) = schema.primary_key() {
				let missing = stored
					.get(&pk.name)
					.map(Value::is_null)
					.unwrap_or(true);
				if missing {
					let id = self.next_id.fetch_add(1, AtomicOrdering::SeqCst);
					stored.insert(pk.name.clone(), json!(id));
				}
			}
			for bookkeeping in ["created_at", "updated_at"] {
				if schema.has_field(bookkeeping) && !stored.contains_key(bookkeeping) {
					stored.insert(bookkeeping.to_string(), json!("2024-06-01 12:00:00"));
				}
			}
		}
		let mut tables = self.tables.lock().unwrap();
		tables
			.entry(table.to_string())
			.or_default()
			.push(stored.clone());
		Ok(stored)
	}

	async fn update(
		&self,
		entry: &RegisteredResource,
		id: &str,
		changes: &Record,
	) -> AdminResult<u64> {
		if changes.is_empty() {
			return Ok(0);
		}
		let Some(pk) = entry.schema.primary_key().map(|f| f.name.clone()) else {
			return Ok(0);
		};
		let mut tables = self.tables.lock().unwrap();
		let Some(rows) = tables.get_mut(entry.descriptor.table()) else {
			return Ok(0);
		};
		match rows.iter_mut().find(|r| value_text(r.get(&pk)) == id) {
			Some(row) => {
				for (key, value) in changes {
					row.insert(key.clone(), value.clone());
				}
				Ok(1)
			}
			None => Ok(0),
		}
	}

	async fn delete(&self, entry: &RegisteredResource, id: &str) -> AdminResult<u64> {
		let Some(pk) = entry.schema.primary_key().map(|f| f.name.clone()) else {
			return Ok(0);
		};
		let mut tables = self.tables.lock().unwrap();
		let Some(rows) = tables.get_mut(entry.descriptor.table()) else {
			return Ok(0);
		};
		let before = rows.len();
		rows.retain(|r| value_text(r.get(&pk)) != id);
		Ok((before - rows.len()) as u64)
	}
}

#[async_trait]
impl SchemaSource for MemoryStore {
	async fn table_schema(&self, table: &str) -> AdminResult<TableSchema> {
		self.schemas.get(table).cloned().ok_or_else(|| {
			backoffice::AdminError::Config(format!("table '{table}' does not exist"))
		})
	}
}

/// Lifecycle-hook recorder
#[derive(Default)]
pub struct RecordingHooks {
	pub events: Mutex<Vec<String>>,
}

#[async_trait]
impl ResourceHooks for RecordingHooks {
	async fn after_create(&self, created: &Record) {
		self.events
			.lock()
			.unwrap()
			.push(format!("create:{}", value_text(created.get("name"))));
	}

	async fn after_update(&self, updated: &Record, prior: &Record) {
		self.events.lock().unwrap().push(format!(
			"update:{}->{}",
			value_text(prior.get("name")),
			value_text(updated.get("name"))
		));
	}

	async fn after_delete(&self, deleted: &Record) {
		self.events
			.lock()
			.unwrap()
			.push(format!("delete:{}", value_text(deleted.get("name"))));
	}
}

pub fn widget_schema() -> TableSchema {
	TableSchema::new(
		"widgets",
		vec![
			FieldDescriptor::primary_key("id", FieldType::Integer),
			FieldDescriptor::new("name", FieldType::Text),
			FieldDescriptor::new("qty", FieldType::Integer),
			FieldDescriptor::new("active", FieldType::Boolean),
			FieldDescriptor::new("api_key", FieldType::Text),
			FieldDescriptor::new("internal_code", FieldType::Text),
			FieldDescriptor::new("created_at", FieldType::DateTime),
			FieldDescriptor::new("updated_at", FieldType::DateTime),
		],
	)
}

pub fn widget_revision_schema() -> TableSchema {
	TableSchema::new(
		"widget_revisions",
		vec![
			FieldDescriptor::primary_key("id", FieldType::Integer),
			FieldDescriptor::new("widget_id", FieldType::Integer),
			FieldDescriptor::new("name", FieldType::Text),
			FieldDescriptor::new("qty", FieldType::Integer),
			FieldDescriptor::new("edited_by", FieldType::Integer),
			FieldDescriptor::new("created_at", FieldType::DateTime),
		],
	)
}

pub fn widget_row(id: i64, name: &str, qty: i64, created_at: &str) -> Record {
	Record::from([
		("id".to_string(), json!(id)),
		("name".to_string(), json!(name)),
		("qty".to_string(), json!(qty)),
		("active".to_string(), json!(true)),
		("api_key".to_string(), Value::Null),
		("internal_code".to_string(), json!("W")),
		("created_at".to_string(), json!(created_at)),
		("updated_at".to_string(), json!(created_at)),
	])
}
