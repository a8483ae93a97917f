//! Storage ports and the SQL adapter
//!
//! Two seams keep the engine testable and driver-agnostic:
//!
//! - [`DatabaseConnection`] is the thin wire port a host application
//!   implements over its actual driver (one call = one statement, rows come
//!   back as JSON maps).
//! - [`ResourceStore`] is the semantic port the CRUD engine consumes
//!   (list/get/insert/update/delete over dynamic records).
//!
//! [`SqlStore`] bridges the two with `sea-query` statement generation in
//! the PostgreSQL dialect. Tests substitute an in-memory [`ResourceStore`]
//! and never touch SQL.

use crate::error::{AdminError, AdminResult};
use crate::query::{self, COUNT_COLUMN, ListParams, Page};
use crate::registry::RegisteredResource;
use crate::schema::{FieldDescriptor, FieldType, TableSchema};
use async_trait::async_trait;
use sea_query::{
	Alias, Expr, JoinType, Order, PostgresQueryBuilder, Query, Values,
};
use std::collections::HashMap;
use std::sync::Arc;

/// A dynamic record: column name to JSON value
pub type Record = HashMap<String, serde_json::Value>;

/// Wire port over the host's database driver
#[async_trait]
pub trait DatabaseConnection: Send + Sync {
	/// Run a statement and return all rows
	async fn query(&self, sql: String, values: Values) -> AdminResult<Vec<Record>>;

	/// Run a statement expected to return exactly one row
	async fn query_one(&self, sql: String, values: Values) -> AdminResult<Record>;

	/// Run a statement returning at most one row
	async fn query_optional(&self, sql: String, values: Values) -> AdminResult<Option<Record>>;

	/// Run a statement and return the affected row count
	async fn execute(&self, sql: String, values: Values) -> AdminResult<u64>;
}

/// Schema reflection port, consumed at registry build time
#[async_trait]
pub trait SchemaSource {
	/// Snapshot the named table's schema
	async fn table_schema(&self, table: &str) -> AdminResult<TableSchema>;
}

/// Semantic storage port the CRUD engine runs against
#[async_trait]
pub trait ResourceStore: Send + Sync {
	/// Run the filtered, sorted, paginated list query
	async fn list(&self, entry: &RegisteredResource, params: &ListParams) -> AdminResult<Page>;

	/// Fetch one record by primary key
	async fn get(&self, entry: &RegisteredResource, id: &str) -> AdminResult<Option<Record>>;

	/// Insert a record and return it as stored
	async fn insert(&self, table: &str, record: &Record) -> AdminResult<Record>;

	/// Apply changes to one record; returns affected row count
	async fn update(&self, entry: &RegisteredResource, id: &str, changes: &Record)
	-> AdminResult<u64>;

	/// Delete one record; returns affected row count
	async fn delete(&self, entry: &RegisteredResource, id: &str) -> AdminResult<u64>;
}

#[async_trait]
impl<T: ResourceStore + ?Sized> ResourceStore for Arc<T> {
	async fn list(&self, entry: &RegisteredResource, params: &ListParams) -> AdminResult<Page> {
		(**self).list(entry, params).await
	}

	async fn get(&self, entry: &RegisteredResource, id: &str) -> AdminResult<Option<Record>> {
		(**self).get(entry, id).await
	}

	async fn insert(&self, table: &str, record: &Record) -> AdminResult<Record> {
		(**self).insert(table, record).await
	}

	async fn update(
		&self,
		entry: &RegisteredResource,
		id: &str,
		changes: &Record,
	) -> AdminResult<u64> {
		(**self).update(entry, id, changes).await
	}

	async fn delete(&self, entry: &RegisteredResource, id: &str) -> AdminResult<u64> {
		(**self).delete(entry, id).await
	}
}

/// `sea-query`-backed [`ResourceStore`] and [`SchemaSource`] over any
/// [`DatabaseConnection`]
pub struct SqlStore<C> {
	conn: C,
}

impl<C: DatabaseConnection> SqlStore<C> {
	/// Wrap a connection
	pub fn new(conn: C) -> Self {
		Self { conn }
	}

	fn primary_key(entry: &RegisteredResource) -> AdminResult<&FieldDescriptor> {
		entry.schema.primary_key().ok_or_else(|| {
			AdminError::Config(format!(
				"table '{}' declares no primary key",
				entry.descriptor.table()
			))
		})
	}
}

/// Convert a JSON value to the `sea-query` value bound into statements
pub fn json_to_sea_value(value: &serde_json::Value) -> sea_query::Value {
	match value {
		serde_json::Value::Null => sea_query::Value::String(None),
		serde_json::Value::Bool(b) => (*b).into(),
		serde_json::Value::Number(n) => {
			if let Some(i) = n.as_i64() {
				i.into()
			} else {
				n.as_f64().unwrap_or(0.0).into()
			}
		}
		serde_json::Value::String(s) => s.as_str().into(),
		other => sea_query::Value::Json(Some(Box::new(other.clone()))),
	}
}

/// Primary-key values arrive as path strings; bind integers as integers so
/// the comparison matches integer key columns.
fn key_value(raw: &str) -> sea_query::Value {
	match raw.parse::<i64>() {
		Ok(i) => i.into(),
		Err(_) => raw.into(),
	}
}

fn extract_count(row: &Record) -> AdminResult<u64> {
	let value = row
		.get(COUNT_COLUMN)
		.ok_or_else(|| AdminError::Database("count query returned no count column".to_string()))?;
	match value {
		serde_json::Value::Number(n) => n
			.as_u64()
			.or_else(|| n.as_i64().and_then(|i| u64::try_from(i).ok()))
			.ok_or_else(|| AdminError::Database(format!("non-integral count: {n}"))),
		serde_json::Value::String(s) => s
			.parse::<u64>()
			.map_err(|e| AdminError::Database(format!("unparseable count '{s}': {e}"))),
		other => Err(AdminError::Database(format!("unexpected count value: {other}"))),
	}
}

#[async_trait]
impl<C: DatabaseConnection> ResourceStore for SqlStore<C> {
	async fn list(&self, entry: &RegisteredResource, params: &ListParams) -> AdminResult<Page> {
		let (sql, values) = query::build_select(entry, params)?.build(PostgresQueryBuilder);
		let items = self.conn.query(sql, values).await?;

		let (sql, values) = query::build_count(entry, params)?.build(PostgresQueryBuilder);
		let total = extract_count(&self.conn.query_one(sql, values).await?)?;

		Ok(Page::new(items, total, params.page.max(1), params.page_size))
	}

	async fn get(&self, entry: &RegisteredResource, id: &str) -> AdminResult<Option<Record>> {
		let table = Alias::new(entry.descriptor.table());
		let pk = Self::primary_key(entry)?;

		let (sql, values) = {
			let mut stmt = Query::select();
			stmt.from(table.clone());
			for field in &entry.schema.fields {
				stmt.column((table.clone(), Alias::new(&field.name)));
			}
			stmt.and_where(Expr::col((table, Alias::new(&pk.name))).eq(key_value(id)));
			stmt.limit(1);
			stmt.build(PostgresQueryBuilder)
		};
		self.conn.query_optional(sql, values).await
	}

	async fn insert(&self, table: &str, record: &Record) -> AdminResult<Record> {
		// Sorted keys keep the generated SQL deterministic
		let mut keys: Vec<&String> = record.keys().collect();
		keys.sort();

		let (sql, values) = {
			let mut stmt = Query::insert();
			stmt.into_table(Alias::new(table));
			stmt.columns(keys.iter().map(|k| Alias::new(k.as_str())));
			stmt.values(
				keys.iter()
					.map(|k| json_to_sea_value(&record[k.as_str()]).into()),
			)
			.map_err(|e| AdminError::Database(e.to_string()))?;
			stmt.returning_all();
			stmt.build(PostgresQueryBuilder)
		};
		self.conn.query_one(sql, values).await
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
		let pk = Self::primary_key(entry)?;

		let mut keys: Vec<&String> = changes.keys().collect();
		keys.sort();

		let (sql, values) = {
			let mut stmt = Query::update();
			stmt.table(Alias::new(entry.descriptor.table()));
			stmt.values(
				keys.iter().map(|k| {
					(Alias::new(k.as_str()), json_to_sea_value(&changes[k.as_str()]).into())
				}),
			);
			stmt.and_where(Expr::col(Alias::new(&pk.name)).eq(key_value(id)));
			stmt.build(PostgresQueryBuilder)
		};
		self.conn.execute(sql, values).await
	}

	async fn delete(&self, entry: &RegisteredResource, id: &str) -> AdminResult<u64> {
		let pk = Self::primary_key(entry)?;

		let (sql, values) = {
			let mut stmt = Query::delete();
			stmt.from_table(Alias::new(entry.descriptor.table()));
			stmt.and_where(Expr::col(Alias::new(&pk.name)).eq(key_value(id)));
			stmt.build(PostgresQueryBuilder)
		};
		self.conn.execute(sql, values).await
	}
}

#[async_trait]
impl<C: DatabaseConnection> SchemaSource for SqlStore<C> {
	async fn table_schema(&self, table: &str) -> AdminResult<TableSchema> {
		let (sql, values) = {
			let columns = Alias::new("columns");
			let mut stmt = Query::select();
			stmt.columns([Alias::new("column_name"), Alias::new("data_type")]);
			stmt.from((Alias::new("information_schema"), columns));
			stmt.and_where(Expr::col(Alias::new("table_name")).eq(table));
			stmt.order_by(Alias::new("ordinal_position"), Order::Asc);
			stmt.build(PostgresQueryBuilder)
		};
		let rows = self.conn.query(sql, values).await?;
		if rows.is_empty() {
			return Err(AdminError::Config(format!("table '{table}' does not exist")));
		}

		let (sql, values) = {
			let mut stmt = Query::select();
			stmt.column((Alias::new("kcu"), Alias::new("column_name")));
			stmt.from_as(
				(Alias::new("information_schema"), Alias::new("table_constraints")),
				Alias::new("tc"),
			);
			stmt.join_as(
				JoinType::InnerJoin,
				(Alias::new("information_schema"), Alias::new("key_column_usage")),
				Alias::new("kcu"),
				Expr::col((Alias::new("tc"), Alias::new("constraint_name")))
					.equals((Alias::new("kcu"), Alias::new("constraint_name"))),
			);
			stmt.and_where(Expr::col((Alias::new("tc"), Alias::new("table_name"))).eq(table));
			stmt.and_where(
				Expr::col((Alias::new("tc"), Alias::new("constraint_type"))).eq("PRIMARY KEY"),
			);
			stmt.build(PostgresQueryBuilder)
		};
		let key_rows = self.conn.query(sql, values).await?;
		let key_columns: Vec<&str> = key_rows
			.iter()
			.filter_map(|r| r.get("column_name").and_then(|v| v.as_str()))
			.collect();

		let mut fields = Vec::with_capacity(rows.len());
		for row in &rows {
			let name = row
				.get("column_name")
				.and_then(|v| v.as_str())
				.ok_or_else(|| AdminError::Database("malformed reflection row".to_string()))?;
			let data_type = row
				.get("data_type")
				.and_then(|v| v.as_str())
				.ok_or_else(|| AdminError::Database("malformed reflection row".to_string()))?;
			fields.push(FieldDescriptor {
				name: name.to_string(),
				field_type: FieldType::from_sql_type(data_type),
				primary_key: key_columns.contains(&name),
			});
		}

		Ok(TableSchema::new(table, fields))
	}
}
