//! Schema snapshots reflected from storage
//!
//! Field descriptors are derived from the storage layer's reflection
//! contract at registry-build time, never hand-maintained, so they stay in
//! sync with the actual schema. Declaration order is preserved: the
//! introspector and the CSV exchange rely on it for stable column ordering.

use serde::{Deserialize, Serialize};

/// Primitive type tag of a persisted field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
	/// Character data (VARCHAR, CHAR, TEXT)
	Text,
	/// Whole numbers of any width
	Integer,
	/// Floating point / fixed decimal numbers
	Float,
	/// Booleans
	Boolean,
	/// Calendar dates
	Date,
	/// Timestamps
	DateTime,
	/// JSON documents, stored and edited as text
	Json,
}

impl FieldType {
	/// Infer the primitive type tag from a storage-level type name.
	///
	/// Matching is substring-based over the uppercased name, so dialect
	/// variants (`VARCHAR(255)`, `timestamp with time zone`, `int8`) all
	/// resolve without an exhaustive dialect table. Unrecognised types fall
	/// back to [`FieldType::Text`].
	///
	/// # Examples
	///
	/// ```
	/// use backoffice::FieldType;
	///
	/// assert_eq!(FieldType::from_sql_type("character varying"), FieldType::Text);
	/// assert_eq!(FieldType::from_sql_type("BIGINT"), FieldType::Integer);
	/// assert_eq!(FieldType::from_sql_type("timestamp without time zone"), FieldType::DateTime);
	/// ```
	pub fn from_sql_type(sql_type: &str) -> Self {
		let name = sql_type.to_uppercase();
		if name.contains("JSON") {
			Self::Json
		} else if name.contains("BOOL") {
			Self::Boolean
		} else if name.contains("TIMESTAMP") || name.contains("DATETIME") {
			Self::DateTime
		} else if name.contains("DATE") {
			Self::Date
		} else if name.contains("FLOAT")
			|| name.contains("DOUBLE")
			|| name.contains("REAL")
			|| name.contains("NUMERIC")
			|| name.contains("DECIMAL")
		{
			Self::Float
		} else if name.contains("INT") || name.contains("SERIAL") {
			Self::Integer
		} else {
			Self::Text
		}
	}
}

/// One persisted field of a resource's backing table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
	/// Column name
	pub name: String,
	/// Primitive type tag
	pub field_type: FieldType,
	/// Whether the column is part of the primary key
	pub primary_key: bool,
}

impl FieldDescriptor {
	/// Create a non-key field descriptor
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			primary_key: false,
		}
	}

	/// Create a primary-key field descriptor
	pub fn primary_key(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			primary_key: true,
		}
	}
}

/// Ordered schema snapshot of one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
	/// Table name
	pub table: String,
	/// Fields in declaration order
	pub fields: Vec<FieldDescriptor>,
}

impl TableSchema {
	/// Create a schema snapshot from an ordered field list
	pub fn new(table: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
		Self {
			table: table.into(),
			fields,
		}
	}

	/// Look up a field by name
	pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
		self.fields.iter().find(|f| f.name == name)
	}

	/// Whether the table declares a field with this name
	pub fn has_field(&self, name: &str) -> bool {
		self.field(name).is_some()
	}

	/// The first primary-key field.
	///
	/// Composite keys are not supported by the engine; like the admin
	/// consoles it generalises, it addresses rows by a single key column.
	pub fn primary_key(&self) -> Option<&FieldDescriptor> {
		self.fields.iter().find(|f| f.primary_key)
	}

	/// All field names in declaration order
	pub fn field_names(&self) -> Vec<&str> {
		self.fields.iter().map(|f| f.name.as_str()).collect()
	}
}
