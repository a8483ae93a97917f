//! Readable / editable field derivation
//!
//! Which fields an admin screen shows and which it accepts for editing is
//! derived from the schema snapshot, not listed by hand. Keys are never
//! readable in detail views; keys, timestamp bookkeeping columns, and the
//! descriptor's protected fields are never editable. Field order follows
//! schema declaration order.

use crate::descriptor::ResourceDescriptor;
use crate::schema::{FieldDescriptor, TableSchema};

/// Bookkeeping columns maintained by storage, excluded from editing
pub const SYSTEM_FIELDS: [&str; 2] = ["created_at", "updated_at"];

/// Fields shown on detail views: every schema field except primary keys
pub fn readable_fields(schema: &TableSchema) -> Vec<&FieldDescriptor> {
	schema.fields.iter().filter(|f| !f.primary_key).collect()
}

/// Fields accepted on create/edit forms and CSV import.
///
/// Excludes primary keys, [`SYSTEM_FIELDS`], and the descriptor's
/// protected fields.
pub fn editable_fields<'a>(
	descriptor: &ResourceDescriptor,
	schema: &'a TableSchema,
) -> Vec<&'a FieldDescriptor> {
	schema
		.fields
		.iter()
		.filter(|f| {
			!f.primary_key
				&& !SYSTEM_FIELDS.contains(&f.name.as_str())
				&& !descriptor
					.protected_fields()
					.iter()
					.any(|p| p == &f.name)
		})
		.collect()
}
