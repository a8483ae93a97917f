//! CSV exchange
//!
//! Three flows, all driven by the same schema snapshots the rest of the
//! engine uses:
//!
//! - **export**: the *filtered* result set (same search/date-range
//!   semantics as the list view, but unpaginated) with every schema column
//! - **sample**: an import template whose header row is exactly the
//!   editable fields, plus one blank row
//! - **import**: bulk create from an uploaded file, restricted to editable
//!   columns, skipping rows that fail coercion instead of aborting the
//!   whole upload
//!
//! Imports can be archived to object storage for audit; archiving is
//! best-effort and never fails the import itself.

use crate::descriptor::Action;
use crate::engine::CrudEngine;
use crate::error::{AdminError, AdminResult};
use crate::introspect::editable_fields;
use crate::query::ListParams;
use crate::store::{Record, ResourceStore};
use async_trait::async_trait;

/// Object-storage port for archiving uploaded import files
#[async_trait]
pub trait ObjectStorage: Send + Sync {
	/// Store a blob; returns the storage key it landed under
	async fn put(&self, data: &[u8], filename: &str, content_type: &str) -> AdminResult<String>;
}

/// One rejected import row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRowError {
	/// 1-based data-row number (excluding the header)
	pub row: u64,
	/// What made the row unusable
	pub message: String,
}

/// Outcome report of a bulk import
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOutcome {
	/// Rows inserted
	pub created: u64,
	/// Rows rejected and skipped
	pub skipped: u64,
	/// Per-row rejection details, in file order
	pub errors: Vec<ImportRowError>,
}

impl<S: ResourceStore> CrudEngine<S> {
	/// Export the filtered result set as CSV.
	///
	/// The header row carries every schema column in declaration order;
	/// pagination in `params` is ignored so the file covers all matches.
	pub async fn export_csv(
		&self,
		resource_type: &str,
		params: &ListParams,
	) -> AdminResult<Vec<u8>> {
		let entry = self.registry.resolve(resource_type)?;
		self.authorize(entry, Action::Export)?;

		let mut unpaginated = params.clone();
		unpaginated.page = 1;
		unpaginated.page_size = None;
		let page = self.store.list(entry, &unpaginated).await?;

		let columns = entry.schema.field_names();
		let mut writer = csv::Writer::from_writer(Vec::new());
		writer
			.write_record(&columns)
			.map_err(|e| AdminError::Exchange(e.to_string()))?;
		for record in &page.items {
			let row: Vec<String> = columns
				.iter()
				.map(|name| cell_text(record.get(*name)))
				.collect();
			writer
				.write_record(&row)
				.map_err(|e| AdminError::Exchange(e.to_string()))?;
		}

		tracing::info!(resource = resource_type, rows = page.items.len(), "csv exported");

		writer
			.into_inner()
			.map_err(|e| AdminError::Exchange(e.to_string()))
	}

	/// Produce an import template: editable headers plus one blank row
	pub async fn sample_csv(&self, resource_type: &str) -> AdminResult<Vec<u8>> {
		let entry = self.registry.resolve(resource_type)?;
		self.authorize(entry, Action::Import)?;

		let headers: Vec<&str> = editable_fields(&entry.descriptor, &entry.schema)
			.iter()
			.map(|f| f.name.as_str())
			.collect();

		let mut writer = csv::Writer::from_writer(Vec::new());
		writer
			.write_record(&headers)
			.map_err(|e| AdminError::Exchange(e.to_string()))?;
		writer
			.write_record(headers.iter().map(|_| ""))
			.map_err(|e| AdminError::Exchange(e.to_string()))?;

		writer
			.into_inner()
			.map_err(|e| AdminError::Exchange(e.to_string()))
	}

	/// Bulk-create records from an uploaded CSV.
	///
	/// Columns outside the editable set are ignored; editable columns
	/// missing from the file are treated as blank. Rows whose values fail
	/// coercion are skipped and reported in the outcome; storage failures
	/// abort the import. When `archive` is given, the raw upload is stored
	/// for audit after processing.
	pub async fn import_csv(
		&self,
		resource_type: &str,
		data: &[u8],
		filename: &str,
		archive: Option<&dyn ObjectStorage>,
	) -> AdminResult<ImportOutcome> {
		let entry = self.registry.resolve(resource_type)?;
		self.authorize(entry, Action::Import)?;

		let editable = editable_fields(&entry.descriptor, &entry.schema);
		let mut reader = csv::ReaderBuilder::new()
			.trim(csv::Trim::All)
			.from_reader(data);
		let headers = reader
			.headers()
			.map_err(|e| AdminError::Exchange(e.to_string()))?
			.clone();

		let mut outcome = ImportOutcome::default();
		for (index, result) in reader.records().enumerate() {
			let row_number = index as u64 + 1;
			let row = match result {
				Ok(row) => row,
				Err(e) => {
					outcome.skipped += 1;
					outcome.errors.push(ImportRowError {
						row: row_number,
						message: e.to_string(),
					});
					tracing::warn!(resource = resource_type, row = row_number, "unreadable csv row");
					continue;
				}
			};

			let mut record = Record::new();
			let mut rejection = None;
			for field in &editable {
				let raw = headers
					.iter()
					.position(|h| h == field.name)
					.and_then(|i| row.get(i))
					.unwrap_or("");
				let value = if entry.descriptor.secret_field() == Some(field.name.as_str()) {
					if raw.trim().is_empty() {
						Ok(serde_json::Value::Null)
					} else {
						self.hasher.hash(raw).map(serde_json::Value::String)
					}
				} else {
					crate::coerce::coerce(field, raw, &self.config)
				};
				match value {
					Ok(value) => {
						record.insert(field.name.clone(), value);
					}
					Err(e) => {
						rejection = Some(e.to_string());
						break;
					}
				}
			}

			if let Some(message) = rejection {
				outcome.skipped += 1;
				outcome.errors.push(ImportRowError {
					row: row_number,
					message: message.clone(),
				});
				tracing::warn!(
					resource = resource_type,
					row = row_number,
					message,
					"import row skipped"
				);
				continue;
			}

			self.store.insert(entry.descriptor.table(), &record).await?;
			outcome.created += 1;
		}

		tracing::info!(
			resource = resource_type,
			created = outcome.created,
			skipped = outcome.skipped,
			"csv imported"
		);

		if let Some(storage) = archive {
			if let Err(e) = storage.put(data, filename, "text/csv").await {
				tracing::warn!(resource = resource_type, error = %e, "import archive failed");
			}
		}

		Ok(outcome)
	}
}

/// Natural textual form of a cell value; `NULL` becomes the empty string
fn cell_text(value: Option<&serde_json::Value>) -> String {
	match value {
		None | Some(serde_json::Value::Null) => String::new(),
		Some(serde_json::Value::String(s)) => s.clone(),
		Some(serde_json::Value::Bool(b)) => b.to_string(),
		Some(serde_json::Value::Number(n)) => n.to_string(),
		Some(other) => other.to_string(),
	}
}
