//! CRUD orchestration
//!
//! [`CrudEngine`] ties the registry, the coercer, and the storage port
//! together behind uniform create/read/update/delete operations keyed by
//! resource-type identifier. Every operation resolves the resource, checks
//! the descriptor's permission set, and only then touches storage.
//!
//! Update carries the revisioning protocol: when the descriptor opts in
//! and the update actually changed something, the entity's prior state is
//! appended to the revision table before lifecycle hooks run.

use crate::coerce::{SecretHasher, coerce};
use crate::config::AdminConfig;
use crate::descriptor::Action;
use crate::error::{AdminError, AdminResult};
use crate::introspect::{SYSTEM_FIELDS, editable_fields};
use crate::query::{ListParams, Page};
use crate::registry::{RegisteredResource, ResourceRegistry};
use crate::schema::FieldType;
use crate::store::{Record, ResourceStore};
use std::collections::HashMap;
use std::sync::Arc;

/// The authenticated operator on whose behalf an operation runs.
///
/// Only recorded, never authorized against: permission sets are
/// per-resource, not per-actor.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
	/// Host-application identifier of the operator
	pub id: i64,
}

/// Resource-generic CRUD engine
pub struct CrudEngine<S> {
	pub(crate) registry: Arc<ResourceRegistry>,
	pub(crate) store: S,
	pub(crate) config: AdminConfig,
	pub(crate) hasher: SecretHasher,
}

impl<S: ResourceStore> CrudEngine<S> {
	/// Create an engine over a built registry and a storage backend
	pub fn new(registry: Arc<ResourceRegistry>, store: S, config: AdminConfig) -> Self {
		Self {
			registry,
			store,
			config,
			hasher: SecretHasher,
		}
	}

	/// The registry this engine serves
	pub fn registry(&self) -> &ResourceRegistry {
		&self.registry
	}

	pub(crate) fn authorize(
		&self,
		entry: &RegisteredResource,
		action: Action,
	) -> AdminResult<()> {
		if entry.descriptor.permissions().allows(action) {
			Ok(())
		} else {
			Err(AdminError::PermissionDenied(format!(
				"{action:?} on '{}'",
				entry.descriptor.identifier()
			)))
		}
	}

	/// List a page of records with search, date range, and sort applied.
	///
	/// A missing `page_size` falls back to the descriptor's override, then
	/// to the engine-wide default; list views are always paginated.
	pub async fn list(&self, resource_type: &str, params: &ListParams) -> AdminResult<Page> {
		let entry = self.registry.resolve(resource_type)?;
		self.authorize(entry, Action::Read)?;

		let mut effective = params.clone();
		effective.page_size = params
			.page_size
			.or(entry.descriptor.per_page())
			.or(Some(self.config.per_page));

		if let Some(controller) = entry.descriptor.list_controller() {
			return controller.list(&effective).await;
		}

		self.store.list(entry, &effective).await
	}

	/// Fetch one record by primary key
	pub async fn read(&self, resource_type: &str, id: &str) -> AdminResult<Record> {
		let entry = self.registry.resolve(resource_type)?;
		self.authorize(entry, Action::Read)?;

		self.store
			.get(entry, id)
			.await?
			.ok_or_else(|| AdminError::NotFound(format!("{resource_type} '{id}'")))
	}

	/// Create a record from raw form input.
	///
	/// Only editable fields are consulted; anything else in `input` is
	/// ignored. Missing editable fields are treated as blank and stored as
	/// `NULL`. The secret field, if any, is hashed rather than coerced.
	pub async fn create(
		&self,
		resource_type: &str,
		input: &HashMap<String, String>,
		actor: Option<&Actor>,
	) -> AdminResult<Record> {
		let entry = self.registry.resolve(resource_type)?;
		self.authorize(entry, Action::Create)?;

		let mut record = Record::new();
		for field in editable_fields(&entry.descriptor, &entry.schema) {
			let raw = input.get(&field.name).map(String::as_str).unwrap_or("");
			let value = if entry.descriptor.secret_field() == Some(field.name.as_str()) {
				self.hash_secret(raw)?
			} else {
				coerce(field, raw, &self.config)?
			};
			record.insert(field.name.clone(), value);
		}

		let stored = self.store.insert(entry.descriptor.table(), &record).await?;

		tracing::info!(
			resource = resource_type,
			actor = actor.map(|a| a.id),
			"record created"
		);

		if let Some(hooks) = entry.descriptor.hooks() {
			hooks.after_create(&stored).await;
		}

		Ok(stored)
	}

	/// Apply a partial update from raw form input.
	///
	/// Only editable fields *present in the input* are touched. A blank
	/// secret means "keep the current hash"; a blank boolean is likewise
	/// skipped, matching unchecked-checkbox form semantics. Returns the
	/// record's post-update state.
	pub async fn update(
		&self,
		resource_type: &str,
		id: &str,
		input: &HashMap<String, String>,
		actor: Option<&Actor>,
	) -> AdminResult<Record> {
		let entry = self.registry.resolve(resource_type)?;
		self.authorize(entry, Action::Update)?;

		let prior = self
			.store
			.get(entry, id)
			.await?
			.ok_or_else(|| AdminError::NotFound(format!("{resource_type} '{id}'")))?;

		let mut changes = Record::new();
		for field in editable_fields(&entry.descriptor, &entry.schema) {
			let Some(raw) = input.get(&field.name) else {
				continue;
			};
			let blank = raw.trim().is_empty();
			if entry.descriptor.secret_field() == Some(field.name.as_str()) {
				if !blank {
					changes.insert(field.name.clone(), self.hash_secret(raw)?);
				}
				continue;
			}
			if field.field_type == FieldType::Boolean && blank {
				continue;
			}
			changes.insert(field.name.clone(), coerce(field, raw, &self.config)?);
		}

		self.store.update(entry, id, &changes).await?;

		let updated = self
			.store
			.get(entry, id)
			.await?
			.ok_or_else(|| AdminError::NotFound(format!("{resource_type} '{id}'")))?;

		let changed = changed_fields(entry, &prior, &updated);
		if !changed.is_empty() {
			self.record_revision(entry, id, &prior, actor).await?;
			tracing::info!(
				resource = resource_type,
				id,
				fields = ?changed,
				actor = actor.map(|a| a.id),
				"record updated"
			);
		}

		if let Some(hooks) = entry.descriptor.hooks() {
			hooks.after_update(&updated, &prior).await;
		}

		Ok(updated)
	}

	/// Delete a record. Returns `false`, without error or hook, when the
	/// record was already gone; deletion is idempotent.
	pub async fn delete(
		&self,
		resource_type: &str,
		id: &str,
		actor: Option<&Actor>,
	) -> AdminResult<bool> {
		let entry = self.registry.resolve(resource_type)?;
		self.authorize(entry, Action::Delete)?;

		let Some(existing) = self.store.get(entry, id).await? else {
			return Ok(false);
		};

		self.store.delete(entry, id).await?;

		tracing::info!(
			resource = resource_type,
			id,
			actor = actor.map(|a| a.id),
			"record deleted"
		);

		if let Some(hooks) = entry.descriptor.hooks() {
			hooks.after_delete(&existing).await;
		}

		Ok(true)
	}

	fn hash_secret(&self, raw: &str) -> AdminResult<serde_json::Value> {
		if raw.trim().is_empty() {
			Ok(serde_json::Value::Null)
		} else {
			Ok(serde_json::Value::String(self.hasher.hash(raw)?))
		}
	}

	/// Append the prior state to the revision table. The revision row
	/// carries the source record's key under the configured column and, if
	/// the table has an `edited_by` column, the acting operator.
	async fn record_revision(
		&self,
		entry: &RegisteredResource,
		id: &str,
		prior: &Record,
		actor: Option<&Actor>,
	) -> AdminResult<()> {
		let (Some(revision), Some(revision_schema)) =
			(entry.descriptor.revision(), entry.revision_schema.as_ref())
		else {
			return Ok(());
		};

		let pk_name = entry
			.schema
			.primary_key()
			.map(|f| f.name.as_str())
			.unwrap_or("id");

		let mut row = Record::new();
		for field in &revision_schema.fields {
			if field.primary_key || SYSTEM_FIELDS.contains(&field.name.as_str()) {
				continue;
			}
			if field.name == revision.source_pk_column {
				let key = prior
					.get(pk_name)
					.cloned()
					.unwrap_or_else(|| serde_json::Value::String(id.to_string()));
				row.insert(field.name.clone(), key);
			} else if field.name == "edited_by" {
				if let Some(actor) = actor {
					row.insert(field.name.clone(), serde_json::Value::from(actor.id));
				}
			} else if let Some(value) = prior.get(&field.name) {
				row.insert(field.name.clone(), value.clone());
			}
		}

		self.store.insert(&revision.table, &row).await?;
		Ok(())
	}
}

/// Fields whose value differs between the two states, ignoring the key and
/// storage bookkeeping columns
fn changed_fields(entry: &RegisteredResource, prior: &Record, updated: &Record) -> Vec<String> {
	let pk_name = entry.schema.primary_key().map(|f| f.name.as_str());
	entry
		.schema
		.fields
		.iter()
		.filter(|f| {
			Some(f.name.as_str()) != pk_name && !SYSTEM_FIELDS.contains(&f.name.as_str())
		})
		.filter(|f| prior.get(&f.name) != updated.get(&f.name))
		.map(|f| f.name.clone())
		.collect()
}
