//! Resource registry
//!
//! The registry is the immutable, explicitly-built mapping from
//! resource-type identifiers to their configuration. It is populated once
//! at startup through [`RegistryBuilder`] and then shared read-only, so
//! request-time resolution needs no locking.

use crate::descriptor::{FilterOperator, FilterValue, ResourceDescriptor};
use crate::error::{AdminError, AdminResult};
use crate::schema::TableSchema;
use crate::store::SchemaSource;
use std::collections::HashMap;

/// A registered resource: its descriptor plus the schema snapshots taken
/// at build time
#[derive(Debug, Clone)]
pub struct RegisteredResource {
	/// The static configuration the resource was registered with
	pub descriptor: ResourceDescriptor,
	/// Schema of the backing table, reflected at registry build
	pub schema: TableSchema,
	/// Schema of the revision table, when revisioning is configured
	pub revision_schema: Option<TableSchema>,
}

/// Immutable identifier-to-resource mapping
#[derive(Debug, Default)]
pub struct ResourceRegistry {
	resources: HashMap<String, RegisteredResource>,
	order: Vec<String>,
}

impl ResourceRegistry {
	/// Resolve a resource-type identifier.
	///
	/// Unknown identifiers are a [`AdminError::NotFound`], the same failure
	/// mode as a missing row: callers redirect rather than crash.
	pub fn resolve(&self, resource_type: &str) -> AdminResult<&RegisteredResource> {
		self.resources
			.get(resource_type)
			.ok_or_else(|| AdminError::NotFound(format!("resource type '{resource_type}'")))
	}

	/// Registered identifiers, in registration order
	pub fn identifiers(&self) -> Vec<&str> {
		self.order.iter().map(String::as_str).collect()
	}

	/// Number of registered resource types
	pub fn len(&self) -> usize {
		self.order.len()
	}

	/// Whether the registry is empty
	pub fn is_empty(&self) -> bool {
		self.order.is_empty()
	}
}

/// Builder that collects descriptors and snapshots their schemas
///
/// ```no_run
/// # async fn build(source: impl backoffice::SchemaSource) -> backoffice::AdminResult<()> {
/// use backoffice::{Permissions, RegistryBuilder, ResourceDescriptor};
///
/// let registry = RegistryBuilder::new()
///     .register(
///         ResourceDescriptor::builder("widget", "widgets")
///             .list_display(["name", "qty"])
///             .permissions(Permissions::all())
///             .build(),
///     )?
///     .build(&source)
///     .await?;
/// # let _ = registry;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct RegistryBuilder {
	descriptors: Vec<ResourceDescriptor>,
}

impl RegistryBuilder {
	/// Create an empty builder
	pub fn new() -> Self {
		Self::default()
	}

	/// Add a descriptor.
	///
	/// Registering the same identifier twice is a programming error and
	/// fails immediately rather than silently shadowing the first entry.
	pub fn register(mut self, descriptor: ResourceDescriptor) -> AdminResult<Self> {
		if self
			.descriptors
			.iter()
			.any(|d| d.identifier() == descriptor.identifier())
		{
			return Err(AdminError::DuplicateRegistration(
				descriptor.identifier().to_string(),
			));
		}
		self.descriptors.push(descriptor);
		Ok(self)
	}

	/// Reflect schemas and finalize the registry.
	///
	/// Each descriptor's backing table (and revision table, if configured)
	/// is snapshotted through `source`. Dotted display fields are validated
	/// against the declared relations here, so a typo fails at startup
	/// instead of at query time.
	pub async fn build<S: SchemaSource>(self, source: &S) -> AdminResult<ResourceRegistry> {
		let mut registry = ResourceRegistry::default();
		for descriptor in self.descriptors {
			for field in descriptor.list_display() {
				if let Some((relation, _)) = field.split_once('.') {
					if descriptor.relation(relation).is_none() {
						return Err(AdminError::Config(format!(
							"resource '{}' displays '{}' but declares no relation '{}'",
							descriptor.identifier(),
							field,
							relation
						)));
					}
				}
			}

			for filter in descriptor.extra_filters() {
				if matches!(filter.value, FilterValue::List(_))
					&& filter.operator != FilterOperator::In
				{
					return Err(AdminError::Config(format!(
						"resource '{}' filters '{}' with a list value but operator {:?}",
						descriptor.identifier(),
						filter.field,
						filter.operator
					)));
				}
			}

			let schema = source.table_schema(descriptor.table()).await?;
			let revision_schema = match descriptor.revision() {
				Some(revision) => Some(source.table_schema(&revision.table).await?),
				None => None,
			};

			tracing::debug!(
				resource = descriptor.identifier(),
				table = descriptor.table(),
				fields = schema.fields.len(),
				"registered resource"
			);

			registry.order.push(descriptor.identifier().to_string());
			registry.resources.insert(
				descriptor.identifier().to_string(),
				RegisteredResource {
					descriptor,
					schema,
					revision_schema,
				},
			);
		}
		Ok(registry)
	}
}
