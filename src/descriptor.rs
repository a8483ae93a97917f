//! Per-resource configuration
//!
//! A [`ResourceDescriptor`] is the static configuration bundle for one
//! resource type: which table backs it, which fields the list view shows,
//! what the actor may do with it, and the optional capabilities (revision
//! tracking, lifecycle hooks, extra filters) the CRUD engine checks for.
//!
//! Descriptors are declared explicitly in code and handed to the
//! [`crate::registry::RegistryBuilder`]; there is no runtime discovery.

use crate::error::AdminResult;
use crate::query::{ListParams, Page};
use crate::store::Record;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Action kinds gated by a descriptor's permission set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
	/// Create a new entity
	Create,
	/// Read a single entity or list entities
	Read,
	/// Edit an existing entity
	Update,
	/// Delete an entity
	Delete,
	/// Export the filtered result set as CSV
	Export,
	/// Bulk-create entities from an uploaded CSV
	Import,
}

/// Per-resource permission set
///
/// The default grants read access only, matching the conservative default
/// the engine applies to resources that declare nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
	/// Allow creating entities
	pub create: bool,
	/// Allow reading/listing entities
	pub read: bool,
	/// Allow editing entities
	pub update: bool,
	/// Allow deleting entities
	pub delete: bool,
	/// Allow CSV export
	pub export: bool,
	/// Allow CSV import
	pub import: bool,
}

impl Default for Permissions {
	fn default() -> Self {
		Self {
			create: false,
			read: true,
			update: false,
			delete: false,
			export: false,
			import: false,
		}
	}
}

impl Permissions {
	/// Grant every action
	pub fn all() -> Self {
		Self {
			create: true,
			read: true,
			update: true,
			delete: true,
			export: true,
			import: true,
		}
	}

	/// Whether this set grants the given action
	pub fn allows(&self, action: Action) -> bool {
		match action {
			Action::Create => self.create,
			Action::Read => self.read,
			Action::Update => self.update,
			Action::Delete => self.delete,
			Action::Export => self.export,
			Action::Import => self.import,
		}
	}
}

/// Join metadata for a dotted `relation.field` display path
///
/// Declared explicitly on the descriptor; the query builder uses it to join
/// the related table and eagerly select the referenced columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationSpec {
	/// Relation name, the prefix of dotted display fields
	pub name: String,
	/// Related table
	pub table: String,
	/// Foreign-key column on the resource's own table
	pub local_key: String,
	/// Key column on the related table
	pub foreign_key: String,
}

/// Sort direction for one criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
	/// Ascending
	Asc,
	/// Descending
	Desc,
}

/// One `(field, direction)` sort criterion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortCriterion {
	/// Field to sort by
	pub field: String,
	/// Direction
	pub direction: SortDirection,
}

impl SortCriterion {
	/// Ascending criterion on a field
	pub fn asc(field: impl Into<String>) -> Self {
		Self {
			field: field.into(),
			direction: SortDirection::Asc,
		}
	}

	/// Descending criterion on a field
	pub fn desc(field: impl Into<String>) -> Self {
		Self {
			field: field.into(),
			direction: SortDirection::Desc,
		}
	}
}

/// Comparison operator of an extra filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
	/// Equal
	Eq,
	/// Not equal
	Ne,
	/// Case-insensitive substring match
	Contains,
	/// Value is one of a fixed set
	In,
	/// Column is not NULL
	IsNotNull,
}

/// Comparison value of an extra filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
	/// String literal
	String(String),
	/// Integer literal
	Integer(i64),
	/// Boolean literal
	Boolean(bool),
	/// String set, for [`FilterOperator::In`]
	List(Vec<String>),
	/// No value, for operators that take none
	None,
}

/// A resource-type-specific predicate ANDed into every list query.
///
/// This is the descriptor's extension point for restrictions the generic
/// search cannot express, e.g. limiting a user resource to a fixed set of
/// role values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
	/// Column the predicate applies to
	pub field: String,
	/// Operator
	pub operator: FilterOperator,
	/// Comparison value
	pub value: FilterValue,
}

impl Filter {
	/// Create a filter
	pub fn new(field: impl Into<String>, operator: FilterOperator, value: FilterValue) -> Self {
		Self {
			field: field.into(),
			operator,
			value,
		}
	}
}

/// Revision-tracking configuration
///
/// When present, a modifying update writes the entity's prior state to the
/// revision table before the new state becomes visible to readers of that
/// table. Revision rows are write-once and append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionConfig {
	/// Table revision rows are appended to
	pub table: String,
	/// Column on the revision table that carries the source entity's key
	pub source_pk_column: String,
}

/// Custom list-controller override.
///
/// A resource whose list view cannot be expressed through the generic
/// search/sort/paginate path attaches one of these; the engine delegates
/// to it after the permission check instead of running the generic query.
/// Implementors receive the effective parameters (page size already
/// resolved) and own their data access entirely.
#[async_trait]
pub trait ListController: Send + Sync {
	/// Produce the page for this resource's list view
	async fn list(&self, params: &ListParams) -> AdminResult<Page>;
}

/// Lifecycle hooks a descriptor may attach.
///
/// Every method has a no-op default, so implementors override only the
/// events they care about. The engine checks for hook presence on the
/// descriptor rather than probing for methods dynamically.
#[async_trait]
pub trait ResourceHooks: Send + Sync {
	/// Called after a create commits, with the stored entity
	async fn after_create(&self, _created: &Record) {}

	/// Called after an update commits, with the new and prior states
	async fn after_update(&self, _updated: &Record, _prior: &Record) {}

	/// Called after a delete commits, only when the entity existed
	async fn after_delete(&self, _deleted: &Record) {}
}

/// Static configuration for one resource type
///
/// Built with [`ResourceDescriptor::builder`]:
///
/// ```
/// use backoffice::{Permissions, ResourceDescriptor, SortCriterion};
///
/// let descriptor = ResourceDescriptor::builder("widget", "widgets")
///     .list_display(["name", "qty"])
///     .permissions(Permissions::all())
///     .sort(vec![SortCriterion::desc("created_at")])
///     .build();
///
/// assert_eq!(descriptor.identifier(), "widget");
/// assert_eq!(descriptor.table(), "widgets");
/// ```
#[derive(Clone)]
pub struct ResourceDescriptor {
	identifier: String,
	table: String,
	list_display: Vec<String>,
	relations: Vec<RelationSpec>,
	sort: Vec<SortCriterion>,
	permissions: Permissions,
	protected_fields: Vec<String>,
	secret_field: Option<String>,
	date_field: String,
	revision: Option<RevisionConfig>,
	hooks: Option<Arc<dyn ResourceHooks>>,
	list_controller: Option<Arc<dyn ListController>>,
	extra_filters: Vec<Filter>,
	per_page: Option<u64>,
	hide_search: bool,
	hide_date_filter: bool,
}

impl std::fmt::Debug for ResourceDescriptor {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ResourceDescriptor")
			.field("identifier", &self.identifier)
			.field("table", &self.table)
			.field("list_display", &self.list_display)
			.field("permissions", &self.permissions)
			.field("has_hooks", &self.hooks.is_some())
			.field("has_list_controller", &self.list_controller.is_some())
			.finish()
	}
}

impl ResourceDescriptor {
	/// Start building a descriptor for `identifier` backed by `table`
	pub fn builder(
		identifier: impl Into<String>,
		table: impl Into<String>,
	) -> ResourceDescriptorBuilder {
		ResourceDescriptorBuilder {
			descriptor: Self {
				identifier: identifier.into(),
				table: table.into(),
				list_display: Vec::new(),
				relations: Vec::new(),
				sort: Vec::new(),
				permissions: Permissions::default(),
				protected_fields: Vec::new(),
				secret_field: None,
				date_field: "created_at".to_string(),
				revision: None,
				hooks: None,
				list_controller: None,
				extra_filters: Vec::new(),
				per_page: None,
				hide_search: false,
				hide_date_filter: false,
			},
		}
	}

	/// Resource-type identifier, unique within a registry
	pub fn identifier(&self) -> &str {
		&self.identifier
	}

	/// Backing table name
	pub fn table(&self) -> &str {
		&self.table
	}

	/// Displayed fields, plain or dotted `relation.field` paths
	pub fn list_display(&self) -> &[String] {
		&self.list_display
	}

	/// Look up the relation backing a dotted display prefix
	pub fn relation(&self, name: &str) -> Option<&RelationSpec> {
		self.relations.iter().find(|r| r.name == name)
	}

	/// All declared relations
	pub fn relations(&self) -> &[RelationSpec] {
		&self.relations
	}

	/// Default sort criteria for list views
	pub fn sort(&self) -> &[SortCriterion] {
		&self.sort
	}

	/// Permission set
	pub fn permissions(&self) -> &Permissions {
		&self.permissions
	}

	/// Fields excluded from editing on top of keys and timestamps
	pub fn protected_fields(&self) -> &[String] {
		&self.protected_fields
	}

	/// Field stored as a one-way hash instead of raw text
	pub fn secret_field(&self) -> Option<&str> {
		self.secret_field.as_deref()
	}

	/// Field date-range filters apply to
	pub fn date_field(&self) -> &str {
		&self.date_field
	}

	/// Revision-tracking configuration, if opted in
	pub fn revision(&self) -> Option<&RevisionConfig> {
		self.revision.as_ref()
	}

	/// Lifecycle hooks, if attached
	pub fn hooks(&self) -> Option<&Arc<dyn ResourceHooks>> {
		self.hooks.as_ref()
	}

	/// Custom list controller, if attached
	pub fn list_controller(&self) -> Option<&Arc<dyn ListController>> {
		self.list_controller.as_ref()
	}

	/// Extra predicates ANDed into every list query
	pub fn extra_filters(&self) -> &[Filter] {
		&self.extra_filters
	}

	/// Page-size override for this resource
	pub fn per_page(&self) -> Option<u64> {
		self.per_page
	}

	/// Presentation flag: hide the free-text search box
	pub fn hide_search(&self) -> bool {
		self.hide_search
	}

	/// Presentation flag: hide the date-range filter
	pub fn hide_date_filter(&self) -> bool {
		self.hide_date_filter
	}
}

/// Builder for [`ResourceDescriptor`]
pub struct ResourceDescriptorBuilder {
	descriptor: ResourceDescriptor,
}

impl ResourceDescriptorBuilder {
	/// Set the displayed fields
	pub fn list_display<I, S>(mut self, fields: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.descriptor.list_display = fields.into_iter().map(Into::into).collect();
		self
	}

	/// Declare a relation for dotted display paths
	pub fn relation(mut self, spec: RelationSpec) -> Self {
		self.descriptor.relations.push(spec);
		self
	}

	/// Set default sort criteria
	pub fn sort(mut self, criteria: Vec<SortCriterion>) -> Self {
		self.descriptor.sort = criteria;
		self
	}

	/// Set the permission set
	pub fn permissions(mut self, permissions: Permissions) -> Self {
		self.descriptor.permissions = permissions;
		self
	}

	/// Exclude fields from editing
	pub fn protected_fields<I, S>(mut self, fields: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.descriptor.protected_fields = fields.into_iter().map(Into::into).collect();
		self
	}

	/// Mark a field as a one-way-hashed secret
	pub fn secret_field(mut self, field: impl Into<String>) -> Self {
		self.descriptor.secret_field = Some(field.into());
		self
	}

	/// Change the field date-range filters apply to (default `created_at`)
	pub fn date_field(mut self, field: impl Into<String>) -> Self {
		self.descriptor.date_field = field.into();
		self
	}

	/// Opt into revision tracking
	pub fn revision(mut self, config: RevisionConfig) -> Self {
		self.descriptor.revision = Some(config);
		self
	}

	/// Attach lifecycle hooks
	pub fn hooks(mut self, hooks: Arc<dyn ResourceHooks>) -> Self {
		self.descriptor.hooks = Some(hooks);
		self
	}

	/// Replace the generic list path with a custom controller
	pub fn list_controller(mut self, controller: Arc<dyn ListController>) -> Self {
		self.descriptor.list_controller = Some(controller);
		self
	}

	/// Add an extra predicate ANDed into every list query
	pub fn extra_filter(mut self, filter: Filter) -> Self {
		self.descriptor.extra_filters.push(filter);
		self
	}

	/// Override the page size for this resource
	pub fn per_page(mut self, per_page: u64) -> Self {
		self.descriptor.per_page = Some(per_page);
		self
	}

	/// Hide the free-text search box in list views
	pub fn hide_search(mut self) -> Self {
		self.descriptor.hide_search = true;
		self
	}

	/// Hide the date-range filter in list views
	pub fn hide_date_filter(mut self) -> Self {
		self.descriptor.hide_date_filter = true;
		self
	}

	/// Finish building
	pub fn build(self) -> ResourceDescriptor {
		self.descriptor
	}
}
