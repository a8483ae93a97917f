//! # backoffice
//!
//! A generic administrative back-office core: the machinery that maps a
//! declared *resource type* to database operations, search/sort/pagination,
//! and CSV import/export, uniformly across arbitrary entity kinds.
//!
//! The crate is storage-agnostic. The CRUD engine talks to a
//! [`store::ResourceStore`] port; the shipped [`store::SqlStore`] adapter
//! implements it with `sea-query` statement generation over any
//! [`store::DatabaseConnection`]. Routing, templating, sessions, and the
//! concrete database driver are the host application's concern.
//!
//! ## Overview
//!
//! - [`registry`]: immutable mapping from resource-type identifiers to
//!   descriptors, built once at startup
//! - [`descriptor`]: per-resource configuration (displayed fields,
//!   permissions, relations, revisioning, lifecycle hooks)
//! - [`schema`]: field/table schema snapshots reflected from storage
//! - [`introspect`]: readable/editable field derivation
//! - [`coerce`]: raw text to typed value conversion, secret hashing
//! - [`query`]: search/date-range/sort/pagination statement building
//! - [`engine`]: create/read/update/delete orchestration
//! - [`exchange`]: CSV export, sample template, and bulk import

pub mod coerce;
pub mod config;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod exchange;
pub mod introspect;
pub mod query;
pub mod registry;
pub mod schema;
pub mod store;

pub use coerce::{SecretHasher, coerce};
pub use config::AdminConfig;
pub use descriptor::{
	Action, Filter, FilterOperator, FilterValue, ListController, Permissions, RelationSpec,
	ResourceDescriptor, ResourceHooks, RevisionConfig, SortCriterion, SortDirection,
};
pub use engine::{Actor, CrudEngine};
pub use error::{AdminError, AdminResult};
pub use exchange::{ImportOutcome, ImportRowError, ObjectStorage};
pub use query::{ListParams, Page};
pub use registry::{RegisteredResource, RegistryBuilder, ResourceRegistry};
pub use schema::{FieldDescriptor, FieldType, TableSchema};
pub use store::{DatabaseConnection, Record, ResourceStore, SchemaSource, SqlStore};
