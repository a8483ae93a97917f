//! Error types for the admin engine

use thiserror::Error;

/// Admin engine error type
#[derive(Debug, Error)]
pub enum AdminError {
	/// Unknown resource type, or a row missing by id.
	///
	/// Recoverable by the caller: the conventional reaction is a silent
	/// redirect to the list view, with no data change.
	#[error("not found: {0}")]
	NotFound(String),

	/// A raw input value could not be converted to the field's declared type
	#[error("cannot coerce field '{field}': {message}")]
	Coercion {
		/// Field whose value was rejected
		field: String,
		/// Parse failure detail
		message: String,
	},

	/// Two descriptors registered under the same resource-type identifier.
	/// Fatal at startup.
	#[error("resource type '{0}' is already registered")]
	DuplicateRegistration(String),

	/// The descriptor's permission set does not grant the attempted action
	#[error("permission denied: {0}")]
	PermissionDenied(String),

	/// Storage failure (constraint violation, connection loss, ...).
	/// Surfaced to the caller as an operation failure; never retried here.
	#[error("database error: {0}")]
	Database(String),

	/// CSV encoding or decoding failed at the stream level
	#[error("csv exchange failed: {0}")]
	Exchange(String),

	/// Uploading an archived file to object storage failed
	#[error("archive upload failed: {0}")]
	Archive(String),

	/// Invalid static configuration (bad TOML, descriptor inconsistency)
	#[error("invalid configuration: {0}")]
	Config(String),
}

/// Result type for admin engine operations
pub type AdminResult<T> = Result<T, AdminError>;
