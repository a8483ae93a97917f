//! Raw input coercion
//!
//! Form submissions and CSV cells arrive as strings. [`coerce`] converts a
//! raw string to the typed JSON value the storage layer expects, driven by
//! the field's schema type. The policy is uniform across every entry path:
//!
//! - blank input (empty or whitespace-only) becomes `Null` for every type
//! - booleans accept a case-insensitive `true`; any other non-blank text
//!   is `false`
//! - malformed non-blank numeric or date input is rejected with
//!   [`AdminError::Coercion`] instead of being silently passed through
//!
//! Secret fields never go through [`coerce`]; they are hashed by
//! [`SecretHasher`] and stored as opaque digests.

use crate::config::AdminConfig;
use crate::error::{AdminError, AdminResult};
use crate::schema::{FieldDescriptor, FieldType};
use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHasher, SaltString};
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

/// Convert a raw string to the field's typed JSON value.
///
/// # Examples
///
/// ```
/// use backoffice::{AdminConfig, FieldDescriptor, FieldType, coerce};
/// use serde_json::{Value, json};
///
/// let config = AdminConfig::default();
/// let qty = FieldDescriptor::new("qty", FieldType::Integer);
///
/// assert_eq!(coerce(&qty, "42", &config).unwrap(), json!(42));
/// assert_eq!(coerce(&qty, "  ", &config).unwrap(), Value::Null);
/// assert!(coerce(&qty, "abc", &config).is_err());
/// ```
pub fn coerce(field: &FieldDescriptor, raw: &str, config: &AdminConfig) -> AdminResult<Value> {
	let trimmed = raw.trim();
	if trimmed.is_empty() {
		return Ok(Value::Null);
	}

	match field.field_type {
		FieldType::Text | FieldType::Json => Ok(Value::String(trimmed.to_string())),
		FieldType::Integer => trimmed
			.parse::<i64>()
			.map(Value::from)
			.map_err(|e| coercion_error(field, e.to_string())),
		FieldType::Float => {
			let parsed = trimmed
				.parse::<f64>()
				.map_err(|e| coercion_error(field, e.to_string()))?;
			serde_json::Number::from_f64(parsed)
				.map(Value::Number)
				.ok_or_else(|| coercion_error(field, "not a finite number".to_string()))
		}
		FieldType::Boolean => Ok(Value::Bool(trimmed.eq_ignore_ascii_case("true"))),
		FieldType::Date => {
			NaiveDate::parse_from_str(trimmed, &config.date_format)
				.map_err(|e| coercion_error(field, e.to_string()))?;
			Ok(Value::String(trimmed.to_string()))
		}
		FieldType::DateTime => {
			NaiveDateTime::parse_from_str(trimmed, &config.datetime_format)
				.map_err(|e| coercion_error(field, e.to_string()))?;
			Ok(Value::String(trimmed.to_string()))
		}
	}
}

fn coercion_error(field: &FieldDescriptor, message: String) -> AdminError {
	AdminError::Coercion {
		field: field.name.clone(),
		message,
	}
}

/// One-way hasher for secret fields
///
/// Wraps Argon2 with per-value random salts. The raw value is never
/// persisted or logged.
#[derive(Debug, Default, Clone)]
pub struct SecretHasher;

impl SecretHasher {
	/// Hash a raw secret into a self-describing digest string
	pub fn hash(&self, raw: &str) -> AdminResult<String> {
		let salt = SaltString::generate(&mut OsRng);
		let digest = Argon2::default()
			.hash_password(raw.as_bytes(), &salt)
			.map_err(|e| AdminError::Config(format!("secret hashing failed: {e}")))?;
		Ok(digest.to_string())
	}
}
