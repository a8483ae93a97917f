//! Static engine configuration
//!
//! Loaded once at startup, typically from a TOML fragment of the host
//! application's settings file.

use crate::error::{AdminError, AdminResult};
use serde::Deserialize;

/// Engine-wide defaults
///
/// # Examples
///
/// ```
/// use backoffice::AdminConfig;
///
/// let config = AdminConfig::from_toml_str(r#"per_page = 50"#).unwrap();
/// assert_eq!(config.per_page, 50);
/// assert_eq!(config.date_format, "%Y-%m-%d");
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
	/// Default page size for list views when the descriptor does not override it
	pub per_page: u64,
	/// Fixed parse format for `date` field coercion and date-range filters
	pub date_format: String,
	/// Fixed parse format for `datetime` field coercion
	pub datetime_format: String,
}

impl Default for AdminConfig {
	fn default() -> Self {
		Self {
			per_page: 20,
			date_format: "%Y-%m-%d".to_string(),
			datetime_format: "%Y-%m-%d %H:%M:%S".to_string(),
		}
	}
}

impl AdminConfig {
	/// Parse a configuration from a TOML string
	pub fn from_toml_str(input: &str) -> AdminResult<Self> {
		toml::from_str(input).map_err(|e| AdminError::Config(e.to_string()))
	}
}
