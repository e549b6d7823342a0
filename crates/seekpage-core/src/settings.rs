//! Pagination settings

use serde::Deserialize;

use crate::exception::{ConfigError, PaginationError, Result};

/// Default page size when a request carries no limit
pub const DEFAULT_LIMIT: i64 = 50;
/// Upper bound applied to requested page sizes
pub const MAX_LIMIT: i64 = 300;
/// Native identifier of a document collection
pub const DEFAULT_UNIQUE_KEY: &str = "_id";
/// Field under which text-search relevance is exposed
pub const DEFAULT_SCORE_FIELD: &str = "_score";

/// Engine-wide pagination settings
///
/// Settings can be built in code or loaded from TOML:
///
/// ```toml
/// default_limit = 20
/// max_limit = 100
/// unique_key = "_id"
/// score_field = "_score"
/// cursor_secret = "change-me-to-a-32-byte-secret!!!"
/// ```
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaginationSettings {
	pub default_limit: i64,
	pub max_limit: i64,
	pub unique_key: String,
	pub score_field: String,
	/// Secret used to sign cursors. Unsigned cursors are issued when `None`.
	pub cursor_secret: Option<String>,
}

impl Default for PaginationSettings {
	fn default() -> Self {
		Self {
			default_limit: DEFAULT_LIMIT,
			max_limit: MAX_LIMIT,
			unique_key: DEFAULT_UNIQUE_KEY.to_string(),
			score_field: DEFAULT_SCORE_FIELD.to_string(),
			cursor_secret: None,
		}
	}
}

impl PaginationSettings {
	/// Create settings with default values
	///
	/// # Examples
	///
	/// ```rust
	/// use seekpage_core::settings::PaginationSettings;
	///
	/// let settings = PaginationSettings::new();
	/// assert_eq!(settings.default_limit, 50);
	/// assert_eq!(settings.max_limit, 300);
	/// assert_eq!(settings.unique_key, "_id");
	/// ```
	pub fn new() -> Self {
		Self::default()
	}

	/// Load settings from a TOML document. Missing keys keep their defaults.
	///
	/// # Examples
	///
	/// ```rust
	/// use seekpage_core::settings::PaginationSettings;
	///
	/// let settings = PaginationSettings::from_toml_str("max_limit = 25").unwrap();
	/// assert_eq!(settings.max_limit, 25);
	/// assert_eq!(settings.default_limit, 25);
	/// ```
	pub fn from_toml_str(source: &str) -> std::result::Result<Self, ConfigError> {
		let mut settings: Self = toml::from_str(source)?;
		settings.default_limit = settings.default_limit.min(settings.max_limit);
		settings.validate()?;
		Ok(settings)
	}

	pub fn with_default_limit(mut self, limit: i64) -> Self {
		self.default_limit = limit;
		self
	}

	pub fn with_max_limit(mut self, limit: i64) -> Self {
		self.max_limit = limit;
		self
	}

	pub fn with_unique_key(mut self, field: impl Into<String>) -> Self {
		self.unique_key = field.into();
		self
	}

	pub fn with_score_field(mut self, field: impl Into<String>) -> Self {
		self.score_field = field.into();
		self
	}

	pub fn with_cursor_secret(mut self, secret: impl Into<String>) -> Self {
		self.cursor_secret = Some(secret.into());
		self
	}

	pub fn validate(&self) -> std::result::Result<(), ConfigError> {
		let invalid = |field, reason| Err(ConfigError::InvalidValue { field, reason });
		if self.max_limit <= 0 {
			return invalid("max_limit", "must be positive");
		}
		if self.default_limit <= 0 || self.default_limit > self.max_limit {
			return invalid("default_limit", "must be within 1..=max_limit");
		}
		if self.unique_key.is_empty() {
			return invalid("unique_key", "must not be empty");
		}
		if self.score_field.is_empty() {
			return invalid("score_field", "must not be empty");
		}
		if self.score_field == self.unique_key {
			return invalid("score_field", "must differ from unique_key");
		}
		Ok(())
	}

	/// Resolve the effective page size for a request.
	///
	/// Absent limits fall back to `default_limit`, limits above `max_limit`
	/// are clamped, and non-positive limits are rejected.
	///
	/// # Examples
	///
	/// ```rust
	/// use seekpage_core::settings::PaginationSettings;
	///
	/// let settings = PaginationSettings::new().with_max_limit(100);
	/// assert_eq!(settings.effective_limit(None).unwrap(), 50);
	/// assert_eq!(settings.effective_limit(Some(500)).unwrap(), 100);
	/// assert!(settings.effective_limit(Some(0)).is_err());
	/// ```
	pub fn effective_limit(&self, requested: Option<i64>) -> Result<usize> {
		let limit = match requested {
			None => self.default_limit,
			Some(limit) if limit <= 0 => return Err(PaginationError::InvalidLimit(limit)),
			Some(limit) if limit > self.max_limit => {
				tracing::warn!(
					requested = limit,
					max_limit = self.max_limit,
					"requested limit exceeds max_limit, clamping"
				);
				self.max_limit
			}
			Some(limit) => limit,
		};
		// Both bounds are positive here, so the conversion cannot fail on supported targets
		usize::try_from(limit).map_err(|_| PaginationError::InvalidLimit(limit))
	}
}
