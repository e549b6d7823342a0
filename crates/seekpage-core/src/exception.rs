//! Error types for pagination
//!
//! Every failure is reported as a distinct [`PaginationError`] variant. The
//! validation variants are produced before any I/O is issued and are
//! deterministic for a given input, so callers must never retry them.
//! Driver failures arrive as [`DriverError`] and are wrapped unmodified in
//! [`PaginationError::Backend`].

/// Result type for pagination operations
pub type Result<T> = std::result::Result<T, PaginationError>;

/// Result type for collection driver calls
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Errors that can occur while building or executing a paginated query
#[derive(Debug, thiserror::Error)]
pub enum PaginationError {
	/// The cursor token could not be parsed
	#[error("Invalid cursor: {0}")]
	InvalidCursor(String),

	/// The cursor was produced under a different sort specification
	#[error("Cursor was issued for sort {expected}, but the request sorts by {actual}")]
	CursorSortMismatch {
		/// Fingerprint embedded in the cursor
		expected: String,
		/// Fingerprint of the sort used by the current request
		actual: String,
	},

	/// Page size was zero or negative
	#[error("Invalid limit {0}: limit must be a positive integer")]
	InvalidLimit(i64),

	/// The same field appears twice in a sort with conflicting directions
	#[error("Sort field '{0}' appears more than once with different directions")]
	DuplicateSortField(String),

	/// Search was invoked with an empty or whitespace-only query
	#[error("Search string must not be empty")]
	EmptySearchString,

	/// A pipeline stage cannot safely be followed by pagination stages
	#[error("Unsupported pipeline stage at index {index}: {stage}")]
	UnsupportedPipelineStage {
		/// Position of the offending stage in the caller's pipeline
		index: usize,
		/// Operator name, or a description of the malformed stage
		stage: String,
	},

	/// The pipeline output no longer contains the unique tiebreak field
	#[error("Tiebreak field '{field}' does not survive pipeline stage {index} ({stage})")]
	MissingTiebreakField {
		/// The unique key field
		field: String,
		/// Position of the stage that drops the field
		index: usize,
		/// Operator name of the stage that drops the field
		stage: String,
	},

	/// Keyset insertion marker lies outside the caller's pipeline
	#[error("Keyset insertion marker {marker} is out of range for a pipeline of {len} stages")]
	InvalidPipelineMarker {
		/// The requested insertion index
		marker: usize,
		/// Number of stages in the caller's pipeline
		len: usize,
	},

	/// Paginate/search/aggregate was called on a binding without a collection
	#[error("Collection not bound")]
	CollectionNotBound,

	/// A page item could not be converted into the requested type
	#[error("Failed to deserialize page item: {0}")]
	Deserialization(#[from] bson::error::Error),

	/// The underlying collection driver failed
	#[error("Backend error: {0}")]
	Backend(#[from] DriverError),
}

impl PaginationError {
	/// Returns `true` for errors detected from the request alone, before any I/O.
	///
	/// # Examples
	///
	/// ```
	/// use seekpage_core::exception::{DriverError, PaginationError};
	///
	/// assert!(PaginationError::InvalidLimit(0).is_validation());
	/// assert!(PaginationError::EmptySearchString.is_validation());
	/// assert!(!PaginationError::Backend(DriverError::Timeout("find".into())).is_validation());
	/// ```
	pub fn is_validation(&self) -> bool {
		matches!(
			self,
			PaginationError::InvalidCursor(_)
				| PaginationError::CursorSortMismatch { .. }
				| PaginationError::InvalidLimit(_)
				| PaginationError::DuplicateSortField(_)
				| PaginationError::EmptySearchString
				| PaginationError::UnsupportedPipelineStage { .. }
				| PaginationError::MissingTiebreakField { .. }
				| PaginationError::InvalidPipelineMarker { .. }
		)
	}
}

/// Errors reported by a collection driver
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
	/// Connection could not be established or was lost
	#[error("Connection error: {0}")]
	Connection(String),

	/// Query/operation execution error
	#[error("Execution error: {0}")]
	Execution(String),

	/// The driver call timed out
	#[error("Timeout: {0}")]
	Timeout(String),

	/// The driver call was cancelled
	#[error("Cancelled: {0}")]
	Cancelled(String),

	/// Serialization/deserialization error
	#[error("Serialization error: {0}")]
	Serialization(String),

	/// Feature not supported by this backend
	#[error("Unsupported feature: {0}")]
	Unsupported(String),
}

/// Errors raised while loading or validating pagination settings
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	/// The source is not valid TOML or a key has the wrong type
	#[error("Failed to parse settings: {0}")]
	Parse(#[from] toml::de::Error),

	/// A setting is outside its allowed range
	#[error("Invalid setting '{field}': {reason}")]
	InvalidValue {
		field: &'static str,
		reason: &'static str,
	},
}

impl From<bson::error::Error> for DriverError {
	fn from(err: bson::error::Error) -> Self {
		DriverError::Serialization(err.to_string())
	}
}
