//! Sort specifications
//!
//! A [`SortSpec`] is an ordered list of [`SortField`]s whose last entry is a
//! unique key. [`SortSpec::resolve`] normalizes caller input into that shape
//! so that every seek key identifies exactly one position in a total order.

use bson::{Bson, Document};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::exception::{PaginationError, Result};

/// Sort direction of a single field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
	Ascending,
	Descending,
}

impl SortDirection {
	/// Return the opposite direction
	pub fn reversed(self) -> Self {
		match self {
			SortDirection::Ascending => SortDirection::Descending,
			SortDirection::Descending => SortDirection::Ascending,
		}
	}

	/// Numeric form used in sort documents (`1` / `-1`)
	pub fn as_i32(self) -> i32 {
		match self {
			SortDirection::Ascending => 1,
			SortDirection::Descending => -1,
		}
	}
}

/// A field name paired with its sort direction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortField {
	pub field: String,
	pub direction: SortDirection,
}

impl SortField {
	/// Sort by `field` ascending
	pub fn asc(field: impl Into<String>) -> Self {
		Self {
			field: field.into(),
			direction: SortDirection::Ascending,
		}
	}

	/// Sort by `field` descending
	pub fn desc(field: impl Into<String>) -> Self {
		Self {
			field: field.into(),
			direction: SortDirection::Descending,
		}
	}

	/// Parse the ordering shorthand where a leading `-` means descending.
	///
	/// # Examples
	///
	/// ```
	/// use seekpage_core::sort::{SortDirection, SortField};
	///
	/// let field = SortField::parse("-created_at");
	/// assert_eq!(field.field, "created_at");
	/// assert_eq!(field.direction, SortDirection::Descending);
	/// assert_eq!(SortField::parse("title"), SortField::asc("title"));
	/// ```
	pub fn parse(ordering: &str) -> Self {
		match ordering.strip_prefix('-') {
			Some(field) => Self::desc(field),
			None => Self::asc(ordering.strip_prefix('+').unwrap_or(ordering)),
		}
	}
}

impl fmt::Display for SortField {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.direction {
			SortDirection::Ascending => write!(f, "{}", self.field),
			SortDirection::Descending => write!(f, "-{}", self.field),
		}
	}
}

/// Stable, order-sensitive hash of a sort specification
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl From<String> for Fingerprint {
	fn from(value: String) -> Self {
		Self(value)
	}
}

impl fmt::Display for Fingerprint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// A resolved sort specification ending with a unique key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
	fields: Vec<SortField>,
}

impl SortSpec {
	/// Normalize caller-supplied sort fields.
	///
	/// - empty input yields `[unique_key ascending]`
	/// - input already containing `unique_key` is kept as is
	/// - otherwise `unique_key ascending` is appended as the tiebreak
	///
	/// Repeated fields with the same direction are collapsed; repeated
	/// fields with conflicting directions fail with `DuplicateSortField`.
	///
	/// # Examples
	///
	/// ```
	/// use seekpage_core::sort::{SortField, SortSpec};
	///
	/// let spec = SortSpec::resolve(vec![SortField::desc("score")], "_id").unwrap();
	/// assert_eq!(spec.fields(), &[SortField::desc("score"), SortField::asc("_id")]);
	/// ```
	pub fn resolve(user_sort: Vec<SortField>, unique_key: &str) -> Result<Self> {
		let mut fields: Vec<SortField> = Vec::with_capacity(user_sort.len() + 1);
		for candidate in user_sort {
			match fields.iter().find(|f| f.field == candidate.field) {
				Some(existing) if existing.direction != candidate.direction => {
					return Err(PaginationError::DuplicateSortField(candidate.field));
				}
				Some(_) => continue,
				None => fields.push(candidate),
			}
		}

		if !fields.iter().any(|f| f.field == unique_key) {
			fields.push(SortField::asc(unique_key));
		}

		Ok(Self { fields })
	}

	pub fn fields(&self) -> &[SortField] {
		&self.fields
	}

	pub fn len(&self) -> usize {
		self.fields.len()
	}

	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}

	/// Names of the sort fields, in order
	pub fn field_names(&self) -> impl Iterator<Item = &str> {
		self.fields.iter().map(|f| f.field.as_str())
	}

	/// The same fields with every direction flipped, used for backward paging
	pub fn reversed(&self) -> Self {
		Self {
			fields: self
				.fields
				.iter()
				.map(|f| SortField {
					field: f.field.clone(),
					direction: f.direction.reversed(),
				})
				.collect(),
		}
	}

	/// Render as an ordered sort document, e.g. `{ "score": -1, "_id": 1 }`
	pub fn to_document(&self) -> Document {
		self.fields
			.iter()
			.map(|f| (f.field.clone(), Bson::Int32(f.direction.as_i32())))
			.collect()
	}

	/// Order-sensitive hash over the field/direction pairs.
	///
	/// # Examples
	///
	/// ```
	/// use seekpage_core::sort::{SortField, SortSpec};
	///
	/// let a = SortSpec::resolve(vec![SortField::asc("name")], "_id").unwrap();
	/// let b = SortSpec::resolve(vec![SortField::desc("name")], "_id").unwrap();
	/// assert_ne!(a.fingerprint(), b.fingerprint());
	/// assert_eq!(a.fingerprint(), a.clone().fingerprint());
	/// ```
	pub fn fingerprint(&self) -> Fingerprint {
		let mut hasher = Sha256::new();
		for field in &self.fields {
			// Length prefix keeps ("ab", "c") distinct from ("a", "bc")
			hasher.update((field.field.len() as u64).to_be_bytes());
			hasher.update(field.field.as_bytes());
			hasher.update([match field.direction {
				SortDirection::Ascending => b'+',
				SortDirection::Descending => b'-',
			}]);
		}
		let digest = hasher.finalize();
		Fingerprint(hex::encode(&digest[..8]))
	}
}

impl fmt::Display for SortSpec {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let rendered: Vec<String> = self.fields.iter().map(ToString::to_string).collect();
		write!(f, "[{}]", rendered.join(", "))
	}
}
