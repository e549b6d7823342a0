//! Opaque pagination cursors
//!
//! A cursor is a serialized [`SeekKey`] bound to the [`Fingerprint`] of the
//! sort it was produced under. See [`CursorCodec`] for the wire format.
//!
//! [`Fingerprint`]: crate::sort::Fingerprint

mod codec;

pub use codec::CursorCodec;

use bson::{Bson, Document};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::document::value_at;
use crate::sort::SortSpec;

/// Opaque, URL-safe pagination token
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn into_string(self) -> String {
		self.0
	}
}

impl From<String> for Cursor {
	fn from(value: String) -> Self {
		Self(value)
	}
}

impl From<&str> for Cursor {
	fn from(value: &str) -> Self {
		Self(value.to_string())
	}
}

impl fmt::Display for Cursor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// The sort-field values of one document, in sort order
#[derive(Debug, Clone, PartialEq)]
pub struct SeekKey(Vec<Bson>);

impl SeekKey {
	pub fn new(values: Vec<Bson>) -> Self {
		Self(values)
	}

	/// Read the values of every sort field from `doc`; missing fields read as `Null`.
	///
	/// # Examples
	///
	/// ```
	/// use bson::{doc, Bson};
	/// use seekpage_core::cursor::SeekKey;
	/// use seekpage_core::sort::{SortField, SortSpec};
	///
	/// let spec = SortSpec::resolve(vec![SortField::desc("score")], "_id").unwrap();
	/// let key = SeekKey::from_document(&doc! { "_id": 7, "score": 90 }, &spec);
	/// assert_eq!(key.values(), &[Bson::Int32(90), Bson::Int32(7)]);
	/// ```
	pub fn from_document(doc: &Document, sort: &SortSpec) -> Self {
		Self(sort.field_names().map(|field| value_at(doc, field)).collect())
	}

	pub fn values(&self) -> &[Bson] {
		&self.0
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn into_values(self) -> Vec<Bson> {
		self.0
	}
}
