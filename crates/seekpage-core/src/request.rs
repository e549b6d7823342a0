//! Request value types
//!
//! All requests are built with consuming builder methods:
//!
//! ```
//! use bson::doc;
//! use seekpage_core::request::{PageDirection, PageRequest};
//! use seekpage_core::sort::SortField;
//!
//! let request = PageRequest::new()
//!     .filter(doc! { "active": true })
//!     .sort(vec![SortField::desc("created")])
//!     .limit(20)
//!     .include_total_count(true);
//! assert_eq!(request.direction, PageDirection::Forward);
//! ```

use bson::Document;
use serde::{Deserialize, Serialize};

use crate::cursor::Cursor;
use crate::sort::SortField;

/// Direction of travel relative to the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageDirection {
	#[default]
	Forward,
	Backward,
}

/// Parameters of a `find` page
#[derive(Debug, Clone, Default)]
pub struct PageRequest {
	pub filter: Document,
	pub sort: Vec<SortField>,
	/// Page size; the configured default applies when `None`
	pub limit: Option<i64>,
	pub cursor: Option<Cursor>,
	pub direction: PageDirection,
	pub include_total_count: bool,
	/// Optional field projection applied to returned items
	pub projection: Option<Document>,
}

impl PageRequest {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn filter(mut self, filter: Document) -> Self {
		self.filter = filter;
		self
	}

	pub fn sort(mut self, sort: Vec<SortField>) -> Self {
		self.sort = sort;
		self
	}

	/// Sort using the `-field` ordering shorthand
	pub fn ordering(mut self, ordering: &[&str]) -> Self {
		self.sort = ordering.iter().map(|o| SortField::parse(o)).collect();
		self
	}

	pub fn limit(mut self, limit: i64) -> Self {
		self.limit = Some(limit);
		self
	}

	/// Continue forward from a page's `next_cursor`
	pub fn after(mut self, cursor: impl Into<Cursor>) -> Self {
		self.cursor = Some(cursor.into());
		self.direction = PageDirection::Forward;
		self
	}

	/// Continue backward from a page's `prev_cursor`
	pub fn before(mut self, cursor: impl Into<Cursor>) -> Self {
		self.cursor = Some(cursor.into());
		self.direction = PageDirection::Backward;
		self
	}

	pub fn direction(mut self, direction: PageDirection) -> Self {
		self.direction = direction;
		self
	}

	pub fn include_total_count(mut self, include: bool) -> Self {
		self.include_total_count = include;
		self
	}

	pub fn projection(mut self, projection: Document) -> Self {
		self.projection = Some(projection);
		self
	}
}

/// Parameters of a text-search page
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
	pub query: String,
	pub page: PageRequest,
}

impl SearchRequest {
	pub fn new(query: impl Into<String>) -> Self {
		Self {
			query: query.into(),
			page: PageRequest::default(),
		}
	}

	/// Replace the paging parameters
	pub fn page(mut self, page: PageRequest) -> Self {
		self.page = page;
		self
	}
}

/// Parameters of an aggregation page
///
/// The pipeline is caller-owned; the engine appends stages to a copy and
/// never mutates it.
#[derive(Debug, Clone, Default)]
pub struct AggregateRequest {
	pub pipeline: Vec<Document>,
	pub sort: Vec<SortField>,
	pub limit: Option<i64>,
	pub cursor: Option<Cursor>,
	pub direction: PageDirection,
	pub include_total_count: bool,
	/// Unique key of the pipeline output; the configured key applies when `None`
	pub unique_key: Option<String>,
	/// Stage index before which the keyset `$match` is inserted
	pub keyset_position: Option<usize>,
}

impl AggregateRequest {
	pub fn new(pipeline: Vec<Document>) -> Self {
		Self {
			pipeline,
			..Self::default()
		}
	}

	pub fn sort(mut self, sort: Vec<SortField>) -> Self {
		self.sort = sort;
		self
	}

	pub fn limit(mut self, limit: i64) -> Self {
		self.limit = Some(limit);
		self
	}

	pub fn after(mut self, cursor: impl Into<Cursor>) -> Self {
		self.cursor = Some(cursor.into());
		self.direction = PageDirection::Forward;
		self
	}

	pub fn before(mut self, cursor: impl Into<Cursor>) -> Self {
		self.cursor = Some(cursor.into());
		self.direction = PageDirection::Backward;
		self
	}

	pub fn include_total_count(mut self, include: bool) -> Self {
		self.include_total_count = include;
		self
	}

	pub fn unique_key(mut self, field: impl Into<String>) -> Self {
		self.unique_key = Some(field.into());
		self
	}

	/// Insert the keyset `$match` before stage `index` instead of after the
	/// last stage. `index == pipeline.len()` is equivalent to the default.
	pub fn insert_keyset_at(mut self, index: usize) -> Self {
		self.keyset_position = Some(index);
		self
	}
}
