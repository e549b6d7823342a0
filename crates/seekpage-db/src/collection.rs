//! Collection capability
//!
//! The engines talk to storage only through [`Collection`]. Implementations
//! exist for an in-memory store and, behind the `mongodb` feature, for a
//! MongoDB collection.

use async_trait::async_trait;
use bson::{Bson, Document};

use seekpage_core::exception::DriverResult;

/// Options of a `find_many` call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
	/// Ordered sort document, e.g. `{ "score": -1, "_id": 1 }`
	pub sort: Document,
	pub limit: Option<i64>,
	pub projection: Option<Document>,
}

impl FindOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn sort(mut self, sort: Document) -> Self {
		self.sort = sort;
		self
	}

	pub fn limit(mut self, limit: i64) -> Self {
		self.limit = Some(limit);
		self
	}

	pub fn projection(mut self, projection: Option<Document>) -> Self {
		self.projection = projection;
		self
	}
}

/// Options of a `text_search` call
///
/// The relevance score must be addressable as `score_field` by both the
/// filter and the sort passed alongside these options.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSearchOptions {
	pub score_field: String,
	pub sort: Document,
	pub limit: Option<i64>,
	pub projection: Option<Document>,
}

impl TextSearchOptions {
	pub fn new(score_field: impl Into<String>) -> Self {
		Self {
			score_field: score_field.into(),
			sort: Document::new(),
			limit: None,
			projection: None,
		}
	}

	pub fn sort(mut self, sort: Document) -> Self {
		self.sort = sort;
		self
	}

	pub fn limit(mut self, limit: i64) -> Self {
		self.limit = Some(limit);
		self
	}

	pub fn projection(mut self, projection: Option<Document>) -> Self {
		self.projection = projection;
		self
	}
}

/// Asynchronous access to one named document collection
///
/// # Example
///
/// ```rust
/// use bson::doc;
/// use seekpage_db::backends::memory::MemoryCollection;
/// use seekpage_db::collection::{Collection, FindOptions};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let users = MemoryCollection::new("users");
/// users.insert_one(doc! { "_id": 1, "active": true });
///
/// let found = users
///     .find_many(doc! { "active": true }, FindOptions::new().limit(10))
///     .await?;
/// assert_eq!(found.len(), 1);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait Collection: Send + Sync {
	/// Collection name, used for logging
	fn name(&self) -> &str;

	/// Find documents matching `filter`, ordered and limited per `options`
	async fn find_many(&self, filter: Document, options: FindOptions) -> DriverResult<Vec<Document>>;

	/// Count documents matching `filter`
	async fn count(&self, filter: Document) -> DriverResult<u64>;

	/// Run an aggregation pipeline
	async fn aggregate(&self, pipeline: Vec<Document>) -> DriverResult<Vec<Document>>;

	/// Run a relevance-scored text query, returning `(document, score)` pairs
	async fn text_search(
		&self,
		query: &str,
		filter: Document,
		options: TextSearchOptions,
	) -> DriverResult<Vec<(Document, Bson)>>;

	/// Count documents matching both the text query and `filter`
	async fn count_text_matches(&self, query: &str, filter: Document) -> DriverResult<u64>;
}
