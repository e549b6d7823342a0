//! Collection-bound entry points
//!
//! [`PaginatedCollection`] pairs a collection handle with the three engines,
//! the way a model layer exposes `paginate`, `search` and `aggregate` on a
//! collection. A binding created without a collection fails every call with
//! [`PaginationError::CollectionNotBound`] before any I/O.

use bson::Document;
use std::sync::Arc;

use seekpage_core::exception::{PaginationError, Result};
use seekpage_core::page::PageResult;
use seekpage_core::request::{AggregateRequest, PageRequest, SearchRequest};
use seekpage_core::settings::PaginationSettings;

use crate::collection::Collection;
use crate::engine::{AggregatePaginator, Paginator, SearchPaginator};

/// A collection with pagination entry points
///
/// # Example
///
/// ```rust
/// use bson::doc;
/// use std::sync::Arc;
/// use seekpage_core::request::{PageRequest, SearchRequest};
/// use seekpage_db::backends::memory::MemoryCollection;
/// use seekpage_db::binding::PaginatedCollection;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let posts = MemoryCollection::new("posts");
/// posts.insert_one(doc! { "_id": 1, "body": "hello world" });
///
/// let posts = PaginatedCollection::new(Arc::new(posts));
/// let page = posts.search(SearchRequest::new("hello")).await?;
/// assert_eq!(page.items.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct PaginatedCollection {
	collection: Option<Arc<dyn Collection>>,
	paginator: Paginator,
	searcher: SearchPaginator,
	aggregator: AggregatePaginator,
}

impl PaginatedCollection {
	/// Bind `collection` with default settings
	pub fn new(collection: Arc<dyn Collection>) -> Self {
		Self::unbound().bind(collection)
	}

	/// A binding with no collection yet
	pub fn unbound() -> Self {
		Self::default()
	}

	/// Replace the engines' settings
	pub fn with_settings(mut self, settings: PaginationSettings) -> Self {
		self.paginator = Paginator::new(settings.clone());
		self.searcher = SearchPaginator::new(settings.clone());
		self.aggregator = AggregatePaginator::new(settings);
		self
	}

	pub fn bind(mut self, collection: Arc<dyn Collection>) -> Self {
		self.collection = Some(collection);
		self
	}

	pub fn is_bound(&self) -> bool {
		self.collection.is_some()
	}

	pub fn settings(&self) -> &PaginationSettings {
		self.paginator.settings()
	}

	fn collection(&self) -> Result<&dyn Collection> {
		self.collection.as_deref().ok_or(PaginationError::CollectionNotBound)
	}

	/// Keyset page over `find`
	pub async fn paginate(&self, request: PageRequest) -> Result<PageResult<Document>> {
		let collection = self.collection()?;
		self.paginator.find(collection, request).await
	}

	/// Keyset page over text-search results
	pub async fn search(&self, request: SearchRequest) -> Result<PageResult<Document>> {
		let collection = self.collection()?;
		self.searcher.search(collection, request).await
	}

	/// Keyset page over an aggregation pipeline
	pub async fn aggregate(&self, request: AggregateRequest) -> Result<PageResult<Document>> {
		let collection = self.collection()?;
		self.aggregator.aggregate(collection, request).await
	}
}

impl std::fmt::Debug for PaginatedCollection {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PaginatedCollection")
			.field("collection", &self.collection.as_ref().map(|c| c.name().to_string()))
			.field("settings", self.settings())
			.finish()
	}
}
