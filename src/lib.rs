//! # Seekpage
//!
//! Keyset (cursor) pagination over document collections.
//!
//! Seekpage pages through a collection by remembering the sort-key values of
//! the last item it returned instead of counting skipped rows. Pages stay
//! stable when documents are inserted or removed between requests, and every
//! page costs the same no matter how deep the caller has walked.
//!
//! Three entry points share one cursor format:
//!
//! - **find**: filtered, sorted listing of a collection
//! - **search**: full-text search ordered by relevance
//! - **aggregate**: paging over the output of a caller-supplied pipeline
//!
//! ## Feature Flags
//!
//! - `mongodb` - MongoDB driver backend
//! - `full` - All features enabled
//!
//! ## Quick Example
//!
//! ```rust
//! use bson::doc;
//! use seekpage::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let posts = MemoryCollection::new("posts");
//! for (i, likes) in [3, 9, 3, 7].into_iter().enumerate() {
//!     posts.insert_one(doc! { "_id": i as i32, "likes": likes });
//! }
//!
//! let posts = PaginatedCollection::new(Arc::new(posts));
//! let request = PageRequest::new().sort(vec![SortField::desc("likes")]).limit(3);
//!
//! let first = posts.paginate(request.clone()).await?;
//! assert_eq!(first.items[0].get_i32("likes")?, 9);
//! assert!(first.has_next_page);
//!
//! let second = posts.paginate(request.after(first.next_cursor.unwrap())).await?;
//! assert_eq!(second.items, vec![doc! { "_id": 2, "likes": 3 }]);
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod db;

// Re-export core types
pub use seekpage_core::{
	AggregateRequest, ConfigError, Cursor, CursorCodec, DriverError, DriverResult, PageDirection,
	PageRequest, PageResult, PaginationError, PaginationSettings, Result, SearchRequest,
	SortDirection, SortField, SortSpec,
};

// Re-export engines and collections
pub use seekpage_db::{
	AggregatePaginator, Collection, FindOptions, MemoryCollection, PaginatedCollection, Paginator,
	SearchPaginator, TextSearchOptions, aggregate, find, search,
};

#[cfg(feature = "mongodb")]
pub use seekpage_db::{MongoCollection, MongoCollectionBuilder};

/// Commonly used types for building paginated endpoints
pub mod prelude {
	pub use crate::{
		AggregateRequest, Collection, Cursor, MemoryCollection, PageDirection, PageRequest,
		PageResult, PaginatedCollection, PaginationError, PaginationSettings, SearchRequest,
		SortField,
	};

	#[cfg(feature = "mongodb")]
	pub use crate::MongoCollection;
}
