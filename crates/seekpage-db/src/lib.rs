//! # Seekpage DB
//!
//! Keyset pagination engines over an asynchronous document [`Collection`].
//!
//! ## Modules
//!
//! - **collection**: the [`Collection`] capability the engines consume
//! - **backends**: in-memory collection and, with the `mongodb` feature, a
//!   MongoDB collection
//! - **engine**: [`Paginator`] (`find`), [`SearchPaginator`] (`search`) and
//!   [`AggregatePaginator`] (`aggregate`)
//! - **binding**: [`PaginatedCollection`], a collection handle with the
//!   three entry points attached
//!
//! ## Example
//!
//! ```rust
//! use bson::doc;
//! use seekpage_core::request::PageRequest;
//! use seekpage_db::backends::memory::MemoryCollection;
//! use seekpage_db::engine::Paginator;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let events = MemoryCollection::new("events");
//! for i in 0..10 {
//!     events.insert_one(doc! { "_id": i, "kind": "click" });
//! }
//!
//! let paginator = Paginator::default();
//! let mut request = PageRequest::new().filter(doc! { "kind": "click" }).limit(4);
//! let mut seen = 0;
//! loop {
//!     let page = paginator.find(&events, request.clone()).await?;
//!     seen += page.len();
//!     match page.next_cursor {
//!         Some(cursor) => request = request.after(cursor),
//!         None => break,
//!     }
//! }
//! assert_eq!(seen, 10);
//! # Ok(())
//! # }
//! ```
//!
//! [`Collection`]: collection::Collection
//! [`Paginator`]: engine::Paginator
//! [`SearchPaginator`]: engine::SearchPaginator
//! [`AggregatePaginator`]: engine::AggregatePaginator
//! [`PaginatedCollection`]: binding::PaginatedCollection

pub mod backends;
pub mod binding;
pub mod collection;
pub mod engine;

pub use backends::MemoryCollection;
pub use binding::PaginatedCollection;
pub use collection::{Collection, FindOptions, TextSearchOptions};
pub use engine::{AggregatePaginator, Paginator, SearchPaginator, aggregate, find, search};

#[cfg(feature = "mongodb")]
pub use backends::{MongoCollection, MongoCollectionBuilder};
