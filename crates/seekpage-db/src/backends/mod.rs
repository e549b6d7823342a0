//! Collection backends
//!
//! - [`memory`]: in-process collection, always available
//! - `mongodb`: MongoDB collection (feature `mongodb`)

pub mod memory;

#[cfg(feature = "mongodb")]
pub mod mongodb;

pub use memory::MemoryCollection;

#[cfg(feature = "mongodb")]
pub use mongodb::{MongoCollection, MongoCollectionBuilder};
