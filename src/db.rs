//! Pagination engines, the collection capability and its backends.

pub use seekpage_db::*;
