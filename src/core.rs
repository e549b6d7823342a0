//! Backend-agnostic pagination types.
//!
//! Sort resolution, cursor encoding, keyset predicates, requests, pages,
//! settings and the error taxonomy.
//!
//! # Examples
//!
//! ```rust
//! use seekpage::core::sort::{SortField, SortSpec};
//!
//! let spec = SortSpec::resolve(vec![SortField::desc("score")], "_id").unwrap();
//! assert_eq!(spec.fields().len(), 2);
//! ```

pub use seekpage_core::*;
