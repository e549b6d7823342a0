//! # Seekpage Core
//!
//! Backend-agnostic building blocks of keyset pagination.
//!
//! ## Modules
//!
//! - **sort**: resolves caller sort input into a [`SortSpec`] ending with a unique key
//! - **cursor**: encodes seek keys into opaque, URL-safe [`Cursor`] tokens
//! - **predicate**: turns a seek key into a keyset filter over a compound sort
//! - **request** / **page**: request parameters and page results
//! - **settings**: engine-wide limits, unique key and cursor signing
//! - **exception**: the error taxonomy shared by every engine
//!
//! Nothing in this crate performs I/O; see `seekpage-db` for the engines.
//!
//! [`SortSpec`]: sort::SortSpec
//! [`Cursor`]: cursor::Cursor

pub mod cursor;
pub mod document;
pub mod exception;
pub mod page;
pub mod predicate;
pub mod request;
pub mod settings;
pub mod sort;

pub use cursor::{Cursor, CursorCodec, SeekKey};
pub use exception::{ConfigError, DriverError, DriverResult, PaginationError, Result};
pub use page::PageResult;
pub use predicate::{CompareOp, Predicate};
pub use request::{AggregateRequest, PageDirection, PageRequest, SearchRequest};
pub use settings::PaginationSettings;
pub use sort::{Fingerprint, SortDirection, SortField, SortSpec};
