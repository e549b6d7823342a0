//! Page results

use bson::Document;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::cursor::Cursor;
use crate::exception::Result;

/// One page of items plus navigation metadata
///
/// `items.len()` never exceeds the request limit, and each cursor is present
/// exactly when the matching `has_*_page` flag is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult<T> {
	pub items: Vec<T>,
	pub has_next_page: bool,
	pub has_prev_page: bool,
	pub next_cursor: Option<Cursor>,
	pub prev_cursor: Option<Cursor>,
	/// Number of items matching the filter, when requested
	pub total_count: Option<u64>,
}

impl<T> PageResult<T> {
	/// An empty page with no navigation
	///
	/// # Examples
	///
	/// ```
	/// use seekpage_core::page::PageResult;
	///
	/// let page: PageResult<i32> = PageResult::empty();
	/// assert!(page.items.is_empty());
	/// assert!(!page.has_next_page && !page.has_prev_page);
	/// ```
	pub fn empty() -> Self {
		Self {
			items: Vec::new(),
			has_next_page: false,
			has_prev_page: false,
			next_cursor: None,
			prev_cursor: None,
			total_count: None,
		}
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	/// Map every item, keeping the navigation metadata
	pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResult<U> {
		PageResult {
			items: self.items.into_iter().map(f).collect(),
			has_next_page: self.has_next_page,
			has_prev_page: self.has_prev_page,
			next_cursor: self.next_cursor,
			prev_cursor: self.prev_cursor,
			total_count: self.total_count,
		}
	}
}

impl PageResult<Document> {
	/// Deserialize every document into `T`
	///
	/// # Examples
	///
	/// ```
	/// use bson::doc;
	/// use serde::Deserialize;
	/// use seekpage_core::page::PageResult;
	///
	/// #[derive(Deserialize)]
	/// struct Item { name: String }
	///
	/// let mut page = PageResult::empty();
	/// page.items.push(doc! { "_id": 1, "name": "a" });
	/// let typed = page.into_typed::<Item>().unwrap();
	/// assert_eq!(typed.items[0].name, "a");
	/// ```
	pub fn into_typed<T: DeserializeOwned>(self) -> Result<PageResult<T>> {
		let items = self
			.items
			.into_iter()
			.map(bson::deserialize_from_document::<T>)
			.collect::<std::result::Result<Vec<T>, _>>()?;
		Ok(PageResult {
			items,
			has_next_page: self.has_next_page,
			has_prev_page: self.has_prev_page,
			next_cursor: self.next_cursor,
			prev_cursor: self.prev_cursor,
			total_count: self.total_count,
		})
	}
}
