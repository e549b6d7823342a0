//! Pagination engines
//!
//! - [`Paginator`]: keyset pagination over `find`
//! - [`SearchPaginator`]: keyset pagination over relevance-scored text search
//! - [`AggregatePaginator`]: keyset pagination appended to an aggregation pipeline
//!
//! All three share the same page assembly: fetch `limit + 1` rows in sort
//! order (reversed when paging backward), trim to `limit`, derive the
//! navigation flags from the extra row and whether a cursor was supplied,
//! and encode cursors from the first and last items. The optional total
//! count runs concurrently with the page query, and a failure of either
//! fails the request.

mod aggregate;
mod find;
mod projection;
mod search;

pub use aggregate::{APPEND_SAFE_STAGES, AggregatePaginator};
pub use find::Paginator;
pub use search::SearchPaginator;

use bson::Document;

use seekpage_core::cursor::{Cursor, CursorCodec, SeekKey};
use seekpage_core::document::remove_path;
use seekpage_core::exception::Result;
use seekpage_core::page::PageResult;
use seekpage_core::request::{AggregateRequest, PageDirection, PageRequest, SearchRequest};
use seekpage_core::settings::PaginationSettings;
use seekpage_core::sort::SortSpec;

use crate::collection::Collection;

/// Settings and cursor codec shared by the engines
#[derive(Debug, Clone)]
pub(crate) struct EngineCore {
	settings: PaginationSettings,
	codec: CursorCodec,
}

impl EngineCore {
	pub(crate) fn new(settings: PaginationSettings) -> Self {
		let codec = match settings.cursor_secret.as_deref() {
			Some(secret) => CursorCodec::with_secret_key(secret.as_bytes()),
			None => CursorCodec::new(),
		};
		Self { settings, codec }
	}

	pub(crate) fn settings(&self) -> &PaginationSettings {
		&self.settings
	}

	/// Decode and verify the request cursor against `sort`
	fn seek_key(&self, cursor: Option<&Cursor>, sort: &SortSpec) -> Result<Option<SeekKey>> {
		cursor.map(|c| self.codec.decode_for(c, sort)).transpose()
	}

	/// Turn `limit + 1` raw rows into a page.
	///
	/// Rows fetched for a backward page arrive in reversed sort order and are
	/// restored to the requested order here. `added` lists projection paths
	/// the engine forced in to read seek keys; they are removed from the items
	/// after the cursors are built.
	fn assemble(&self, raw: Vec<Document>, page: PageShape<'_>, added: &[String]) -> Result<PageResult<Document>> {
		let PageShape {
			limit,
			sort,
			direction,
			had_cursor,
			total_count,
		} = page;

		let has_more = raw.len() > limit;
		let mut items = raw;
		items.truncate(limit);
		if direction == PageDirection::Backward {
			items.reverse();
		}

		let (mut has_next_page, mut has_prev_page) = match direction {
			PageDirection::Forward => (has_more, had_cursor),
			PageDirection::Backward => (had_cursor, has_more),
		};
		if items.is_empty() {
			has_next_page = false;
			has_prev_page = false;
		}

		let fingerprint = sort.fingerprint();
		let next_cursor = match items.last() {
			Some(last) if has_next_page => {
				Some(self.codec.encode(&SeekKey::from_document(last, sort), &fingerprint)?)
			}
			_ => None,
		};
		let prev_cursor = match items.first() {
			Some(first) if has_prev_page => {
				Some(self.codec.encode(&SeekKey::from_document(first, sort), &fingerprint)?)
			}
			_ => None,
		};

		for item in &mut items {
			for path in added {
				remove_path(item, path);
			}
		}

		Ok(PageResult {
			items,
			has_next_page,
			has_prev_page,
			next_cursor,
			prev_cursor,
			total_count,
		})
	}
}

impl Default for EngineCore {
	fn default() -> Self {
		Self::new(PaginationSettings::default())
	}
}

/// Everything page assembly needs besides the rows
#[derive(Debug, Clone, Copy)]
struct PageShape<'a> {
	limit: usize,
	sort: &'a SortSpec,
	direction: PageDirection,
	had_cursor: bool,
	total_count: Option<u64>,
}

/// Order in which rows are fetched for `direction`
fn fetch_order(sort: &SortSpec, direction: PageDirection) -> Document {
	match direction {
		PageDirection::Forward => sort.to_document(),
		PageDirection::Backward => sort.reversed().to_document(),
	}
}

/// Row count requested from the backend: one more than the page size
fn fetch_limit(limit: usize) -> i64 {
	i64::try_from(limit).map_or(i64::MAX, |l| l.saturating_add(1))
}

/// Fetch one page of `find` results with default settings
///
/// # Example
///
/// ```rust
/// use bson::doc;
/// use seekpage_core::request::PageRequest;
/// use seekpage_db::backends::memory::MemoryCollection;
/// use seekpage_db::engine::find;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let scores = MemoryCollection::with_documents("scores", vec![
///     doc! { "_id": 1, "score": 90 },
///     doc! { "_id": 2, "score": 90 },
///     doc! { "_id": 3, "score": 80 },
/// ]);
///
/// let first = find(&scores, PageRequest::new().ordering(&["-score"]).limit(2)).await?;
/// assert!(first.has_next_page);
///
/// let cursor = first.next_cursor.clone().unwrap();
/// let second = find(&scores, PageRequest::new().ordering(&["-score"]).limit(2).after(cursor)).await?;
/// assert_eq!(second.items, vec![doc! { "_id": 3, "score": 80 }]);
/// # Ok(())
/// # }
/// ```
pub async fn find(collection: &dyn Collection, request: PageRequest) -> Result<PageResult<Document>> {
	Paginator::default().find(collection, request).await
}

/// Fetch one page of text-search results with default settings
pub async fn search(collection: &dyn Collection, request: SearchRequest) -> Result<PageResult<Document>> {
	SearchPaginator::default().search(collection, request).await
}

/// Fetch one page of aggregation results with default settings
pub async fn aggregate(collection: &dyn Collection, request: AggregateRequest) -> Result<PageResult<Document>> {
	AggregatePaginator::default().aggregate(collection, request).await
}

#[cfg(test)]
mod tests {
	use super::*;
	use bson::doc;
	use rstest::rstest;
	use seekpage_core::sort::SortField;

	fn spec() -> SortSpec {
		SortSpec::resolve(vec![SortField::desc("score")], "_id").unwrap()
	}

	fn shape(sort: &SortSpec, direction: PageDirection, had_cursor: bool) -> PageShape<'_> {
		PageShape {
			limit: 2,
			sort,
			direction,
			had_cursor,
			total_count: None,
		}
	}

	#[rstest]
	#[case(PageDirection::Forward, false, 3, true, false)]
	#[case(PageDirection::Forward, true, 2, false, true)]
	#[case(PageDirection::Backward, true, 3, true, true)]
	#[case(PageDirection::Backward, false, 2, false, false)]
	fn test_assemble_flags(
		#[case] direction: PageDirection,
		#[case] had_cursor: bool,
		#[case] rows: i32,
		#[case] has_next: bool,
		#[case] has_prev: bool,
	) {
		// Arrange
		let sort = spec();
		let raw = (1..=rows).map(|id| doc! { "_id": id, "score": 10 - id }).collect();

		// Act
		let page = EngineCore::default()
			.assemble(raw, shape(&sort, direction, had_cursor), &[])
			.unwrap();

		// Assert
		assert_eq!(page.items.len(), 2);
		assert_eq!(page.has_next_page, has_next);
		assert_eq!(page.has_prev_page, has_prev);
		assert_eq!(page.next_cursor.is_some(), has_next);
		assert_eq!(page.prev_cursor.is_some(), has_prev);
	}

	#[rstest]
	fn test_assemble_restores_backward_order() {
		let sort = spec();
		// Fetched in reversed order: ascending score
		let raw = vec![
			doc! { "_id": 3, "score": 1 },
			doc! { "_id": 2, "score": 2 },
			doc! { "_id": 1, "score": 3 },
		];
		let page = EngineCore::default()
			.assemble(raw, shape(&sort, PageDirection::Backward, true), &[])
			.unwrap();
		let ids: Vec<i32> = page.items.iter().map(|d| d.get_i32("_id").unwrap()).collect();
		assert_eq!(ids, vec![2, 3]);
	}

	#[rstest]
	fn test_assemble_empty_page_has_no_navigation() {
		let sort = spec();
		let page = EngineCore::default()
			.assemble(Vec::new(), shape(&sort, PageDirection::Forward, true), &[])
			.unwrap();
		assert!(page.is_empty());
		assert!(!page.has_next_page && !page.has_prev_page);
		assert!(page.next_cursor.is_none() && page.prev_cursor.is_none());
	}

	#[rstest]
	fn test_assemble_strips_added_fields_after_cursors() {
		// Arrange
		let sort = spec();
		let core = EngineCore::default();
		let raw = vec![
			doc! { "_id": 1, "score": 9, "title": "a" },
			doc! { "_id": 2, "score": 8, "title": "b" },
			doc! { "_id": 3, "score": 7, "title": "c" },
		];

		// Act
		let page = core
			.assemble(raw, shape(&sort, PageDirection::Forward, false), &["score".to_string()])
			.unwrap();

		// Assert
		assert_eq!(page.items[1], doc! { "_id": 2, "title": "b" });
		let key = core.codec.decode_for(page.next_cursor.as_ref().unwrap(), &sort).unwrap();
		assert_eq!(key.values(), &[bson::Bson::Int32(8), bson::Bson::Int32(2)]);
	}

	#[rstest]
	fn test_signed_codec_from_settings() {
		let core = EngineCore::new(PaginationSettings::new().with_cursor_secret("k".repeat(32)));
		assert!(core.codec.is_signed());
		assert!(!EngineCore::default().codec.is_signed());
	}

	#[rstest]
	#[case(1, 2)]
	#[case(300, 301)]
	fn test_fetch_limit(#[case] limit: usize, #[case] expected: i64) {
		assert_eq!(fetch_limit(limit), expected);
	}
}
