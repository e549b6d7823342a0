//! Keyset pagination over relevance-scored text search

use bson::Document;
use tracing::debug;

use seekpage_core::exception::{PaginationError, Result};
use seekpage_core::page::PageResult;
use seekpage_core::predicate;
use seekpage_core::request::SearchRequest;
use seekpage_core::settings::PaginationSettings;
use seekpage_core::sort::{SortField, SortSpec};

use super::projection::force_sort_fields;
use super::{EngineCore, PageShape, fetch_limit, fetch_order};
use crate::collection::{Collection, TextSearchOptions};

/// Pages through text-search results ordered by relevance
///
/// The relevance score is exposed on each document under the configured
/// `score_field` and treated as an ordinary descending sort value, so ties
/// fall through to the remaining sort fields and the unique key. A caller
/// sort that already names the score field is used as given.
#[derive(Debug, Clone, Default)]
pub struct SearchPaginator {
	core: EngineCore,
}

impl SearchPaginator {
	pub fn new(settings: PaginationSettings) -> Self {
		Self {
			core: EngineCore::new(settings),
		}
	}

	pub fn settings(&self) -> &PaginationSettings {
		self.core.settings()
	}

	/// Sort fields with the relevance score leading, unless already placed
	fn scored_sort(&self, user_sort: Vec<SortField>) -> Result<SortSpec> {
		let settings = self.core.settings();
		let score_field = settings.score_field.as_str();
		let fields = if user_sort.iter().any(|f| f.field == score_field) {
			user_sort
		} else {
			std::iter::once(SortField::desc(score_field)).chain(user_sort).collect()
		};
		SortSpec::resolve(fields, &settings.unique_key)
	}

	/// Fetch one page of matches for `request.query`.
	///
	/// An empty or whitespace-only query fails with `EmptySearchString`
	/// before the collection is touched.
	pub async fn search(&self, collection: &dyn Collection, request: SearchRequest) -> Result<PageResult<Document>> {
		let query = request.query.trim();
		if query.is_empty() {
			return Err(PaginationError::EmptySearchString);
		}
		let page = request.page;
		let settings = self.core.settings();
		let limit = settings.effective_limit(page.limit)?;
		let sort = self.scored_sort(page.sort)?;
		let seek_key = self.core.seek_key(page.cursor.as_ref(), &sort)?;
		let direction = page.direction;

		debug!(
			collection = collection.name(),
			limit,
			?direction,
			has_cursor = seek_key.is_some(),
			sort = %sort,
			"search page"
		);

		let filter = predicate::build(&page.filter, seek_key.as_ref(), &sort, direction);
		let (projection, added) = force_sort_fields(page.projection.as_ref(), &sort);
		let options = TextSearchOptions::new(settings.score_field.clone())
			.sort(fetch_order(&sort, direction))
			.limit(fetch_limit(limit))
			.projection(projection);

		let count_filter = page.filter;
		let include_total_count = page.include_total_count;
		let total = async {
			if include_total_count {
				collection.count_text_matches(query, count_filter).await.map(Some)
			} else {
				Ok(None)
			}
		};
		let (scored, total_count) = futures::try_join!(collection.text_search(query, filter, options), total)?;
		let raw = scored.into_iter().map(|(doc, _score)| doc).collect();

		let page = self.core.assemble(
			raw,
			PageShape {
				limit,
				sort: &sort,
				direction,
				had_cursor: seek_key.is_some(),
				total_count,
			},
			&added,
		)?;

		debug!(
			collection = collection.name(),
			items = page.len(),
			has_next_page = page.has_next_page,
			has_prev_page = page.has_prev_page,
			"search page assembled"
		);
		Ok(page)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::backends::memory::MemoryCollection;
	use bson::doc;
	use rstest::{fixture, rstest};
	use seekpage_core::request::PageRequest;

	#[fixture]
	fn posts() -> MemoryCollection {
		MemoryCollection::with_documents(
			"posts",
			vec![
				doc! { "_id": 1, "body": "rust rust rust" },
				doc! { "_id": 2, "body": "rust" },
				doc! { "_id": 3, "body": "rust rust" },
				doc! { "_id": 4, "body": "go" },
				doc! { "_id": 5, "body": "rust" },
			],
		)
	}

	#[rstest]
	fn test_score_leads_implicitly() {
		let sort = SearchPaginator::default()
			.scored_sort(vec![SortField::asc("title")])
			.unwrap();
		assert_eq!(
			sort.fields(),
			&[SortField::desc("_score"), SortField::asc("title"), SortField::asc("_id")]
		);
	}

	#[rstest]
	fn test_explicit_score_position_is_kept() {
		let sort = SearchPaginator::default()
			.scored_sort(vec![SortField::asc("title"), SortField::asc("_score")])
			.unwrap();
		assert_eq!(
			sort.fields(),
			&[SortField::asc("title"), SortField::asc("_score"), SortField::asc("_id")]
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_pages_by_relevance_then_id(posts: MemoryCollection) {
		// Arrange
		let searcher = SearchPaginator::default();
		let request = |page: PageRequest| SearchRequest::new("Rust").page(page);

		// Act
		let first = searcher
			.search(&posts, request(PageRequest::new().limit(2).include_total_count(true)))
			.await
			.unwrap();
		let second = searcher
			.search(
				&posts,
				request(PageRequest::new().limit(2).after(first.next_cursor.clone().unwrap())),
			)
			.await
			.unwrap();

		// Assert
		let ids = |page: &PageResult<Document>| -> Vec<i32> {
			page.items.iter().map(|d| d.get_i32("_id").unwrap()).collect()
		};
		assert_eq!(ids(&first), vec![1, 3]);
		assert_eq!(first.total_count, Some(4));
		assert_eq!(ids(&second), vec![2, 5]);
		assert!(!second.has_next_page);
		assert_eq!(second.items[0].get_f64("_score").unwrap(), 1.0);
	}

	#[rstest]
	#[case("")]
	#[case("   \t")]
	#[tokio::test]
	async fn test_empty_query_is_rejected(posts: MemoryCollection, #[case] query: &str) {
		let result = SearchPaginator::default()
			.search(&posts, SearchRequest::new(query))
			.await;
		assert!(matches!(result, Err(PaginationError::EmptySearchString)));
	}
}
