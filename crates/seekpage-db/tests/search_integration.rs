//! Search Pagination Integration Tests
//!
//! - Relevance ordering with ties falling through to the unique key
//! - Caller sort fields after the implicit score
//! - Empty queries rejected before I/O
//! - Count failures propagated

mod common;

use bson::{Document, doc};
use rstest::*;

use common::{Fault, ProbeCollection, ids};
use seekpage_core::exception::{DriverError, PaginationError};
use seekpage_core::request::{PageRequest, SearchRequest};
use seekpage_core::settings::PaginationSettings;
use seekpage_core::sort::SortField;
use seekpage_db::binding::PaginatedCollection;
use seekpage_db::engine::SearchPaginator;
use std::sync::Arc;

#[fixture]
fn articles() -> Vec<Document> {
	vec![
		doc! { "_id": 1, "title": "Keyset paging", "body": "paging with keyset cursors", "year": 2021 },
		doc! { "_id": 2, "title": "Offset paging", "body": "skip and limit", "year": 2019 },
		doc! { "_id": 3, "title": "Cursors", "body": "opaque cursor tokens for paging", "year": 2023 },
		doc! { "_id": 4, "title": "Gardening", "body": "tomatoes", "year": 2020 },
		doc! { "_id": 5, "title": "Paging again", "body": "more keyset paging", "year": 2022 },
	]
}

fn search(query: &str, page: PageRequest) -> SearchRequest {
	SearchRequest::new(query).page(page)
}

#[rstest]
#[tokio::test]
async fn test_relevance_then_id_across_pages(articles: Vec<Document>) {
	// Arrange
	let collection = ProbeCollection::new(articles);
	let searcher = SearchPaginator::default();

	// Act
	let first = searcher
		.search(&collection, search("keyset paging", PageRequest::new().limit(2).include_total_count(true)))
		.await
		.unwrap();
	let second = searcher
		.search(
			&collection,
			search("keyset paging", PageRequest::new().limit(2).after(first.next_cursor.clone().unwrap())),
		)
		.await
		.unwrap();

	// Assert
	// keyset paging: #1 scores 4, #5 scores 3, #2 and #3 score 1
	assert_eq!(ids(&first.items), vec![1, 5]);
	assert_eq!(first.total_count, Some(4));
	assert_eq!(ids(&second.items), vec![2, 3]);
	assert!(!second.has_next_page);
	assert!(second.has_prev_page);
}

#[rstest]
#[tokio::test]
async fn test_caller_sort_breaks_score_ties(articles: Vec<Document>) {
	let collection = ProbeCollection::new(articles);
	let page = SearchPaginator::default()
		.search(
			&collection,
			search("paging", PageRequest::new().sort(vec![SortField::desc("year")]).limit(10)),
		)
		.await
		.unwrap();
	// #1 and #5 both score 2, #2 and #3 score 1; newer first within a score
	assert_eq!(ids(&page.items), vec![5, 1, 3, 2]);
}

#[rstest]
#[tokio::test]
async fn test_backward_search_page(articles: Vec<Document>) {
	// Arrange
	let collection = ProbeCollection::new(articles);
	let searcher = SearchPaginator::default();
	let page = |p: PageRequest| search("paging", p.limit(2));
	let first = searcher.search(&collection, page(PageRequest::new())).await.unwrap();
	let second = searcher
		.search(&collection, page(PageRequest::new().after(first.next_cursor.clone().unwrap())))
		.await
		.unwrap();

	// Act
	let back = searcher
		.search(&collection, page(PageRequest::new().before(second.prev_cursor.clone().unwrap())))
		.await
		.unwrap();

	// Assert
	assert_eq!(back.items, first.items);
	assert!(back.has_next_page);
}

#[rstest]
#[tokio::test]
async fn test_custom_score_field_is_exposed(articles: Vec<Document>) {
	let binding = PaginatedCollection::new(Arc::new(ProbeCollection::new(articles)))
		.with_settings(PaginationSettings::new().with_score_field("relevance"));
	let page = binding
		.search(search("tomatoes", PageRequest::new()))
		.await
		.unwrap();
	assert_eq!(page.items.len(), 1);
	assert_eq!(page.items[0].get_f64("relevance").unwrap(), 1.0);
	assert!(page.items[0].get("_score").is_none());
}

#[rstest]
#[tokio::test]
async fn test_projection_hides_forced_score(articles: Vec<Document>) {
	let collection = ProbeCollection::new(articles);
	let page = SearchPaginator::default()
		.search(
			&collection,
			search("cursors", PageRequest::new().projection(doc! { "title": 1 })),
		)
		.await
		.unwrap();
	assert_eq!(
		page.items,
		vec![
			doc! { "_id": 1, "title": "Keyset paging" },
			doc! { "_id": 3, "title": "Cursors" },
		]
	);
}

#[rstest]
#[case("")]
#[case("  \n ")]
#[tokio::test]
async fn test_empty_search_string_skips_backend(articles: Vec<Document>, #[case] query: &str) {
	// Arrange
	let collection = ProbeCollection::new(articles);

	// Act
	let result = SearchPaginator::default()
		.search(&collection, SearchRequest::new(query))
		.await;

	// Assert
	assert!(matches!(result, Err(PaginationError::EmptySearchString)));
	assert_eq!(collection.calls(), 0);
}

#[rstest]
#[tokio::test]
async fn test_text_count_failure_fails_request(articles: Vec<Document>) {
	let collection = ProbeCollection::new(articles).failing(Fault::Count, DriverError::Cancelled);
	let result = SearchPaginator::default()
		.search(&collection, search("paging", PageRequest::new().include_total_count(true)))
		.await;
	assert!(matches!(
		result,
		Err(PaginationError::Backend(DriverError::Cancelled(_)))
	));
}
