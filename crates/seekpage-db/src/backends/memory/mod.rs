//! In-memory document collection
//!
//! [`MemoryCollection`] evaluates the subset of the MongoDB query language
//! the pagination engines emit, plus the common aggregation stages. It is
//! intended for tests and small embedded datasets.
//!
//! # Example
//!
//! ```rust
//! use bson::doc;
//! use seekpage_db::backends::memory::MemoryCollection;
//! use seekpage_db::collection::Collection;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let articles = MemoryCollection::new("articles");
//! articles.insert_many(vec![
//!     doc! { "_id": 1, "body": "rust keyset paging" },
//!     doc! { "_id": 2, "body": "offset paging" },
//! ]);
//!
//! assert_eq!(articles.count_text_matches("keyset", doc! {}).await?, 1);
//! # Ok(())
//! # }
//! ```

mod compare;
mod matcher;
mod pipeline;

pub use compare::{bson_eq, compare_bson};
pub use matcher::matches;
pub use pipeline::{evaluate, execute, project, sort_documents};

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{Bson, Document};
use parking_lot::RwLock;
use std::collections::HashSet;

use seekpage_core::exception::DriverResult;

use crate::collection::{Collection, FindOptions, TextSearchOptions};

/// Thread-safe in-memory collection
///
/// Documents keep their insertion order, which is the natural order seen by
/// queries without a sort.
pub struct MemoryCollection {
	name: String,
	documents: RwLock<Vec<Document>>,
}

impl MemoryCollection {
	/// Create an empty collection
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			documents: RwLock::new(Vec::new()),
		}
	}

	/// Create a collection seeded with `documents`
	pub fn with_documents(name: impl Into<String>, documents: Vec<Document>) -> Self {
		let collection = Self::new(name);
		collection.insert_many(documents);
		collection
	}

	/// Insert a document, assigning an `ObjectId` when `_id` is absent.
	///
	/// Returns the document's `_id`.
	pub fn insert_one(&self, mut document: Document) -> Bson {
		if !document.contains_key("_id") {
			document.insert("_id", ObjectId::new());
		}
		let id = document.get("_id").cloned().unwrap_or(Bson::Null);
		self.documents.write().push(document);
		id
	}

	/// Insert several documents, returning their `_id`s in order
	pub fn insert_many(&self, documents: Vec<Document>) -> Vec<Bson> {
		documents.into_iter().map(|doc| self.insert_one(doc)).collect()
	}

	/// Number of stored documents
	pub fn len(&self) -> usize {
		self.documents.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.documents.read().is_empty()
	}

	fn snapshot(&self) -> Vec<Document> {
		self.documents.read().clone()
	}

	fn filtered(&self, filter: &Document) -> DriverResult<Vec<Document>> {
		let mut out = Vec::new();
		for doc in self.snapshot() {
			if matches(&doc, filter)? {
				out.push(doc);
			}
		}
		Ok(out)
	}

	/// Documents with a positive relevance for `query`, scored under `score_field`
	fn scored(&self, query: &str, score_field: &str, filter: &Document) -> DriverResult<Vec<Document>> {
		let terms = terms(query);
		let mut out = Vec::new();
		for mut doc in self.snapshot() {
			let score = text_score(&doc, &terms);
			if score == 0 {
				continue;
			}
			doc.insert(score_field, Bson::Double(score as f64));
			if matches(&doc, filter)? {
				out.push(doc);
			}
		}
		Ok(out)
	}
}

fn finish(mut docs: Vec<Document>, sort: &Document, limit: Option<i64>) -> Vec<Document> {
	if !sort.is_empty() {
		sort_documents(&mut docs, sort);
	}
	// A zero limit means no limit; negative limits behave like their magnitude
	if let Some(limit) = limit.filter(|l| *l != 0) {
		let limit = usize::try_from(limit.unsigned_abs()).unwrap_or(usize::MAX);
		docs.truncate(limit);
	}
	docs
}

fn project_all(docs: Vec<Document>, projection: Option<&Document>) -> DriverResult<Vec<Document>> {
	match projection {
		Some(projection) if !projection.is_empty() => {
			docs.iter().map(|doc| project(doc, projection)).collect()
		}
		_ => Ok(docs),
	}
}

/// Lowercased distinct words of a text query
fn terms(query: &str) -> HashSet<String> {
	words(query).collect()
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
	text.split(|c: char| !c.is_alphanumeric())
		.filter(|w| !w.is_empty())
		.map(str::to_lowercase)
}

/// Number of query-term occurrences across the string fields of `doc`
fn text_score(doc: &Document, terms: &HashSet<String>) -> usize {
	if terms.is_empty() {
		return 0;
	}
	doc.iter()
		.filter(|(key, _)| key.as_str() != "_id")
		.map(|(_, value)| value_score(value, terms))
		.sum()
}

fn value_score(value: &Bson, terms: &HashSet<String>) -> usize {
	match value {
		Bson::String(text) => words(text).filter(|w| terms.contains(w)).count(),
		Bson::Array(items) => items.iter().map(|item| value_score(item, terms)).sum(),
		Bson::Document(inner) => inner.iter().map(|(_, v)| value_score(v, terms)).sum(),
		_ => 0,
	}
}

#[async_trait]
impl Collection for MemoryCollection {
	fn name(&self) -> &str {
		&self.name
	}

	async fn find_many(&self, filter: Document, options: FindOptions) -> DriverResult<Vec<Document>> {
		let docs = finish(self.filtered(&filter)?, &options.sort, options.limit);
		project_all(docs, options.projection.as_ref())
	}

	async fn count(&self, filter: Document) -> DriverResult<u64> {
		Ok(self.filtered(&filter)?.len() as u64)
	}

	async fn aggregate(&self, pipeline: Vec<Document>) -> DriverResult<Vec<Document>> {
		execute(self.snapshot(), &pipeline)
	}

	async fn text_search(
		&self,
		query: &str,
		filter: Document,
		options: TextSearchOptions,
	) -> DriverResult<Vec<(Document, Bson)>> {
		let docs = self.scored(query, &options.score_field, &filter)?;
		let docs = finish(docs, &options.sort, options.limit);
		// Scores are read before projection, which may drop the score field
		let scores: Vec<Bson> = docs
			.iter()
			.map(|doc| doc.get(&options.score_field).cloned().unwrap_or(Bson::Null))
			.collect();
		let docs = project_all(docs, options.projection.as_ref())?;
		Ok(docs.into_iter().zip(scores).collect())
	}

	async fn count_text_matches(&self, query: &str, filter: Document) -> DriverResult<u64> {
		let terms = terms(query);
		let mut total = 0;
		for doc in self.snapshot() {
			if text_score(&doc, &terms) > 0 && matches(&doc, &filter)? {
				total += 1;
			}
		}
		Ok(total)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use bson::doc;
	use rstest::{fixture, rstest};
	use seekpage_core::exception::DriverError;

	#[fixture]
	fn articles() -> MemoryCollection {
		MemoryCollection::with_documents(
			"articles",
			vec![
				doc! { "_id": 1, "title": "Rust paging", "body": "keyset paging in rust" },
				doc! { "_id": 2, "title": "Offsets", "body": "offset paging is slow" },
				doc! { "_id": 3, "title": "Cooking", "body": "bread" },
			],
		)
	}

	#[rstest]
	fn test_insert_assigns_object_id() {
		let collection = MemoryCollection::new("c");
		let id = collection.insert_one(doc! { "a": 1 });
		assert!(matches!(id, Bson::ObjectId(_)));
		assert_eq!(collection.len(), 1);
	}

	#[rstest]
	#[tokio::test]
	async fn test_find_many_sort_limit_projection(articles: MemoryCollection) {
		// Act
		let found = articles
			.find_many(
				doc! { "_id": { "$gt": 1 } },
				FindOptions::new()
					.sort(doc! { "_id": -1 })
					.limit(1)
					.projection(Some(doc! { "title": 1 })),
			)
			.await
			.unwrap();

		// Assert
		assert_eq!(found, vec![doc! { "_id": 3, "title": "Cooking" }]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_text_search_scores_term_occurrences(articles: MemoryCollection) {
		// Arrange
		let options = TextSearchOptions::new("_score").sort(doc! { "_score": -1, "_id": 1 });

		// Act
		let results = articles.text_search("Rust paging", doc! {}, options).await.unwrap();

		// Assert
		let ranked: Vec<(i32, Bson)> = results
			.iter()
			.map(|(doc, score)| (doc.get_i32("_id").unwrap(), score.clone()))
			.collect();
		assert_eq!(ranked, vec![(1, Bson::Double(4.0)), (2, Bson::Double(1.0))]);
		assert_eq!(results[0].0.get_f64("_score").unwrap(), 4.0);
	}

	#[rstest]
	#[tokio::test]
	async fn test_text_search_filters_on_score(articles: MemoryCollection) {
		let results = articles
			.text_search(
				"paging",
				doc! { "_score": { "$lt": 2.0 } },
				TextSearchOptions::new("_score"),
			)
			.await
			.unwrap();
		assert_eq!(results.len(), 1);
		assert_eq!(results[0].0.get_i32("_id").unwrap(), 2);
	}

	#[rstest]
	#[tokio::test]
	async fn test_count_text_matches(articles: MemoryCollection) {
		assert_eq!(articles.count_text_matches("paging", doc! {}).await.unwrap(), 2);
		assert_eq!(articles.count_text_matches("", doc! {}).await.unwrap(), 0);
		assert_eq!(
			articles
				.count_text_matches("paging", doc! { "title": "Offsets" })
				.await
				.unwrap(),
			1
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_unsupported_filter_is_reported(articles: MemoryCollection) {
		let result = articles.count(doc! { "$where": "1" }).await;
		assert!(matches!(result, Err(DriverError::Unsupported(_))));
	}
}
