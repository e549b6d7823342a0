//! Keyset pagination over `find`

use bson::Document;
use tracing::debug;

use seekpage_core::exception::Result;
use seekpage_core::page::PageResult;
use seekpage_core::predicate;
use seekpage_core::request::PageRequest;
use seekpage_core::settings::PaginationSettings;
use seekpage_core::sort::SortSpec;

use super::projection::force_sort_fields;
use super::{EngineCore, PageShape, fetch_limit, fetch_order};
use crate::collection::{Collection, FindOptions};

/// Pages through a collection with a compound keyset predicate
///
/// # Example
///
/// ```rust
/// use bson::doc;
/// use seekpage_core::request::PageRequest;
/// use seekpage_core::settings::PaginationSettings;
/// use seekpage_db::backends::memory::MemoryCollection;
/// use seekpage_db::engine::Paginator;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let users = MemoryCollection::with_documents("users", vec![
///     doc! { "_id": 1, "name": "ann" },
///     doc! { "_id": 2, "name": "bob" },
/// ]);
/// let paginator = Paginator::new(PaginationSettings::new().with_default_limit(1));
///
/// let page = paginator.find(&users, PageRequest::new().ordering(&["name"])).await?;
/// assert_eq!(page.items.len(), 1);
/// assert!(page.has_next_page);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Paginator {
	core: EngineCore,
}

impl Paginator {
	pub fn new(settings: PaginationSettings) -> Self {
		Self {
			core: EngineCore::new(settings),
		}
	}

	pub fn settings(&self) -> &PaginationSettings {
		self.core.settings()
	}

	/// Fetch one page.
	///
	/// Validation (limit, sort, cursor) completes before the collection is
	/// touched. With `include_total_count` the count over the caller's filter
	/// runs concurrently with the page query.
	pub async fn find(&self, collection: &dyn Collection, request: PageRequest) -> Result<PageResult<Document>> {
		let settings = self.core.settings();
		let limit = settings.effective_limit(request.limit)?;
		let sort = SortSpec::resolve(request.sort, &settings.unique_key)?;
		let seek_key = self.core.seek_key(request.cursor.as_ref(), &sort)?;
		let direction = request.direction;

		debug!(
			collection = collection.name(),
			limit,
			?direction,
			has_cursor = seek_key.is_some(),
			sort = %sort,
			"find page"
		);

		let query = predicate::build(&request.filter, seek_key.as_ref(), &sort, direction);
		let (projection, added) = force_sort_fields(request.projection.as_ref(), &sort);
		let options = FindOptions::new()
			.sort(fetch_order(&sort, direction))
			.limit(fetch_limit(limit))
			.projection(projection);

		let filter = request.filter;
		let include_total_count = request.include_total_count;
		let total = async {
			if include_total_count {
				collection.count(filter).await.map(Some)
			} else {
				Ok(None)
			}
		};
		let (raw, total_count) = futures::try_join!(collection.find_many(query, options), total)?;

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
			"find page assembled"
		);
		Ok(page)
	}
}
