//! Keyset pagination appended to an aggregation pipeline

use bson::{Bson, Document, doc};
use tracing::debug;

use seekpage_core::document::root_field;
use seekpage_core::exception::{DriverError, PaginationError, Result};
use seekpage_core::page::PageResult;
use seekpage_core::predicate;
use seekpage_core::request::AggregateRequest;
use seekpage_core::settings::PaginationSettings;
use seekpage_core::sort::SortSpec;

use super::projection::is_exclusion;
use super::{EngineCore, PageShape, fetch_limit, fetch_order};
use crate::collection::Collection;

/// Stages after which keyset `$match`, `$sort` and `$limit` may be appended
/// without changing what the caller's pipeline means.
pub const APPEND_SAFE_STAGES: &[&str] = &[
	"$match",
	"$project",
	"$addFields",
	"$set",
	"$unset",
	"$group",
	"$bucket",
	"$bucketAuto",
	"$lookup",
	"$unwind",
	"$replaceRoot",
	"$replaceWith",
	"$sort",
];

const COUNT_FIELD: &str = "total";

/// Operator of a well-formed stage: exactly one `$`-prefixed key
fn stage_operator(stage: &Document) -> Option<&str> {
	let mut keys = stage.keys();
	match (keys.next(), keys.next()) {
		(Some(op), None) if op.starts_with('$') => Some(op.as_str()),
		_ => None,
	}
}

fn validate_stages(pipeline: &[Document]) -> Result<()> {
	for (index, stage) in pipeline.iter().enumerate() {
		match stage_operator(stage) {
			Some(op) if APPEND_SAFE_STAGES.contains(&op) => {}
			Some(op) => {
				return Err(PaginationError::UnsupportedPipelineStage {
					index,
					stage: op.to_string(),
				});
			}
			None => {
				let keys: Vec<&str> = stage.keys().map(String::as_str).collect();
				return Err(PaginationError::UnsupportedPipelineStage {
					index,
					stage: format!("malformed stage with keys [{}]", keys.join(", ")),
				});
			}
		}
	}
	Ok(())
}

fn is_off(value: &Bson) -> bool {
	match value {
		Bson::Boolean(b) => !*b,
		Bson::Int32(v) => *v == 0,
		Bson::Int64(v) => *v == 0,
		Bson::Double(v) => *v == 0.0,
		_ => false,
	}
}

/// Whether a document literal's keys include `root`
fn declares(spec: &Document, root: &str) -> bool {
	spec.keys().any(|key| root_field(key) == root)
}

/// Whether a new root expression is a literal document declaring `root`
fn new_root_declares(expr: Option<&Bson>, root: &str) -> bool {
	match expr {
		Some(Bson::Document(spec)) if stage_operator(spec).is_none() => declares(spec, root),
		_ => false,
	}
}

/// Effect of one stage on the presence of the top-level field `root`.
///
/// `Some(true)` means the stage outputs the field, `Some(false)` that it
/// drops it or stops it being unique, `None` that it passes the input
/// through.
fn stage_effect(op: &str, spec: &Bson, root: &str) -> Option<bool> {
	let spec_doc = match spec {
		Bson::Document(doc) => Some(doc),
		_ => None,
	};
	match op {
		"$group" => Some(root == "_id" || spec_doc.is_some_and(|s| declares(s, root))),
		"$bucket" | "$bucketAuto" => {
			let output = spec_doc.and_then(|s| s.get_document("output").ok());
			Some(
				root == "_id"
					|| match output {
						Some(output) => declares(output, root),
						None => root == "count",
					},
			)
		}
		"$project" => {
			let projection = spec_doc?;
			if is_exclusion(projection) {
				let excluded = projection.iter().any(|(key, _)| key == root);
				excluded.then_some(false)
			} else if root == "_id" {
				Some(!projection.get("_id").is_some_and(is_off))
			} else {
				Some(
					projection
						.iter()
						.any(|(key, value)| root_field(key) == root && !is_off(value)),
				)
			}
		}
		"$unset" => {
			let dropped = match spec {
				Bson::String(field) => field == root,
				Bson::Array(fields) => fields
					.iter()
					.any(|f| matches!(f, Bson::String(field) if field == root)),
				_ => false,
			};
			dropped.then_some(false)
		}
		"$unwind" => {
			let path = match spec {
				Bson::String(path) => Some(path.as_str()),
				Bson::Document(options) => options.get_str("path").ok(),
				_ => None,
			};
			// Every row unwound from one document repeats its other fields
			let unwound = path.map(|p| root_field(p.trim_start_matches('$')));
			(unwound != Some(root)).then_some(false)
		}
		"$addFields" | "$set" => spec_doc.is_some_and(|s| declares(s, root)).then_some(true),
		"$replaceRoot" => Some(new_root_declares(spec_doc.and_then(|s| s.get("newRoot")), root)),
		"$replaceWith" => Some(new_root_declares(Some(spec), root)),
		_ => None,
	}
}

/// Verify that `unique_key` is still present in the pipeline output
fn check_tiebreak(pipeline: &[Document], unique_key: &str) -> Result<()> {
	let root = root_field(unique_key);
	let mut dropped_at: Option<(usize, String)> = None;
	for (index, stage) in pipeline.iter().enumerate() {
		let Some((op, spec)) = stage.iter().next() else {
			continue;
		};
		match stage_effect(op, spec, root) {
			Some(true) => dropped_at = None,
			Some(false) if dropped_at.is_none() => dropped_at = Some((index, op.clone())),
			_ => {}
		}
	}
	match dropped_at {
		Some((index, stage)) => Err(PaginationError::MissingTiebreakField {
			field: unique_key.to_string(),
			index,
			stage,
		}),
		None => Ok(()),
	}
}

/// Read the `{ total: n }` document produced by the count branch
fn read_count(rows: &[Document]) -> Result<u64> {
	let Some(row) = rows.first() else {
		return Ok(0);
	};
	let total = match row.get(COUNT_FIELD) {
		Some(Bson::Int32(n)) => u64::try_from(*n).ok(),
		Some(Bson::Int64(n)) => u64::try_from(*n).ok(),
		Some(Bson::Double(n)) if *n >= 0.0 && n.fract() == 0.0 => Some(*n as u64),
		_ => None,
	};
	total.ok_or_else(|| {
		PaginationError::Backend(DriverError::Serialization(format!(
			"unexpected count result: {row}"
		)))
	})
}

/// Pages through the output of a caller-supplied aggregation pipeline
///
/// The caller's stages are copied, never modified. A keyset `$match` is
/// inserted after the last stage (or before the stage named by
/// [`AggregateRequest::insert_keyset_at`]), followed by `$sort` and
/// `$limit`. Every caller stage must be in [`APPEND_SAFE_STAGES`], and the
/// unique key must survive the pipeline; both are checked before any I/O.
/// `$unwind` repeats the key of the unwound document, so after it the
/// unique key must lie under the unwound path or be redeclared by a later
/// stage such as `$group`.
///
/// # Example
///
/// ```rust
/// use bson::doc;
/// use seekpage_core::request::AggregateRequest;
/// use seekpage_core::sort::SortField;
/// use seekpage_db::backends::memory::MemoryCollection;
/// use seekpage_db::engine::AggregatePaginator;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let orders = MemoryCollection::with_documents("orders", vec![
///     doc! { "_id": 1, "customer": "ann", "amount": 10 },
///     doc! { "_id": 2, "customer": "bob", "amount": 5 },
///     doc! { "_id": 3, "customer": "ann", "amount": 7 },
/// ]);
///
/// let request = AggregateRequest::new(vec![
///     doc! { "$group": { "_id": "$customer", "total": { "$sum": "$amount" } } },
/// ])
/// .sort(vec![SortField::desc("total")])
/// .limit(1);
///
/// let page = AggregatePaginator::default().aggregate(&orders, request).await?;
/// assert_eq!(page.items, vec![doc! { "_id": "ann", "total": 17 }]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct AggregatePaginator {
	core: EngineCore,
}

impl AggregatePaginator {
	pub fn new(settings: PaginationSettings) -> Self {
		Self {
			core: EngineCore::new(settings),
		}
	}

	pub fn settings(&self) -> &PaginationSettings {
		self.core.settings()
	}

	/// Fetch one page of pipeline output.
	///
	/// With `include_total_count` the caller's pipeline followed by a
	/// `$count` stage runs concurrently with the paged pipeline.
	pub async fn aggregate(
		&self,
		collection: &dyn Collection,
		request: AggregateRequest,
	) -> Result<PageResult<Document>> {
		let settings = self.core.settings();
		let limit = settings.effective_limit(request.limit)?;
		let unique_key = request
			.unique_key
			.clone()
			.unwrap_or_else(|| settings.unique_key.clone());

		validate_stages(&request.pipeline)?;
		let position = match request.keyset_position {
			Some(marker) if marker > request.pipeline.len() => {
				return Err(PaginationError::InvalidPipelineMarker {
					marker,
					len: request.pipeline.len(),
				});
			}
			Some(marker) => marker,
			None => request.pipeline.len(),
		};
		check_tiebreak(&request.pipeline, &unique_key)?;

		let sort = SortSpec::resolve(request.sort, &unique_key)?;
		let seek_key = self.core.seek_key(request.cursor.as_ref(), &sort)?;
		let direction = request.direction;

		debug!(
			collection = collection.name(),
			limit,
			?direction,
			has_cursor = seek_key.is_some(),
			stages = request.pipeline.len(),
			sort = %sort,
			"aggregate page"
		);

		let mut paged = request.pipeline.clone();
		if let Some(seek_key) = seek_key.as_ref() {
			let keyset = predicate::keyset(seek_key, &sort, direction).to_document();
			paged.insert(position, doc! { "$match": keyset });
		}
		paged.push(doc! { "$sort": fetch_order(&sort, direction) });
		paged.push(doc! { "$limit": fetch_limit(limit) });

		let include_total_count = request.include_total_count;
		let pipeline = request.pipeline;
		let total = async {
			if include_total_count {
				let mut counting = pipeline;
				counting.push(doc! { "$count": COUNT_FIELD });
				collection.aggregate(counting).await.map(Some)
			} else {
				Ok(None)
			}
		};
		let (raw, count_rows) = futures::try_join!(collection.aggregate(paged), total)?;
		let total_count = count_rows.as_deref().map(read_count).transpose()?;

		let page = self.core.assemble(
			raw,
			PageShape {
				limit,
				sort: &sort,
				direction,
				had_cursor: seek_key.is_some(),
				total_count,
			},
			&[],
		)?;

		debug!(
			collection = collection.name(),
			items = page.len(),
			has_next_page = page.has_next_page,
			has_prev_page = page.has_prev_page,
			"aggregate page assembled"
		);
		Ok(page)
	}
}
