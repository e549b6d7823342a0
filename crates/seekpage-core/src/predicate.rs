//! Keyset predicates
//!
//! For sort fields `f1..fn` with seek values `v1..vn` the page boundary is
//!
//! ```text
//! OR_{i=1..n} ( AND_{j<i} f_j == v_j  AND  f_i cmp_i v_i )
//! ```
//!
//! where `cmp_i` is `>` for ascending and `<` for descending fields when
//! paging forward, and the reverse when paging backward.
//!
//! Range operators never match across type brackets, so the strict term is
//! widened at the null end: null and missing values sort below everything,
//! a `<` term also admits `null`, and a `>` term from a null seek value
//! becomes `$ne: null`.
//!
//! The predicate is built as a [`Predicate`] tree and only rendered to a
//! query document at the end, so it can be inspected without a database.

use bson::{Bson, Document, doc};

use crate::cursor::SeekKey;
use crate::request::PageDirection;
use crate::sort::{SortDirection, SortSpec};

/// Comparison operator of a keyset term
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
	Eq,
	Ne,
	Gt,
	Lt,
}

impl CompareOp {
	pub fn operator(self) -> &'static str {
		match self {
			CompareOp::Eq => "$eq",
			CompareOp::Ne => "$ne",
			CompareOp::Gt => "$gt",
			CompareOp::Lt => "$lt",
		}
	}
}

/// Backend-agnostic boolean expression
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
	And(Vec<Predicate>),
	Or(Vec<Predicate>),
	Compare {
		field: String,
		op: CompareOp,
		value: Bson,
	},
	/// A caller-supplied filter, kept verbatim
	Filter(Document),
}

impl Predicate {
	/// Render as a query document.
	///
	/// # Examples
	///
	/// ```
	/// use bson::doc;
	/// use seekpage_core::predicate::{CompareOp, Predicate};
	///
	/// let p = Predicate::Compare { field: "age".into(), op: CompareOp::Gt, value: 30.into() };
	/// assert_eq!(p.to_document(), doc! { "age": { "$gt": 30 } });
	/// ```
	pub fn to_document(&self) -> Document {
		match self {
			Predicate::Compare { field, op, value } => {
				doc! { field.as_str(): { op.operator(): value.clone() } }
			}
			Predicate::And(terms) if terms.len() == 1 => terms[0].to_document(),
			Predicate::Or(terms) if terms.len() == 1 => terms[0].to_document(),
			// An empty disjunction matches nothing
			Predicate::Or(terms) if terms.is_empty() => doc! { "$nor": [ {} ] },
			Predicate::And(terms) => doc! { "$and": Self::render_all(terms) },
			Predicate::Or(terms) => doc! { "$or": Self::render_all(terms) },
			Predicate::Filter(filter) => filter.clone(),
		}
	}

	fn render_all(terms: &[Predicate]) -> Vec<Bson> {
		terms
			.iter()
			.map(|term| Bson::Document(term.to_document()))
			.collect()
	}
}

/// Comparison used for a sort field when moving in `direction`
fn seek_operator(sort_direction: SortDirection, direction: PageDirection) -> CompareOp {
	match (sort_direction, direction) {
		(SortDirection::Ascending, PageDirection::Forward)
		| (SortDirection::Descending, PageDirection::Backward) => CompareOp::Gt,
		(SortDirection::Descending, PageDirection::Forward)
		| (SortDirection::Ascending, PageDirection::Backward) => CompareOp::Lt,
	}
}

fn compare(field: &str, op: CompareOp, value: Bson) -> Predicate {
	Predicate::Compare {
		field: field.to_string(),
		op,
		value,
	}
}

/// Strict term selecting values beyond `value` in the order given by `op`.
///
/// `None` when nothing lies beyond it, i.e. `< null`.
fn strict_term(field: &str, op: CompareOp, value: &Bson) -> Option<Predicate> {
	let is_null = matches!(value, Bson::Null | Bson::Undefined);
	match (op, is_null) {
		(CompareOp::Lt, true) => None,
		(CompareOp::Lt, false) => Some(Predicate::Or(vec![
			compare(field, CompareOp::Lt, value.clone()),
			compare(field, CompareOp::Eq, Bson::Null),
		])),
		(_, true) => Some(compare(field, CompareOp::Ne, Bson::Null)),
		(op, false) => Some(compare(field, op, value.clone())),
	}
}

/// Build the disjunctive keyset condition for `seek_key` under `sort`.
pub fn keyset(seek_key: &SeekKey, sort: &SortSpec, direction: PageDirection) -> Predicate {
	let pairs: Vec<_> = sort.fields().iter().zip(seek_key.values()).collect();
	let branches = (0..pairs.len())
		.filter_map(|i| {
			let (field, value) = pairs[i];
			let strict = strict_term(&field.field, seek_operator(field.direction, direction), value)?;
			let mut terms: Vec<Predicate> = pairs[..i]
				.iter()
				.map(|(field, value)| compare(&field.field, CompareOp::Eq, (*value).clone()))
				.collect();
			terms.push(strict);
			Some(Predicate::And(terms))
		})
		.collect();
	Predicate::Or(branches)
}

/// Conjoin the caller's filter with the keyset condition.
///
/// Without a seek key (first page) the filter is returned unmodified.
///
/// # Examples
///
/// ```
/// use bson::{doc, Bson};
/// use seekpage_core::cursor::SeekKey;
/// use seekpage_core::predicate::build;
/// use seekpage_core::request::PageDirection;
/// use seekpage_core::sort::{SortField, SortSpec};
///
/// let sort = SortSpec::resolve(vec![SortField::desc("score")], "_id").unwrap();
/// let filter = doc! { "active": true };
/// assert_eq!(build(&filter, None, &sort, PageDirection::Forward), filter);
///
/// let key = SeekKey::new(vec![Bson::Int32(90), Bson::Int32(1)]);
/// let query = build(&filter, Some(&key), &sort, PageDirection::Forward);
/// assert_eq!(query, doc! { "$and": [
///     { "active": true },
///     { "$or": [
///         { "$or": [ { "score": { "$lt": 90 } }, { "score": { "$eq": null } } ] },
///         { "$and": [ { "score": { "$eq": 90 } }, { "_id": { "$gt": 1 } } ] },
///     ] },
/// ] });
/// ```
pub fn build(
	filter: &Document,
	seek_key: Option<&SeekKey>,
	sort: &SortSpec,
	direction: PageDirection,
) -> Document {
	match seek_key {
		None => filter.clone(),
		Some(seek_key) => {
			let condition = keyset(seek_key, sort, direction);
			if filter.is_empty() {
				condition.to_document()
			} else {
				Predicate::And(vec![Predicate::Filter(filter.clone()), condition]).to_document()
			}
		}
	}
}
