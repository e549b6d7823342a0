//! Query-document evaluation

use bson::{Bson, Document};
use std::cmp::Ordering;

use seekpage_core::document::lookup_path;
use seekpage_core::exception::{DriverError, DriverResult};

use super::compare::{bson_eq, compare_bson, same_bracket};

/// Whether `doc` satisfies the query document `filter`
pub fn matches(doc: &Document, filter: &Document) -> DriverResult<bool> {
	for (key, condition) in filter {
		let satisfied = match key.as_str() {
			"$and" => {
				let mut all = true;
				for clause in clauses(key, condition)? {
					if !matches(doc, clause)? {
						all = false;
						break;
					}
				}
				all
			}
			"$or" => any_clause(doc, key, condition)?,
			"$nor" => !any_clause(doc, key, condition)?,
			op if op.starts_with('$') => {
				return Err(DriverError::Unsupported(format!("query operator {op}")));
			}
			path => matches_field(lookup_path(doc, path), condition)?,
		};
		if !satisfied {
			return Ok(false);
		}
	}
	Ok(true)
}

fn clauses<'a>(key: &str, condition: &'a Bson) -> DriverResult<Vec<&'a Document>> {
	let Bson::Array(items) = condition else {
		return Err(DriverError::Execution(format!("{key} requires an array")));
	};
	items
		.iter()
		.map(|item| match item {
			Bson::Document(clause) => Ok(clause),
			_ => Err(DriverError::Execution(format!("{key} entries must be documents"))),
		})
		.collect()
}

fn any_clause(doc: &Document, key: &str, condition: &Bson) -> DriverResult<bool> {
	for clause in clauses(key, condition)? {
		if matches(doc, clause)? {
			return Ok(true);
		}
	}
	Ok(false)
}

fn is_operator_document(condition: &Bson) -> Option<&Document> {
	match condition {
		Bson::Document(ops) if ops.keys().next().is_some_and(|k| k.starts_with('$')) => Some(ops),
		_ => None,
	}
}

fn matches_field(value: Option<&Bson>, condition: &Bson) -> DriverResult<bool> {
	let Some(ops) = is_operator_document(condition) else {
		return Ok(equals(value, condition));
	};
	for (op, operand) in ops {
		let satisfied = match op.as_str() {
			"$eq" => equals(value, operand),
			"$ne" => !equals(value, operand),
			"$gt" => compares(value, operand, |o| o == Ordering::Greater),
			"$gte" => compares(value, operand, |o| o != Ordering::Less),
			"$lt" => compares(value, operand, |o| o == Ordering::Less),
			"$lte" => compares(value, operand, |o| o != Ordering::Greater),
			"$in" => in_list(value, op, operand)?,
			"$nin" => !in_list(value, op, operand)?,
			"$exists" => value.is_some() == truthy(operand),
			other => return Err(DriverError::Unsupported(format!("query operator {other}"))),
		};
		if !satisfied {
			return Ok(false);
		}
	}
	Ok(true)
}

/// Equality where a missing field equals `null` and an array field matches
/// any of its elements.
fn equals(value: Option<&Bson>, operand: &Bson) -> bool {
	match value {
		None => matches!(operand, Bson::Null),
		Some(Bson::Array(items)) if !matches!(operand, Bson::Array(_)) => {
			items.iter().any(|item| bson_eq(item, operand))
		}
		Some(value) => bson_eq(value, operand),
	}
}

/// Range comparison restricted to values of the operand's type bracket.
fn compares(value: Option<&Bson>, operand: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
	let value = value.unwrap_or(&Bson::Null);
	let check = |v: &Bson| same_bracket(v, operand) && accept(compare_bson(v, operand));
	match value {
		Bson::Array(items) if !matches!(operand, Bson::Array(_)) => items.iter().any(check),
		other => check(other),
	}
}

fn in_list(value: Option<&Bson>, op: &str, operand: &Bson) -> DriverResult<bool> {
	let Bson::Array(candidates) = operand else {
		return Err(DriverError::Execution(format!("{op} requires an array")));
	};
	Ok(candidates.iter().any(|candidate| equals(value, candidate)))
}

pub(crate) fn truthy(value: &Bson) -> bool {
	match value {
		Bson::Boolean(b) => *b,
		Bson::Int32(v) => *v != 0,
		Bson::Int64(v) => *v != 0,
		Bson::Double(v) => *v != 0.0,
		Bson::Null | Bson::Undefined => false,
		_ => true,
	}
}
