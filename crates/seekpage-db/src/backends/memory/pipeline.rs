//! Aggregation pipeline execution

use bson::{Bson, Document};
use std::cmp::Ordering;

use seekpage_core::document::{remove_path, value_at};
use seekpage_core::exception::{DriverError, DriverResult};

use super::compare::{as_f64, bson_eq, compare_bson};
use super::matcher::{matches, truthy};

/// Run `pipeline` over `docs`
pub fn execute(mut docs: Vec<Document>, pipeline: &[Document]) -> DriverResult<Vec<Document>> {
	for stage in pipeline {
		let mut entries = stage.iter();
		let (Some((op, spec)), None) = (entries.next(), entries.next()) else {
			return Err(DriverError::Execution(
				"pipeline stage must have exactly one operator".to_string(),
			));
		};
		docs = match op.as_str() {
			"$match" => {
				let filter = as_document(op, spec)?;
				let mut kept = Vec::with_capacity(docs.len());
				for doc in docs {
					if matches(&doc, filter)? {
						kept.push(doc);
					}
				}
				kept
			}
			"$sort" => {
				sort_documents(&mut docs, as_document(op, spec)?);
				docs
			}
			"$limit" => {
				let n = as_count(op, spec)?;
				docs.truncate(n);
				docs
			}
			"$skip" => {
				let n = as_count(op, spec)?;
				docs.into_iter().skip(n).collect()
			}
			"$project" => {
				let projection = as_document(op, spec)?;
				docs.iter()
					.map(|doc| project(doc, projection))
					.collect::<DriverResult<_>>()?
			}
			"$addFields" | "$set" => {
				let fields = as_document(op, spec)?;
				let mut out = Vec::with_capacity(docs.len());
				for mut doc in docs {
					let mut computed = Vec::with_capacity(fields.len());
					for (path, expr) in fields {
						computed.push((path.clone(), evaluate(&doc, expr)?));
					}
					for (path, value) in computed {
						set_path(&mut doc, &path, value);
					}
					out.push(doc);
				}
				out
			}
			"$unset" => {
				let paths = string_list(op, spec)?;
				for doc in &mut docs {
					for path in &paths {
						remove_path(doc, path);
					}
				}
				docs
			}
			"$group" => group(&docs, as_document(op, spec)?)?,
			"$count" => {
				let Bson::String(field) = spec else {
					return Err(DriverError::Execution("$count requires a field name".to_string()));
				};
				if docs.is_empty() {
					Vec::new()
				} else {
					let mut counted = Document::new();
					counted.insert(field.clone(), count_value(docs.len()));
					vec![counted]
				}
			}
			"$unwind" => unwind(docs, op, spec)?,
			"$replaceRoot" => {
				let new_root = as_document(op, spec)?
					.get("newRoot")
					.ok_or_else(|| DriverError::Execution("$replaceRoot requires newRoot".to_string()))?;
				replace_root(&docs, new_root)?
			}
			"$replaceWith" => replace_root(&docs, spec)?,
			other => {
				return Err(DriverError::Unsupported(format!("pipeline stage {other}")));
			}
		};
	}
	Ok(docs)
}

fn as_document<'a>(op: &str, spec: &'a Bson) -> DriverResult<&'a Document> {
	match spec {
		Bson::Document(doc) => Ok(doc),
		_ => Err(DriverError::Execution(format!("{op} requires a document"))),
	}
}

fn as_count(op: &str, spec: &Bson) -> DriverResult<usize> {
	let n = match spec {
		Bson::Int32(v) => i64::from(*v),
		Bson::Int64(v) => *v,
		Bson::Double(v) if v.fract() == 0.0 => *v as i64,
		_ => -1,
	};
	usize::try_from(n).map_err(|_| DriverError::Execution(format!("{op} requires a non-negative integer")))
}

fn string_list(op: &str, spec: &Bson) -> DriverResult<Vec<String>> {
	match spec {
		Bson::String(s) => Ok(vec![s.clone()]),
		Bson::Array(items) => items
			.iter()
			.map(|item| match item {
				Bson::String(s) => Ok(s.clone()),
				_ => Err(DriverError::Execution(format!("{op} entries must be strings"))),
			})
			.collect(),
		_ => Err(DriverError::Execution(format!("{op} requires a string or array"))),
	}
}

/// Stable sort by an ordered sort document
pub fn sort_documents(docs: &mut [Document], sort: &Document) {
	let keys: Vec<(&str, bool)> = sort
		.iter()
		.map(|(field, direction)| {
			let descending = as_f64(direction).is_some_and(|d| d < 0.0);
			(field.as_str(), descending)
		})
		.collect();
	docs.sort_by(|a, b| {
		for (field, descending) in &keys {
			let ordering = compare_bson(&value_at(a, field), &value_at(b, field));
			let ordering = if *descending { ordering.reverse() } else { ordering };
			if ordering != Ordering::Equal {
				return ordering;
			}
		}
		Ordering::Equal
	});
}

/// Set a dotted path, creating intermediate documents
pub fn set_path(doc: &mut Document, path: &str, value: Bson) {
	match path.split_once('.') {
		None => {
			doc.insert(path, value);
		}
		Some((head, rest)) => {
			if !matches!(doc.get(head), Some(Bson::Document(_))) {
				doc.insert(head, Document::new());
			}
			if let Some(Bson::Document(inner)) = doc.get_mut(head) {
				set_path(inner, rest, value);
			}
		}
	}
}

/// Evaluate an aggregation expression against `doc`
pub fn evaluate(doc: &Document, expr: &Bson) -> DriverResult<Bson> {
	match expr {
		Bson::String(s) if s.starts_with("$$") => {
			Err(DriverError::Unsupported(format!("variable {s}")))
		}
		Bson::String(s) if s.starts_with('$') => Ok(value_at(doc, &s[1..])),
		Bson::Array(items) => items
			.iter()
			.map(|item| evaluate(doc, item))
			.collect::<DriverResult<Vec<_>>>()
			.map(Bson::Array),
		Bson::Document(inner) => {
			let mut keys = inner.keys();
			match (keys.next(), keys.next()) {
				(Some(op), None) if op == "$literal" => Ok(inner.get("$literal").cloned().unwrap_or(Bson::Null)),
				(Some(op), None) if op.starts_with('$') => {
					Err(DriverError::Unsupported(format!("expression operator {op}")))
				}
				_ => {
					let mut out = Document::new();
					for (key, value) in inner {
						out.insert(key.clone(), evaluate(doc, value)?);
					}
					Ok(Bson::Document(out))
				}
			}
		}
		other => Ok(other.clone()),
	}
}

/// Apply an inclusion or exclusion projection
pub fn project(doc: &Document, projection: &Document) -> DriverResult<Document> {
	let is_flag = |v: &Bson| matches!(v, Bson::Boolean(_) | Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_));
	let exclusion = projection
		.iter()
		.filter(|(field, _)| field.as_str() != "_id")
		.all(|(_, v)| is_flag(v) && !truthy(v))
		&& projection.iter().any(|(_, v)| is_flag(v) && !truthy(v));

	if exclusion {
		let mut out = doc.clone();
		for (field, _) in projection {
			remove_path(&mut out, field);
		}
		return Ok(out);
	}

	let mut out = Document::new();
	let drop_id = projection.get("_id").is_some_and(|v| is_flag(v) && !truthy(v));
	if !drop_id {
		if let Some(id) = doc.get("_id") {
			out.insert("_id", id.clone());
		}
	}
	for (field, spec) in projection {
		if field == "_id" && (drop_id || is_flag(spec)) {
			continue;
		}
		if is_flag(spec) {
			if !truthy(spec) {
				return Err(DriverError::Execution(format!(
					"cannot exclude '{field}' in an inclusion projection"
				)));
			}
			if let Some(value) = seekpage_core::document::lookup_path(doc, field) {
				set_path(&mut out, field, value.clone());
			}
		} else {
			set_path(&mut out, field, evaluate(doc, spec)?);
		}
	}
	Ok(out)
}

fn group(docs: &[Document], spec: &Document) -> DriverResult<Vec<Document>> {
	let key_expr = spec
		.get("_id")
		.ok_or_else(|| DriverError::Execution("$group requires an _id".to_string()))?;

	let mut groups: Vec<(Bson, Vec<&Document>)> = Vec::new();
	for doc in docs {
		let key = evaluate(doc, key_expr)?;
		match groups.iter_mut().find(|(existing, _)| bson_eq(existing, &key)) {
			Some((_, members)) => members.push(doc),
			None => groups.push((key, vec![doc])),
		}
	}

	let mut out = Vec::with_capacity(groups.len());
	for (key, members) in groups {
		let mut grouped = Document::new();
		grouped.insert("_id", key);
		for (field, accumulator) in spec {
			if field == "_id" {
				continue;
			}
			let accumulator = as_document(field, accumulator)?;
			let mut entries = accumulator.iter();
			let (Some((op, expr)), None) = (entries.next(), entries.next()) else {
				return Err(DriverError::Execution(format!(
					"accumulator '{field}' must have exactly one operator"
				)));
			};
			grouped.insert(field.clone(), accumulate(op, expr, &members)?);
		}
		out.push(grouped);
	}
	Ok(out)
}

fn accumulate(op: &str, expr: &Bson, members: &[&Document]) -> DriverResult<Bson> {
	let values = || -> DriverResult<Vec<Bson>> {
		members.iter().map(|doc| evaluate(doc, expr)).collect()
	};
	let present = || -> DriverResult<Vec<Bson>> {
		Ok(values()?
			.into_iter()
			.filter(|v| !matches!(v, Bson::Null | Bson::Undefined))
			.collect())
	};
	Ok(match op {
		"$sum" => sum(&values()?),
		"$count" => count_value(members.len()),
		"$avg" => {
			let numbers: Vec<f64> = values()?.iter().filter_map(as_f64).collect();
			if numbers.is_empty() {
				Bson::Null
			} else {
				Bson::Double(numbers.iter().sum::<f64>() / numbers.len() as f64)
			}
		}
		"$min" => present()?.into_iter().min_by(compare_bson).unwrap_or(Bson::Null),
		"$max" => present()?.into_iter().max_by(compare_bson).unwrap_or(Bson::Null),
		"$first" => values()?.into_iter().next().unwrap_or(Bson::Null),
		"$last" => values()?.into_iter().last().unwrap_or(Bson::Null),
		"$push" => Bson::Array(values()?),
		"$addToSet" => {
			let mut set: Vec<Bson> = Vec::new();
			for value in values()? {
				if !set.iter().any(|existing| bson_eq(existing, &value)) {
					set.push(value);
				}
			}
			Bson::Array(set)
		}
		other => return Err(DriverError::Unsupported(format!("accumulator {other}"))),
	})
}

fn count_value(n: usize) -> Bson {
	i32::try_from(n).map(Bson::Int32).unwrap_or_else(|_| Bson::Int64(n as i64))
}

fn sum(values: &[Bson]) -> Bson {
	let mut int_total: i64 = 0;
	let mut float_total: f64 = 0.0;
	let mut any_float = false;
	let mut all_int32 = true;
	for value in values {
		match value {
			Bson::Int32(v) => int_total += i64::from(*v),
			Bson::Int64(v) => {
				int_total += *v;
				all_int32 = false;
			}
			Bson::Double(v) => {
				float_total += *v;
				any_float = true;
			}
			_ => {}
		}
	}
	if any_float {
		Bson::Double(float_total + int_total as f64)
	} else if all_int32 {
		i32::try_from(int_total).map(Bson::Int32).unwrap_or(Bson::Int64(int_total))
	} else {
		Bson::Int64(int_total)
	}
}

fn unwind(docs: Vec<Document>, op: &str, spec: &Bson) -> DriverResult<Vec<Document>> {
	let (path, preserve) = match spec {
		Bson::String(path) => (path.as_str(), false),
		Bson::Document(options) => {
			let Some(Bson::String(path)) = options.get("path") else {
				return Err(DriverError::Execution(format!("{op} requires a path")));
			};
			let preserve = options
				.get("preserveNullAndEmptyArrays")
				.is_some_and(truthy);
			(path.as_str(), preserve)
		}
		_ => return Err(DriverError::Execution(format!("{op} requires a path"))),
	};
	let Some(field) = path.strip_prefix('$') else {
		return Err(DriverError::Execution(format!("{op} path must start with '$'")));
	};

	let mut out = Vec::with_capacity(docs.len());
	for doc in docs {
		match value_at(&doc, field) {
			Bson::Array(items) if !items.is_empty() => {
				for item in items {
					let mut unwound = doc.clone();
					set_path(&mut unwound, field, item);
					out.push(unwound);
				}
			}
			Bson::Array(_) | Bson::Null | Bson::Undefined => {
				if preserve {
					out.push(doc);
				}
			}
			_ => out.push(doc),
		}
	}
	Ok(out)
}

fn replace_root(docs: &[Document], expr: &Bson) -> DriverResult<Vec<Document>> {
	docs.iter()
		.map(|doc| match evaluate(doc, expr)? {
			Bson::Document(root) => Ok(root),
			_ => Err(DriverError::Execution("new root must be a document".to_string())),
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use bson::doc;
	use rstest::rstest;

	fn orders() -> Vec<Document> {
		vec![
			doc! { "_id": 1, "customer": "ann", "amount": 10, "items": ["a", "b"] },
			doc! { "_id": 2, "customer": "bob", "amount": 5, "items": [] },
			doc! { "_id": 3, "customer": "ann", "amount": 7.5, "items": ["c"] },
		]
	}

	#[rstest]
	fn test_match_sort_limit() {
		let out = execute(
			orders(),
			&[
				doc! { "$match": { "amount": { "$gte": 7 } } },
				doc! { "$sort": { "amount": 1 } },
				doc! { "$limit": 1 },
			],
		)
		.unwrap();
		assert_eq!(out, vec![doc! { "_id": 3, "customer": "ann", "amount": 7.5, "items": ["c"] }]);
	}

	#[rstest]
	fn test_group_accumulators() {
		// Arrange
		let pipeline = [doc! { "$group": {
			"_id": "$customer",
			"total": { "$sum": "$amount" },
			"orders": { "$sum": 1 },
			"biggest": { "$max": "$amount" },
			"ids": { "$push": "$_id" },
		} }];

		// Act
		let out = execute(orders(), &pipeline).unwrap();

		// Assert
		assert_eq!(
			out,
			vec![
				doc! { "_id": "ann", "total": 17.5, "orders": 2, "biggest": 10, "ids": [1, 3] },
				doc! { "_id": "bob", "total": 5, "orders": 1, "biggest": 5, "ids": [2] },
			]
		);
	}

	#[rstest]
	fn test_project_inclusion_and_exclusion() {
		let doc = doc! { "_id": 1, "a": 1, "b": { "c": 2, "d": 3 } };
		assert_eq!(
			project(&doc, &doc! { "b.c": 1 }).unwrap(),
			doc! { "_id": 1, "b": { "c": 2 } }
		);
		assert_eq!(
			project(&doc, &doc! { "_id": 0, "a": 1 }).unwrap(),
			doc! { "a": 1 }
		);
		assert_eq!(
			project(&doc, &doc! { "b": 0 }).unwrap(),
			doc! { "_id": 1, "a": 1 }
		);
		assert_eq!(
			project(&doc, &doc! { "copy": "$a" }).unwrap(),
			doc! { "_id": 1, "copy": 1 }
		);
	}

	#[rstest]
	fn test_unwind_and_count() {
		let out = execute(
			orders(),
			&[doc! { "$unwind": "$items" }, doc! { "$count": "n" }],
		)
		.unwrap();
		assert_eq!(out, vec![doc! { "n": 3 }]);
	}

	#[rstest]
	fn test_count_on_empty_input_yields_nothing() {
		let out = execute(Vec::new(), &[doc! { "$count": "n" }]).unwrap();
		assert!(out.is_empty());
	}

	#[rstest]
	fn test_add_fields_unset_replace_root() {
		let out = execute(
			vec![doc! { "_id": 1, "inner": { "x": 1 }, "drop": true }],
			&[
				doc! { "$addFields": { "inner.y": "$_id" } },
				doc! { "$unset": ["drop"] },
				doc! { "$replaceRoot": { "newRoot": "$inner" } },
			],
		)
		.unwrap();
		assert_eq!(out, vec![doc! { "x": 1, "y": 1 }]);
	}

	#[rstest]
	#[case(doc! { "$facet": {} })]
	#[case(doc! { "$lookup": { "from": "other" } })]
	fn test_unsupported_stage(#[case] stage: Document) {
		assert!(matches!(
			execute(orders(), &[stage]),
			Err(DriverError::Unsupported(_))
		));
	}

	#[rstest]
	fn test_sort_descending_stable() {
		let mut docs = vec![
			doc! { "_id": 1, "score": 90 },
			doc! { "_id": 2, "score": 80 },
			doc! { "_id": 3, "score": 90 },
		];
		sort_documents(&mut docs, &doc! { "score": -1 });
		let ids: Vec<i32> = docs.iter().map(|d| d.get_i32("_id").unwrap()).collect();
		assert_eq!(ids, vec![1, 3, 2]);
	}
}
