//! Keeping sort fields readable through caller projections

use bson::{Bson, Document};

use seekpage_core::document::root_field;
use seekpage_core::sort::SortSpec;

fn is_flag(value: &Bson) -> bool {
	matches!(value, Bson::Boolean(_) | Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_))
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

/// Whether `projection` excludes fields rather than including them
pub(crate) fn is_exclusion(projection: &Document) -> bool {
	projection
		.iter()
		.filter(|(field, _)| field.as_str() != "_id")
		.all(|(_, value)| is_off(value))
		&& projection.iter().any(|(_, value)| is_off(value))
}

/// `path` is `key` or lies beneath it
fn covers(key: &str, path: &str) -> bool {
	path == key || path.strip_prefix(key).is_some_and(|rest| rest.starts_with('.'))
}

/// Adjust a caller projection so every sort field is returned.
///
/// Returns the projection to send to the backend and the paths the engine
/// had to add, which are stripped from items before they are returned.
pub(crate) fn force_sort_fields(projection: Option<&Document>, sort: &SortSpec) -> (Option<Document>, Vec<String>) {
	let Some(projection) = projection.filter(|p| !p.is_empty()) else {
		return (None, Vec::new());
	};
	let mut forced = projection.clone();
	let mut added = Vec::new();

	if is_exclusion(projection) {
		for field in sort.field_names() {
			let blocking: Vec<String> = forced
				.keys()
				.filter(|key| covers(key, field) || covers(field, key))
				.cloned()
				.collect();
			for key in blocking {
				forced.remove(&key);
				added.push(key);
			}
		}
	} else {
		for field in sort.field_names() {
			if field == "_id" || root_field(field) == "_id" {
				if forced.get("_id").is_some_and(is_off) {
					forced.insert("_id", 1);
					added.push("_id".to_string());
				}
				continue;
			}
			let included = forced
				.iter()
				.any(|(key, value)| covers(key, field) && !(is_flag(value) && is_off(value)));
			if !included {
				forced.insert(field, 1);
				added.push(field.to_string());
			}
		}
	}

	(Some(forced), added)
}

#[cfg(test)]
mod tests {
	use super::*;
	use bson::doc;
	use rstest::rstest;
	use seekpage_core::sort::SortField;

	fn sort(fields: Vec<SortField>) -> SortSpec {
		SortSpec::resolve(fields, "_id").unwrap()
	}

	#[rstest]
	fn test_no_projection_is_untouched() {
		let (projection, added) = force_sort_fields(None, &sort(vec![SortField::asc("a")]));
		assert!(projection.is_none());
		assert!(added.is_empty());
	}

	#[rstest]
	fn test_inclusion_gains_sort_fields() {
		// Arrange
		let caller = doc! { "title": 1 };

		// Act
		let (projection, added) =
			force_sort_fields(Some(&caller), &sort(vec![SortField::desc("score"), SortField::asc("title")]));

		// Assert
		assert_eq!(projection, Some(doc! { "title": 1, "score": 1 }));
		assert_eq!(added, vec!["score".to_string()]);
	}

	#[rstest]
	fn test_inclusion_restores_suppressed_id() {
		let caller = doc! { "_id": 0, "title": 1 };
		let (projection, added) = force_sort_fields(Some(&caller), &sort(vec![]));
		assert_eq!(projection, Some(doc! { "_id": 1, "title": 1 }));
		assert_eq!(added, vec!["_id".to_string()]);
	}

	#[rstest]
	fn test_inclusion_parent_covers_nested_sort_field() {
		let caller = doc! { "author": 1 };
		let (projection, added) = force_sort_fields(Some(&caller), &sort(vec![SortField::asc("author.name")]));
		assert_eq!(projection, Some(doc! { "author": 1 }));
		assert!(added.is_empty());
	}

	#[rstest]
	fn test_exclusion_releases_sort_fields() {
		// Arrange
		let caller = doc! { "body": 0, "score": 0, "_id": 0 };

		// Act
		let (projection, added) = force_sort_fields(Some(&caller), &sort(vec![SortField::desc("score")]));

		// Assert
		assert_eq!(projection, Some(doc! { "body": 0 }));
		assert_eq!(added, vec!["score".to_string(), "_id".to_string()]);
	}

	#[rstest]
	#[case(doc! { "a": 0 }, true)]
	#[case(doc! { "_id": 0 }, true)]
	#[case(doc! { "_id": 0, "a": 1 }, false)]
	#[case(doc! { "a": "$b" }, false)]
	fn test_is_exclusion(#[case] projection: Document, #[case] expected: bool) {
		assert_eq!(is_exclusion(&projection), expected);
	}
}
