//! Document path helpers

use bson::{Bson, Document};

/// Look up a dotted path (`author.name`) in a document.
///
/// Only embedded documents are traversed; array elements are not expanded.
///
/// # Examples
///
/// ```
/// use bson::{doc, Bson};
/// use seekpage_core::document::lookup_path;
///
/// let doc = doc! { "author": { "name": "Ann" }, "score": 3 };
/// assert_eq!(lookup_path(&doc, "author.name"), Some(&Bson::String("Ann".into())));
/// assert_eq!(lookup_path(&doc, "score"), Some(&Bson::Int32(3)));
/// assert_eq!(lookup_path(&doc, "author.age"), None);
/// ```
pub fn lookup_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
	let mut segments = path.split('.');
	let mut current = doc.get(segments.next()?)?;
	for segment in segments {
		current = match current {
			Bson::Document(inner) => inner.get(segment)?,
			_ => return None,
		};
	}
	Some(current)
}

/// Like [`lookup_path`], but a missing field reads as `Null`.
pub fn value_at(doc: &Document, path: &str) -> Bson {
	lookup_path(doc, path).cloned().unwrap_or(Bson::Null)
}

/// Remove a dotted path from a document, pruning nothing else.
pub fn remove_path(doc: &mut Document, path: &str) -> Option<Bson> {
	match path.split_once('.') {
		None => doc.remove(path),
		Some((head, rest)) => match doc.get_mut(head) {
			Some(Bson::Document(inner)) => remove_path(inner, rest),
			_ => None,
		},
	}
}

/// Top-level segment of a dotted path
pub fn root_field(path: &str) -> &str {
	path.split('.').next().unwrap_or(path)
}
