//! Ordering over BSON values
//!
//! Values of different types order by type bracket:
//! MinKey < Null < numbers < strings < documents < arrays < binary <
//! ObjectId < booleans < dates < timestamps < regex < MaxKey.
//! Numbers of any width compare numerically.

use bson::{Bson, Document};
use std::cmp::Ordering;

fn bracket(value: &Bson) -> u8 {
	match value {
		Bson::MinKey => 0,
		Bson::Null | Bson::Undefined => 1,
		Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => 2,
		Bson::String(_) | Bson::Symbol(_) => 3,
		Bson::Document(_) => 4,
		Bson::Array(_) => 5,
		Bson::Binary(_) => 6,
		Bson::ObjectId(_) => 7,
		Bson::Boolean(_) => 8,
		Bson::DateTime(_) => 9,
		Bson::Timestamp(_) => 10,
		Bson::RegularExpression(_) => 11,
		Bson::MaxKey => 13,
		_ => 12,
	}
}

/// Whether two values fall in the same type bracket
pub(crate) fn same_bracket(a: &Bson, b: &Bson) -> bool {
	bracket(a) == bracket(b)
}

fn compare_numbers(a: &Bson, b: &Bson) -> Ordering {
	match (a, b) {
		(Bson::Int32(x), Bson::Int32(y)) => x.cmp(y),
		(Bson::Int32(x), Bson::Int64(y)) => i64::from(*x).cmp(y),
		(Bson::Int64(x), Bson::Int32(y)) => x.cmp(&i64::from(*y)),
		(Bson::Int64(x), Bson::Int64(y)) => x.cmp(y),
		_ => match (as_f64(a), as_f64(b)) {
			(Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or_else(|| {
				// NaN sorts below every other number
				x.is_nan().cmp(&y.is_nan()).reverse()
			}),
			_ => Ordering::Equal,
		},
	}
}

pub(crate) fn as_f64(value: &Bson) -> Option<f64> {
	match value {
		Bson::Int32(v) => Some(f64::from(*v)),
		Bson::Int64(v) => Some(*v as f64),
		Bson::Double(v) => Some(*v),
		_ => None,
	}
}

fn compare_documents(a: &Document, b: &Document) -> Ordering {
	for ((ka, va), (kb, vb)) in a.iter().zip(b.iter()) {
		let ordering = ka.cmp(kb).then_with(|| compare_bson(va, vb));
		if ordering != Ordering::Equal {
			return ordering;
		}
	}
	a.len().cmp(&b.len())
}

fn compare_arrays(a: &[Bson], b: &[Bson]) -> Ordering {
	for (va, vb) in a.iter().zip(b.iter()) {
		let ordering = compare_bson(va, vb);
		if ordering != Ordering::Equal {
			return ordering;
		}
	}
	a.len().cmp(&b.len())
}

/// Total order over BSON values
pub fn compare_bson(a: &Bson, b: &Bson) -> Ordering {
	let (ba, bb) = (bracket(a), bracket(b));
	if ba != bb {
		return ba.cmp(&bb);
	}
	match (a, b) {
		(Bson::String(x), Bson::String(y)) => x.cmp(y),
		(Bson::Symbol(x), Bson::Symbol(y)) => x.cmp(y),
		(Bson::String(x), Bson::Symbol(y)) | (Bson::Symbol(x), Bson::String(y)) => x.cmp(y),
		(Bson::Document(x), Bson::Document(y)) => compare_documents(x, y),
		(Bson::Array(x), Bson::Array(y)) => compare_arrays(x, y),
		(Bson::Binary(x), Bson::Binary(y)) => x.bytes.len().cmp(&y.bytes.len()).then_with(|| x.bytes.cmp(&y.bytes)),
		(Bson::ObjectId(x), Bson::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
		(Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
		(Bson::DateTime(x), Bson::DateTime(y)) => x.timestamp_millis().cmp(&y.timestamp_millis()),
		(Bson::Timestamp(x), Bson::Timestamp(y)) => {
			x.time.cmp(&y.time).then_with(|| x.increment.cmp(&y.increment))
		}
		_ if ba == 2 => compare_numbers(a, b),
		_ if matches!(a, Bson::MinKey | Bson::MaxKey | Bson::Null | Bson::Undefined) => Ordering::Equal,
		_ => a.to_string().cmp(&b.to_string()),
	}
}

/// Equality under [`compare_bson`], so `1 == 1.0`
pub fn bson_eq(a: &Bson, b: &Bson) -> bool {
	compare_bson(a, b) == Ordering::Equal
}
