//! Cursor encoding and decoding

use base64::{Engine as _, engine::general_purpose};
use bson::Bson;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::{Cursor, SeekKey};
use crate::exception::{PaginationError, Result};
use crate::sort::{Fingerprint, SortSpec};

type HmacSha256 = Hmac<Sha256>;

const PAYLOAD_VERSION: i32 = 1;
const TAG_LEN: usize = 32;

#[derive(Serialize, Deserialize)]
struct CursorPayload {
	v: i32,
	k: Vec<Bson>,
	f: String,
}

/// Encodes seek keys into opaque cursors and back
///
/// Cursors are `base64url(bson(payload) [|| hmac])` where the payload holds
/// a format version, the seek-key values and the sort fingerprint. BSON keeps
/// every value type intact (strings, numbers of each width, dates, object
/// ids, booleans) and the payload is an array, so key ordering of the source
/// documents does not matter.
///
/// With a secret key the payload is followed by an HMAC-SHA256 tag, and
/// cursors that were altered or signed with another key are rejected.
///
/// # Examples
///
/// ```
/// use bson::Bson;
/// use seekpage_core::cursor::{CursorCodec, SeekKey};
/// use seekpage_core::sort::{SortField, SortSpec};
///
/// let codec = CursorCodec::new();
/// let spec = SortSpec::resolve(vec![SortField::desc("score")], "_id").unwrap();
/// let key = SeekKey::new(vec![Bson::Int32(90), Bson::Int32(2)]);
///
/// let cursor = codec.encode(&key, &spec.fingerprint()).unwrap();
/// assert_eq!(codec.decode_for(&cursor, &spec).unwrap(), key);
/// ```
#[derive(Clone, Default)]
pub struct CursorCodec {
	secret_key: Option<Vec<u8>>,
}

impl CursorCodec {
	/// Create a codec that issues unsigned cursors
	pub fn new() -> Self {
		Self::default()
	}

	/// Create a codec that signs cursors with HMAC-SHA256
	///
	/// The key should be at least 32 bytes for adequate security.
	pub fn with_secret_key(key: &[u8]) -> Self {
		Self {
			secret_key: Some(key.to_vec()),
		}
	}

	pub fn is_signed(&self) -> bool {
		self.secret_key.is_some()
	}

	fn mac(&self, key: &[u8]) -> Result<HmacSha256> {
		HmacSha256::new_from_slice(key)
			.map_err(|_| PaginationError::InvalidCursor("unusable cursor secret".to_string()))
	}

	/// Encode a seek key and the fingerprint of the sort it belongs to
	pub fn encode(&self, seek_key: &SeekKey, fingerprint: &Fingerprint) -> Result<Cursor> {
		let payload = CursorPayload {
			v: PAYLOAD_VERSION,
			k: seek_key.values().to_vec(),
			f: fingerprint.as_str().to_string(),
		};
		let mut bytes = bson::serialize_to_vec(&payload)
			.map_err(|e| PaginationError::InvalidCursor(format!("cannot encode seek key: {e}")))?;

		if let Some(key) = &self.secret_key {
			let mut mac = self.mac(key)?;
			mac.update(&bytes);
			bytes.extend_from_slice(&mac.finalize().into_bytes());
		}

		Ok(Cursor(general_purpose::URL_SAFE_NO_PAD.encode(bytes)))
	}

	/// Decode a cursor into its seek key and embedded fingerprint
	pub fn decode(&self, cursor: &Cursor) -> Result<(SeekKey, Fingerprint)> {
		let mut bytes = general_purpose::URL_SAFE_NO_PAD
			.decode(cursor.as_str())
			.map_err(|_| PaginationError::InvalidCursor("not base64url".to_string()))?;

		if let Some(key) = &self.secret_key {
			if bytes.len() <= TAG_LEN {
				return Err(PaginationError::InvalidCursor("cursor too short".to_string()));
			}
			let tag = bytes.split_off(bytes.len() - TAG_LEN);
			let mut mac = self.mac(key)?;
			mac.update(&bytes);
			mac.verify_slice(&tag).map_err(|_| {
				PaginationError::InvalidCursor("cursor integrity check failed".to_string())
			})?;
		}

		let payload: CursorPayload = bson::deserialize_from_slice(&bytes)
			.map_err(|e| PaginationError::InvalidCursor(format!("malformed payload: {e}")))?;

		if payload.v != PAYLOAD_VERSION {
			return Err(PaginationError::InvalidCursor(format!(
				"unsupported cursor version {}",
				payload.v
			)));
		}
		if payload.k.is_empty() {
			return Err(PaginationError::InvalidCursor("empty seek key".to_string()));
		}

		Ok((SeekKey::new(payload.k), Fingerprint::from(payload.f)))
	}

	/// Decode a cursor and check it was issued for `sort`
	pub fn decode_for(&self, cursor: &Cursor, sort: &SortSpec) -> Result<SeekKey> {
		let (seek_key, embedded) = self.decode(cursor)?;
		let current = sort.fingerprint();
		if embedded != current {
			return Err(PaginationError::CursorSortMismatch {
				expected: embedded.to_string(),
				actual: current.to_string(),
			});
		}
		if seek_key.len() != sort.len() {
			return Err(PaginationError::InvalidCursor(format!(
				"seek key has {} values, sort has {} fields",
				seek_key.len(),
				sort.len()
			)));
		}
		Ok(seek_key)
	}
}

impl std::fmt::Debug for CursorCodec {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CursorCodec")
			.field("signed", &self.is_signed())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::sort::SortField;
	use bson::oid::ObjectId;
	use bson::{DateTime, doc};
	use proptest::prelude::*;
	use rstest::rstest;

	fn score_sort() -> SortSpec {
		SortSpec::resolve(vec![SortField::desc("score")], "_id").unwrap()
	}

	#[rstest]
	fn test_codec_round_trip_mixed_types() {
		// Arrange
		let codec = CursorCodec::new();
		let spec = SortSpec::resolve(
			vec![
				SortField::asc("name"),
				SortField::desc("created"),
				SortField::asc("active"),
				SortField::asc("ratio"),
				SortField::asc("count"),
			],
			"_id",
		)
		.unwrap();
		let key = SeekKey::new(vec![
			Bson::String("héllo/wörld?&=".to_string()),
			Bson::DateTime(DateTime::from_millis(1_700_000_000_123)),
			Bson::Boolean(true),
			Bson::Double(0.1),
			Bson::Int64(i64::MAX),
			Bson::ObjectId(ObjectId::new()),
		]);

		// Act
		let cursor = codec.encode(&key, &spec.fingerprint()).unwrap();
		let decoded = codec.decode_for(&cursor, &spec).unwrap();

		// Assert
		assert_eq!(decoded, key);
	}

	#[rstest]
	fn test_cursor_is_url_safe() {
		let codec = CursorCodec::with_secret_key(b"test-secret-key-for-unit-tests!!");
		let key = SeekKey::new(vec![Bson::String("???>>>".repeat(8)), Bson::Int32(1)]);
		let cursor = codec.encode(&key, &score_sort().fingerprint()).unwrap();
		assert!(
			cursor
				.as_str()
				.chars()
				.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
		);
	}

	#[rstest]
	fn test_decode_rejects_sort_mismatch() {
		// Arrange
		let codec = CursorCodec::new();
		let issued_for = score_sort();
		let requested = SortSpec::resolve(vec![SortField::asc("score")], "_id").unwrap();
		let key = SeekKey::new(vec![Bson::Int32(90), Bson::Int32(1)]);
		let cursor = codec.encode(&key, &issued_for.fingerprint()).unwrap();

		// Act
		let result = codec.decode_for(&cursor, &requested);

		// Assert
		match result {
			Err(PaginationError::CursorSortMismatch { expected, actual }) => {
				assert_eq!(expected, issued_for.fingerprint().to_string());
				assert_eq!(actual, requested.fingerprint().to_string());
			}
			other => panic!("expected CursorSortMismatch, got {other:?}"),
		}
	}

	#[rstest]
	#[case("not-valid-base64!!!")]
	#[case("")]
	#[case("aGVsbG8")]
	fn test_decode_rejects_malformed(#[case] token: &str) {
		let codec = CursorCodec::new();
		let result = codec.decode(&Cursor::from(token));
		assert!(matches!(result, Err(PaginationError::InvalidCursor(_))));
	}

	#[rstest]
	fn test_decode_rejects_unknown_version() {
		// Arrange
		let codec = CursorCodec::new();
		let bytes = bson::serialize_to_vec(&doc! { "v": 99, "k": [1], "f": "x" }).unwrap();
		let cursor = Cursor::from(general_purpose::URL_SAFE_NO_PAD.encode(bytes));

		// Act
		let result = codec.decode(&cursor);

		// Assert
		assert!(matches!(result, Err(PaginationError::InvalidCursor(msg)) if msg.contains("version")));
	}

	#[rstest]
	fn test_signed_cursor_rejects_tampering() {
		// Arrange
		let codec = CursorCodec::with_secret_key(b"test-secret-key-for-unit-tests!!");
		let key = SeekKey::new(vec![Bson::Int32(90), Bson::Int32(1)]);
		let cursor = codec.encode(&key, &score_sort().fingerprint()).unwrap();
		let mut bytes = general_purpose::URL_SAFE_NO_PAD
			.decode(cursor.as_str())
			.unwrap();
		bytes[8] ^= 0x01;
		let tampered = Cursor::from(general_purpose::URL_SAFE_NO_PAD.encode(bytes));

		// Act
		let result = codec.decode(&tampered);

		// Assert
		assert!(matches!(result, Err(PaginationError::InvalidCursor(msg)) if msg.contains("integrity")));
	}

	#[rstest]
	fn test_different_key_rejects_cursor() {
		let codec_a = CursorCodec::with_secret_key(b"secret-key-a-for-testing-only!!");
		let codec_b = CursorCodec::with_secret_key(b"secret-key-b-for-testing-only!!");
		let key = SeekKey::new(vec![Bson::Int32(1)]);
		let cursor = codec_a.encode(&key, &score_sort().fingerprint()).unwrap();
		assert!(matches!(
			codec_b.decode(&cursor),
			Err(PaginationError::InvalidCursor(_))
		));
	}

	#[rstest]
	fn test_decode_rejects_arity_mismatch() {
		let codec = CursorCodec::new();
		let spec = score_sort();
		let cursor = codec
			.encode(&SeekKey::new(vec![Bson::Int32(1)]), &spec.fingerprint())
			.unwrap();
		assert!(matches!(
			codec.decode_for(&cursor, &spec),
			Err(PaginationError::InvalidCursor(_))
		));
	}

	fn bson_value() -> impl Strategy<Value = Bson> {
		prop_oneof![
			any::<i32>().prop_map(Bson::Int32),
			any::<i64>().prop_map(Bson::Int64),
			(-1.0e12f64..1.0e12f64).prop_map(Bson::Double),
			".*".prop_map(Bson::String),
			any::<bool>().prop_map(Bson::Boolean),
			any::<i64>().prop_map(|ms| Bson::DateTime(DateTime::from_millis(ms))),
			any::<[u8; 12]>().prop_map(|b| Bson::ObjectId(ObjectId::from_bytes(b))),
			Just(Bson::Null),
		]
	}

	proptest! {
		#[test]
		fn prop_cursor_round_trip(
			values in proptest::collection::vec(bson_value(), 1..6),
			fingerprint in "[0-9a-f]{16}",
			signed in any::<bool>(),
		) {
			let codec = if signed {
				CursorCodec::with_secret_key(b"prop-secret-key-for-round-trips!")
			} else {
				CursorCodec::new()
			};
			let key = SeekKey::new(values);
			let fingerprint = Fingerprint::from(fingerprint);

			let cursor = codec.encode(&key, &fingerprint).unwrap();
			let (decoded_key, decoded_fp) = codec.decode(&cursor).unwrap();

			prop_assert_eq!(decoded_key, key);
			prop_assert_eq!(decoded_fp, fingerprint);
		}
	}
}
