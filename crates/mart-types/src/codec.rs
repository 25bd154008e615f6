//! Snapshot-hash codec: encodes an entity or relationship's persisted state
//! as an opaque, URL-safe, losslessly round-trippable blob.
//!
//! The source encodes snapshots as "zip-base64 of JSON text". That
//! representation is load-bearing only in that it must round-trip; any
//! deterministic encoding is acceptable provided both write and read sides
//! agree (spec §9). This codec instead uses CBOR (more compact than JSON,
//! still self-describing) wrapped in deflate, then URL-safe base64 without
//! padding so the result can be used directly as a query parameter or a
//! text column without further escaping.
//!
//! # Performance
//!
//! Time complexity is linear in the size of the serialized value; deflate
//! compression dominates the cost for anything but tiny entities.
//!
//! # Errors
//!
//! Encoding fails if CBOR serialization fails (it does not, for the plain
//! data types in [`crate::model`], except on allocation failure). Decoding
//! fails with [`Report<SnapshotCodecError>`] if the base64, deflate, or CBOR
//! layer rejects the input — which means the stored snapshot was corrupted
//! or was written by an incompatible version of this codec.

use std::io::{Read as _, Write as _};

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use error_stack::{Report, ResultExt as _};
use flate2::Compression;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use serde::{Serialize, de::DeserializeOwned};

#[derive(Debug, thiserror::Error)]
pub enum SnapshotCodecError {
    #[error("failed to serialize value to CBOR")]
    Serialize,
    #[error("failed to deserialize value from CBOR")]
    Deserialize,
    #[error("failed to deflate-compress the encoded value")]
    Compress,
    #[error("failed to inflate the stored snapshot")]
    Decompress,
    #[error("stored snapshot is not valid base64")]
    Base64,
}

/// Encodes `value` as a snapshot hash: CBOR, deflate, URL-safe base64.
///
/// # Errors
/// Returns [`SnapshotCodecError::Serialize`] or
/// [`SnapshotCodecError::Compress`] if either stage fails.
pub fn encode_snapshot<T: Serialize>(value: &T) -> Result<String, Report<SnapshotCodecError>> {
    let mut cbor = Vec::new();
    ciborium::into_writer(value, &mut cbor).change_context(SnapshotCodecError::Serialize)?;

    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&cbor)
        .change_context(SnapshotCodecError::Compress)?;
    let compressed = encoder
        .finish()
        .change_context(SnapshotCodecError::Compress)?;

    Ok(URL_SAFE_NO_PAD.encode(compressed))
}

/// The total inverse of [`encode_snapshot`]: `parseHash(hash(e)) = e` for
/// every entity/relationship (spec §8 invariant 5).
///
/// # Errors
/// Returns the matching [`SnapshotCodecError`] variant for whichever stage
/// (base64, inflate, CBOR) first rejects `hash`.
pub fn decode_snapshot<T: DeserializeOwned>(
    hash: &str,
) -> Result<T, Report<SnapshotCodecError>> {
    let compressed = URL_SAFE_NO_PAD
        .decode(hash)
        .change_context(SnapshotCodecError::Base64)?;

    let mut decoder = DeflateDecoder::new(&compressed[..]);
    let mut cbor = Vec::new();
    decoder
        .read_to_end(&mut cbor)
        .change_context(SnapshotCodecError::Decompress)?;

    ciborium::from_reader(&cbor[..]).change_context(SnapshotCodecError::Deserialize)
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    struct Sample {
        id: i64,
        tags: Vec<String>,
    }

    #[test]
    fn snapshot_round_trips() {
        let value = Sample {
            id: 42,
            tags: vec!["FOO".to_owned(), "BAR".to_owned()],
        };
        let hash = encode_snapshot(&value).expect("should encode");
        let decoded: Sample = decode_snapshot(&hash).expect("should decode");
        assert_eq!(decoded, value);
    }

    #[test]
    fn snapshot_hash_is_url_safe() {
        let value = Sample {
            id: 1,
            tags: vec!["needs/escaping+here".to_owned()],
        };
        let hash = encode_snapshot(&value).expect("should encode");
        assert!(
            hash.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
            "hash contains non-URL-safe characters: {hash}"
        );
    }

    #[test]
    fn decode_rejects_garbage() {
        let result: Result<Sample, _> = decode_snapshot("not valid base64 at all!!");
        assert!(result.is_err());
    }
}
