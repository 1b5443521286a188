//! Binary snapshot codec for the embedding set.
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! magic   4 bytes  b"RCEM"
//! version 1 byte   currently 1
//! dim     u32      vector dimension (0 iff count == 0)
//! count   u32      number of records
//! then per record:
//!   label_len u32
//!   label     label_len bytes of UTF-8
//!   vector    dim * 4 bytes of f32
//! ```
//!
//! The fixed `dim` header makes heterogeneous-length stores structurally
//! unrepresentable — a blob that decodes at all is dimension-uniform.
//! Raw f32 bytes round-trip exactly: `decode(encode(x)) == x`.

use crate::errors::{EmbeddingError, Result};
use crate::store::EmbeddingRecord;

const MAGIC: &[u8; 4] = b"RCEM";
const VERSION: u8 = 1;

/// Encode records into the snapshot wire format.
///
/// All records must share one dimension; the store enforces this before
/// calling in, so a violation here is an internal invariant break.
pub fn encode(records: &[EmbeddingRecord]) -> Result<Vec<u8>> {
    let dim = records.first().map_or(0, |r| r.vector.len());
    for r in records {
        if r.vector.len() != dim {
            return Err(EmbeddingError::Internal(format!(
                "snapshot encode: record '{}' has dimension {} but store dimension is {dim}",
                r.label,
                r.vector.len()
            )));
        }
    }

    let mut out = Vec::with_capacity(13 + records.iter().map(|r| 4 + r.label.len() + dim * 4).sum::<usize>());
    out.extend_from_slice(MAGIC);
    out.push(VERSION);
    out.extend_from_slice(&u32::try_from(dim).map_err(oversize)?.to_le_bytes());
    out.extend_from_slice(&u32::try_from(records.len()).map_err(oversize)?.to_le_bytes());

    for r in records {
        out.extend_from_slice(&u32::try_from(r.label.len()).map_err(oversize)?.to_le_bytes());
        out.extend_from_slice(r.label.as_bytes());
        out.extend_from_slice(bytemuck::cast_slice(&r.vector));
    }
    Ok(out)
}

/// Decode a snapshot blob back into records.
pub fn decode(data: &[u8]) -> Result<Vec<EmbeddingRecord>> {
    let mut cursor = Cursor { data, pos: 0 };

    let magic = cursor.take(4)?;
    if magic != MAGIC {
        return Err(EmbeddingError::Corrupt("bad magic".into()));
    }
    let version = cursor.take(1)?[0];
    if version != VERSION {
        return Err(EmbeddingError::Corrupt(format!(
            "unsupported snapshot version {version}"
        )));
    }

    let dim = cursor.read_u32()? as usize;
    let count = cursor.read_u32()? as usize;
    if count > 0 && dim == 0 {
        return Err(EmbeddingError::Corrupt(
            "non-empty snapshot with zero dimension".into(),
        ));
    }

    let mut records = Vec::with_capacity(count);
    for _ in 0..count {
        let label_len = cursor.read_u32()? as usize;
        let label_bytes = cursor.take(label_len)?;
        let label = std::str::from_utf8(label_bytes)
            .map_err(|_| EmbeddingError::Corrupt("label is not valid UTF-8".into()))?
            .to_string();

        let vec_bytes = cursor.take(dim * 4)?;
        // pod_collect_to_vec copies, so source alignment doesn't matter.
        let vector: Vec<f32> = bytemuck::pod_collect_to_vec(vec_bytes);
        records.push(EmbeddingRecord { label, vector });
    }

    if cursor.pos != data.len() {
        return Err(EmbeddingError::Corrupt(format!(
            "{} trailing bytes after last record",
            data.len() - cursor.pos
        )));
    }
    Ok(records)
}

fn oversize<E>(_: E) -> EmbeddingError {
    EmbeddingError::Internal("snapshot field exceeds u32 range".into())
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| EmbeddingError::Corrupt("truncated snapshot".into()))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(label: &str, vector: Vec<f32>) -> EmbeddingRecord {
        EmbeddingRecord {
            label: label.to_string(),
            vector,
        }
    }

    #[test]
    fn empty_round_trip() {
        let encoded = encode(&[]).unwrap();
        let decoded = decode(&encoded).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn round_trip_preserves_order_and_values() {
        let records = vec![
            record("alice", vec![0.0, -1.5, 3.25]),
            record("bob", vec![10.0, 10.0, 10.0]),
            record("alice", vec![0.1, 0.2, 0.3]),
        ];
        let decoded = decode(&encode(&records).unwrap()).unwrap();
        assert_eq!(decoded, records);
    }

    #[test]
    fn round_trip_exact_f32_bits() {
        let records = vec![record(
            "edge",
            vec![f32::MIN_POSITIVE, f32::MAX, -0.0, 1e-38],
        )];
        let decoded = decode(&encode(&records).unwrap()).unwrap();
        assert_eq!(
            decoded[0].vector[2].to_bits(),
            (-0.0f32).to_bits(),
            "negative zero must survive"
        );
        assert_eq!(decoded, records);
    }

    #[test]
    fn unicode_labels() {
        let records = vec![record("zoë-万", vec![1.0])];
        let decoded = decode(&encode(&records).unwrap()).unwrap();
        assert_eq!(decoded[0].label, "zoë-万");
    }

    #[test]
    fn encode_rejects_mixed_dimensions() {
        let records = vec![record("a", vec![1.0, 2.0]), record("b", vec![1.0])];
        assert!(matches!(
            encode(&records),
            Err(EmbeddingError::Internal(_))
        ));
    }

    #[test]
    fn decode_rejects_bad_magic() {
        assert!(matches!(
            decode(b"XXXX\x01\0\0\0\0\0\0\0\0"),
            Err(EmbeddingError::Corrupt(_))
        ));
    }

    #[test]
    fn decode_rejects_bad_version() {
        let mut data = encode(&[]).unwrap();
        data[4] = 99;
        assert!(matches!(decode(&data), Err(EmbeddingError::Corrupt(_))));
    }

    #[test]
    fn decode_rejects_truncation() {
        let data = encode(&[record("alice", vec![1.0, 2.0, 3.0])]).unwrap();
        for cut in [0, 3, 5, 10, data.len() - 1] {
            assert!(
                matches!(decode(&data[..cut]), Err(EmbeddingError::Corrupt(_))),
                "cut at {cut} should be corrupt"
            );
        }
    }

    #[test]
    fn decode_rejects_trailing_garbage() {
        let mut data = encode(&[record("alice", vec![1.0])]).unwrap();
        data.push(0xFF);
        assert!(matches!(decode(&data), Err(EmbeddingError::Corrupt(_))));
    }

    #[test]
    fn decode_rejects_invalid_utf8_label() {
        // Hand-build: one record, dim 0 would be rejected, so dim 1.
        let mut data = Vec::new();
        data.extend_from_slice(b"RCEM");
        data.push(1);
        data.extend_from_slice(&1u32.to_le_bytes()); // dim
        data.extend_from_slice(&1u32.to_le_bytes()); // count
        data.extend_from_slice(&2u32.to_le_bytes()); // label_len
        data.extend_from_slice(&[0xFF, 0xFE]); // invalid UTF-8
        data.extend_from_slice(&1.0f32.to_le_bytes());
        assert!(matches!(decode(&data), Err(EmbeddingError::Corrupt(_))));
    }

    proptest! {
        #[test]
        fn round_trip_arbitrary_records(
            labels in prop::collection::vec("[a-z]{1,12}", 0..8),
            dim in 1usize..16,
        ) {
            let records: Vec<EmbeddingRecord> = labels
                .iter()
                .enumerate()
                .map(|(i, label)| record(label, (0..dim).map(|j| (i * dim + j) as f32 * 0.5 - 3.0).collect()))
                .collect();
            let decoded = decode(&encode(&records).unwrap()).unwrap();
            prop_assert_eq!(decoded, records);
        }
    }
}
