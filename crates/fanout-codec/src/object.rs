//! Compressed object frames: `zlib(json(value))`.

use std::io::{ErrorKind, Write};

use flate2::write::ZlibEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{DecodeError, EncodeError};

/// Serialize `value` to JSON and zlib-compress it at the default level.
pub fn encode_object<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, EncodeError> {
    compress(value, Compression::default())
}

/// Like [`encode_object`] with an explicit zlib level (0 = store, 9 = best).
pub fn encode_object_with_level<T: Serialize + ?Sized>(
    value: &T,
    level: u32,
) -> Result<Vec<u8>, EncodeError> {
    if level > 9 {
        return Err(EncodeError::InvalidLevel(level));
    }
    compress(value, Compression::new(level))
}

fn compress<T: Serialize + ?Sized>(value: &T, level: Compression) -> Result<Vec<u8>, EncodeError> {
    let json = serde_json::to_vec(value).map_err(EncodeError::Serialize)?;
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(json.len() / 2 + 16), level);
    encoder.write_all(&json).map_err(EncodeError::Compress)?;
    encoder.finish().map_err(EncodeError::Compress)
}

/// Decompress an object frame and deserialize it as `T`.
pub fn decode_object<T: DeserializeOwned>(frame: &[u8]) -> Result<T, DecodeError> {
    let json = inflate(frame)?;
    serde_json::from_slice(&json).map_err(DecodeError::Deserialize)
}

/// Inflate a complete zlib stream; input that stops short of the stream end
/// is an error rather than a shorter result.
fn inflate(frame: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut inflater = Decompress::new(true);
    let mut out = Vec::with_capacity(frame.len().saturating_mul(4).max(64));
    loop {
        let consumed = (inflater.total_in() as usize).min(frame.len());
        let status = inflater
            .decompress_vec(&frame[consumed..], &mut out, FlushDecompress::Finish)
            .map_err(|err| DecodeError::Decompress(std::io::Error::new(ErrorKind::InvalidData, err)))?;
        match status {
            Status::StreamEnd => return Ok(out),
            Status::Ok | Status::BufError if out.len() == out.capacity() => {
                out.reserve(out.capacity());
            }
            Status::Ok | Status::BufError => {
                return Err(DecodeError::Decompress(std::io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "object frame ends before the zlib stream does",
                )));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};

    use serde::Deserialize;
    use serde_json::{json, Value};

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Task {
        id: u64,
        name: String,
        weights: Vec<f64>,
        tags: BTreeMap<String, bool>,
    }

    #[test]
    fn roundtrip_dynamic_values() {
        for value in [json!({"x": 1}), json!([1, 2, 3]), json!(null), json!("text")] {
            let frame = encode_object(&value).unwrap();
            let decoded: Value = decode_object(&frame).unwrap();
            assert_eq!(decoded, value);
        }
    }

    #[test]
    fn roundtrip_typed_struct() {
        let task = Task {
            id: 7,
            name: "resize".to_string(),
            weights: vec![0.25, -1.5],
            tags: BTreeMap::from([("urgent".to_string(), true)]),
        };
        let frame = encode_object(&task).unwrap();
        assert_eq!(decode_object::<Task>(&frame).unwrap(), task);
    }

    #[test]
    fn frames_are_zlib_streams() {
        let frame = encode_object(&json!({"x": 1})).unwrap();
        assert_eq!(frame[0], 0x78);
    }

    #[test]
    fn level_zero_still_decodes() {
        let value = json!({"payload": "a".repeat(512)});
        let stored = encode_object_with_level(&value, 0).unwrap();
        let best = encode_object_with_level(&value, 9).unwrap();
        assert!(best.len() < stored.len());
        assert_eq!(decode_object::<Value>(&stored).unwrap(), value);
    }

    #[test]
    fn level_out_of_range_rejected() {
        let err = encode_object_with_level(&json!(1), 10).unwrap_err();
        assert!(matches!(err, EncodeError::InvalidLevel(10)));
    }

    #[test]
    fn non_string_map_keys_fail_to_encode() {
        let value: HashMap<(u8, u8), u8> = HashMap::from([((1, 2), 3)]);
        let err = encode_object(&value).unwrap_err();
        assert!(matches!(err, EncodeError::Serialize(_)));
    }

    #[test]
    fn truncated_frame_fails_to_decompress() {
        let frame = encode_object(&json!({"x": [1, 2, 3, 4, 5]})).unwrap();
        let err = decode_object::<Value>(&frame[..frame.len() / 2]).unwrap_err();
        assert!(matches!(err, DecodeError::Decompress(_)));
    }

    #[test]
    fn garbage_fails_to_decompress() {
        let err = decode_object::<Value>(b"definitely not zlib").unwrap_err();
        assert!(matches!(err, DecodeError::Decompress(_)));
    }

    #[test]
    fn wrong_type_fails_to_deserialize() {
        let frame = encode_object(&json!([1, 2, 3])).unwrap();
        let err = decode_object::<Task>(&frame).unwrap_err();
        assert!(matches!(err, DecodeError::Deserialize(_)));
    }
}
