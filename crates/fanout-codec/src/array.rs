//! Typed numeric buffers and their two-part wire encoding.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::dtype::{Dtype, Element};
use crate::error::{DecodeError, EncodeError};

/// Metadata part of an array message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayMeta {
    pub dtype: String,
    pub shape: Vec<usize>,
}

/// A contiguous, row-major, native-endian buffer of fixed-width elements.
///
/// The invariant `data.len() == product(shape) * dtype.width()` holds for
/// every value of this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NdArray {
    dtype: Dtype,
    shape: Vec<usize>,
    data: Bytes,
}

impl NdArray {
    /// Wrap raw element bytes, checking them against `dtype` and `shape`.
    pub fn new(
        dtype: Dtype,
        shape: impl Into<Vec<usize>>,
        data: impl Into<Bytes>,
    ) -> Result<Self, EncodeError> {
        let shape = shape.into();
        let data = data.into();
        let expected =
            byte_len(dtype, &shape).ok_or_else(|| EncodeError::ShapeOverflow(shape.clone()))?;
        if data.len() != expected {
            return Err(EncodeError::LengthMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { dtype, shape, data })
    }

    /// Copy typed values into a new array of the matching dtype.
    pub fn from_slice<T: Element>(
        values: &[T],
        shape: impl Into<Vec<usize>>,
    ) -> Result<Self, EncodeError> {
        let bytes: &[u8] = bytemuck::cast_slice(values);
        Self::new(T::DTYPE, shape, Bytes::copy_from_slice(bytes))
    }

    /// Copy the elements out as `T`, or `None` when `T` does not match the dtype.
    pub fn to_vec<T: Element>(&self) -> Option<Vec<T>> {
        (T::DTYPE == self.dtype).then(|| bytemuck::pod_collect_to_vec(&self.data[..]))
    }

    pub fn dtype(&self) -> Dtype {
        self.dtype
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len() / self.dtype.width()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The raw element bytes exactly as they travel on the wire.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Bytes {
        self.data
    }

    /// Metadata describing this array.
    pub fn meta(&self) -> ArrayMeta {
        ArrayMeta {
            dtype: self.dtype.as_str().to_string(),
            shape: self.shape.clone(),
        }
    }
}

fn byte_len(dtype: Dtype, shape: &[usize]) -> Option<usize> {
    shape
        .iter()
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))?
        .checked_mul(dtype.width())
}

/// Encode an array as `(metadata, raw)` parts.
///
/// The metadata part is UTF-8 JSON `{"dtype": ..., "shape": [...]}`; the raw
/// part is the element buffer, uncompressed and untransformed.
pub fn encode_array(array: &NdArray) -> (Vec<u8>, Bytes) {
    let meta = serde_json::json!({
        "dtype": array.dtype.as_str(),
        "shape": array.shape,
    });
    (meta.to_string().into_bytes(), array.data.clone())
}

/// Rebuild an array from its metadata and raw parts.
pub fn decode_array(metadata: &[u8], raw: impl Into<Bytes>) -> Result<NdArray, DecodeError> {
    let meta: ArrayMeta = serde_json::from_slice(metadata).map_err(DecodeError::InvalidMetadata)?;
    let dtype: Dtype = meta.dtype.parse()?;
    let raw = raw.into();

    let expected =
        byte_len(dtype, &meta.shape).ok_or_else(|| DecodeError::ShapeOverflow(meta.shape.clone()))?;
    if raw.len() != expected {
        return Err(DecodeError::SizeMismatch {
            expected,
            actual: raw.len(),
        });
    }

    Ok(NdArray {
        dtype,
        shape: meta.shape,
        data: raw,
    })
}
