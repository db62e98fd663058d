/// Errors raised while building or encoding a payload.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// The value could not be serialized (e.g. a map with non-string keys).
    #[error("failed to serialize object: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The compressor failed.
    #[error("failed to compress object: {0}")]
    Compress(#[source] std::io::Error),

    /// The compression level is outside 0-9.
    #[error("invalid compression level {0} (expected 0-9)")]
    InvalidLevel(u32),

    /// The raw buffer does not match its dtype and shape.
    #[error("array data is {actual} bytes, shape and dtype require {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    /// The number of elements implied by the shape overflows `usize`.
    #[error("array shape {0:?} is too large")]
    ShapeOverflow(Vec<usize>),
}

/// Errors raised while decoding a received payload.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The object frame is not a valid zlib stream (corrupt or truncated).
    #[error("failed to decompress object frame: {0}")]
    Decompress(#[source] std::io::Error),

    /// The decompressed bytes do not deserialize into the requested type.
    #[error("failed to deserialize object: {0}")]
    Deserialize(#[source] serde_json::Error),

    /// The array metadata part is not a valid `{"dtype", "shape"}` map.
    #[error("invalid array metadata: {0}")]
    InvalidMetadata(#[source] serde_json::Error),

    /// The metadata names a dtype this codec does not know.
    #[error("unknown dtype {0:?}")]
    UnknownDtype(String),

    /// The number of elements implied by the shape overflows `usize`.
    #[error("array shape {0:?} is too large")]
    ShapeOverflow(Vec<usize>),

    /// The raw part length disagrees with shape and dtype.
    #[error("array data is {actual} bytes, metadata requires {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    /// The message has a part count no payload kind uses.
    #[error("unexpected message with {0} parts")]
    UnexpectedParts(usize),
}
