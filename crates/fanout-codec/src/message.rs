//! Classification of received messages into payloads.

use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::array::{decode_array, NdArray};
use crate::error::DecodeError;
use crate::object::decode_object;
use crate::sentinel::is_sentinel;

/// A decoded message.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload<T> {
    /// The termination sentinel.
    Terminate,
    /// A single-part object frame.
    Object(T),
    /// A two-part array message.
    Array(NdArray),
}

impl<T> Payload<T> {
    pub fn is_terminate(&self) -> bool {
        matches!(self, Payload::Terminate)
    }
}

/// Decode the parts of one message.
///
/// The sentinel is recognised before any decoding is attempted.
pub fn decode_message<T: DeserializeOwned>(parts: &[Bytes]) -> Result<Payload<T>, DecodeError> {
    match parts {
        [single] if is_sentinel(single) => Ok(Payload::Terminate),
        [single] => decode_object(single).map(Payload::Object),
        [meta, raw] => decode_array(meta, raw.clone()).map(Payload::Array),
        _ => Err(DecodeError::UnexpectedParts(parts.len())),
    }
}
