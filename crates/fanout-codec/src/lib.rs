//! Payload codec for fanout messages.
//!
//! Two payload kinds travel through the proxy:
//! - **Object frames**: one part, `zlib(json(value))`.
//! - **Array messages**: two parts, a JSON metadata map (`dtype`, `shape`)
//!   followed by the raw row-major element bytes.
//!
//! A third, reserved single-part frame ([`SENTINEL`]) tells workers to stop.
//! Every function here is a pure transform; sending is the channel's job.

pub mod array;
pub mod dtype;
pub mod error;
pub mod message;
pub mod object;
pub mod sentinel;

pub use array::{decode_array, encode_array, ArrayMeta, NdArray};
pub use dtype::{Dtype, Element};
pub use error::{DecodeError, EncodeError};
pub use message::{decode_message, Payload};
pub use object::{decode_object, encode_object, encode_object_with_level};
pub use sentinel::{is_sentinel, SENTINEL};
