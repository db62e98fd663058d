//! Length-prefixed multi-part message framing.
//!
//! Every message part travels with an 8-byte header:
//! - A 2-byte magic number ("FO") for stream synchronization
//! - A 4-byte little-endian payload length
//! - A 2-byte little-endian flags word; bit 0 (`MORE`) means another part of
//!   the same message follows
//!
//! Readers hand out whole parts or whole messages; no partial reads reach
//! user code.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{
    decode_frame, encode_frame, Frame, FrameConfig, DEFAULT_MAX_PAYLOAD, FLAG_MORE, HEADER_SIZE,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
