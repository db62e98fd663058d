//! The termination control frame.

/// Reserved single-part frame that tells the proxy, and then every worker, to stop.
///
/// It never collides with data: object frames are zlib streams and start with
/// `0x78`, array metadata is a JSON object and starts with `{`.
pub const SENTINEL: &[u8] = b"TERMINATE";

/// Whether a received frame is the termination sentinel.
///
/// Receivers check this before attempting to decode.
pub fn is_sentinel(frame: &[u8]) -> bool {
    frame == SENTINEL
}
