//! Fan-out work distribution over local sockets.
//!
//! A proxy receives work items from producers and hands each one to exactly
//! one worker in a fixed pool. A reserved sentinel shuts the pool down: the
//! proxy replicates it once per worker, then closes.
//!
//! # Crate Structure
//!
//! - [`transport`]: Unix domain socket listener and stream
//! - [`frame`]: length-prefixed multi-part framing
//! - [`codec`]: object, array and sentinel payload encoding
//! - [`channel`]: inbound/outbound endpoints (in-memory and UDS)
//! - [`proxy`]: the fan-out proxy and its configuration

/// Re-export transport types.
pub mod transport {
    pub use fanout_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use fanout_frame::*;
}

/// Re-export codec types.
pub mod codec {
    pub use fanout_codec::*;
}

/// Re-export channel types.
pub mod channel {
    pub use fanout_channel::*;
}

/// Re-export proxy types.
pub mod proxy {
    pub use fanout_proxy::*;
}

pub use fanout_codec::{
    decode_array, decode_message, decode_object, encode_array, encode_object, is_sentinel,
    NdArray, Payload, SENTINEL,
};
pub use fanout_proxy::{FanOutProxy, ProxyConfig, ProxyError, ProxyReport, ProxyState};
