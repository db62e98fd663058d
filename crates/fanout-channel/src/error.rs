/// Errors that can occur in channel operations.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// An endpoint could not be bound to its address.
    #[error("failed to bind {address}: {reason}")]
    Bind { address: String, reason: String },

    /// A producer or worker could not attach to an address.
    #[error("nothing bound at {0}")]
    NotBound(String),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] fanout_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] fanout_frame::FrameError),

    /// The endpoint, or its peer, has been closed.
    #[error("endpoint closed")]
    Closed,

    /// Every consumer of an outbound endpoint has gone away.
    #[error("all consumers disconnected")]
    NoConsumers,

    /// A message must carry at least one part.
    #[error("cannot send a message with no parts")]
    EmptyMessage,

    /// Payload could not be encoded.
    #[error("encode error: {0}")]
    Encode(#[from] fanout_codec::EncodeError),

    /// Payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] fanout_codec::DecodeError),
}

pub type Result<T> = std::result::Result<T, ChannelError>;
