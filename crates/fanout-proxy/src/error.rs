use fanout_channel::ChannelError;

/// Errors that stop a proxy.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// The configuration was rejected before anything was bound.
    #[error("invalid proxy config: {0}")]
    InvalidConfig(String),

    /// An endpoint could not be bound.
    #[error("failed to bind proxy endpoint: {0}")]
    Bind(#[source] ChannelError),

    /// A receive or send failed while the proxy was running.
    #[error("proxy transport failure: {0}")]
    Transport(#[source] ChannelError),
}

pub type Result<T> = std::result::Result<T, ProxyError>;
