use std::collections::VecDeque;

use bytes::Bytes;

use crate::error::{ChannelError, Result};

/// Receiving side of a channel.
///
/// Messages are made of one or more parts. [`recv`](Self::recv) hands out one
/// part at a time, [`recv_multipart`](Self::recv_multipart) the rest of the
/// current message (or the whole next one). Both block without timeout.
pub trait InboundEndpoint: Send {
    /// Receive the next part.
    fn recv(&mut self) -> Result<Bytes>;

    /// Receive the remaining parts of the current message.
    fn recv_multipart(&mut self) -> Result<Vec<Bytes>>;

    /// Release the endpoint. Idempotent.
    fn close(&mut self) -> Result<()>;
}

/// Sending side of a channel.
///
/// Each message is delivered whole to exactly one consumer.
pub trait OutboundEndpoint: Send {
    /// Send a single-part message.
    fn send(&mut self, frame: &[u8]) -> Result<()> {
        self.send_multipart(&[Bytes::copy_from_slice(frame)])
    }

    /// Send a message made of one or more parts.
    fn send_multipart(&mut self, parts: &[Bytes]) -> Result<()>;

    /// Release the endpoint. Idempotent.
    fn close(&mut self) -> Result<()>;
}

/// Binds the two endpoint roles by address.
pub trait Channel {
    type Inbound: InboundEndpoint;
    type Outbound: OutboundEndpoint;

    /// Bind the receiving role. Fails with [`ChannelError::Bind`].
    fn bind_in(&self, address: &str) -> Result<Self::Inbound>;

    /// Bind the fan-out sending role. Fails with [`ChannelError::Bind`].
    fn bind_out(&self, address: &str) -> Result<Self::Outbound>;
}

/// Splits whole received messages into parts for `recv`.
#[derive(Debug, Default)]
pub(crate) struct PartCursor {
    pending: VecDeque<Bytes>,
}

impl PartCursor {
    pub(crate) fn next_part(
        &mut self,
        fetch: impl FnOnce() -> Result<Vec<Bytes>>,
    ) -> Result<Bytes> {
        if self.pending.is_empty() {
            self.pending.extend(fetch()?);
        }
        self.pending.pop_front().ok_or(ChannelError::EmptyMessage)
    }

    pub(crate) fn rest(&mut self, fetch: impl FnOnce() -> Result<Vec<Bytes>>) -> Result<Vec<Bytes>> {
        if self.pending.is_empty() {
            fetch()
        } else {
            Ok(self.pending.drain(..).collect())
        }
    }

    pub(crate) fn clear(&mut self) {
        self.pending.clear();
    }
}

pub(crate) fn ensure_parts(parts: &[Bytes]) -> Result<()> {
    if parts.is_empty() {
        return Err(ChannelError::EmptyMessage);
    }
    Ok(())
}
