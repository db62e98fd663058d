//! Payload-level helpers on top of the raw endpoint traits.

use bytes::Bytes;
use fanout_codec::{decode_message, encode_array, encode_object, NdArray, Payload, SENTINEL};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::endpoint::{InboundEndpoint, OutboundEndpoint};
use crate::error::Result;

/// Send typed payloads through any outbound endpoint.
pub trait SendPayloadExt: OutboundEndpoint {
    /// Send `value` as a single compressed object frame.
    fn send_object<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let frame = encode_object(value)?;
        self.send_multipart(&[Bytes::from(frame)])
    }

    /// Send `array` as a two-part message.
    fn send_array(&mut self, array: &NdArray) -> Result<()> {
        let (meta, raw) = encode_array(array);
        self.send_multipart(&[Bytes::from(meta), raw])
    }

    /// Send the termination sentinel.
    fn send_sentinel(&mut self) -> Result<()> {
        self.send_multipart(&[Bytes::from_static(SENTINEL)])
    }
}

impl<E: OutboundEndpoint + ?Sized> SendPayloadExt for E {}

/// Receive and classify whole messages.
pub trait RecvPayloadExt: InboundEndpoint {
    /// Receive the next message and decode it.
    fn recv_payload<T: DeserializeOwned>(&mut self) -> Result<Payload<T>> {
        let parts = self.recv_multipart()?;
        Ok(decode_message(&parts)?)
    }
}

impl<E: InboundEndpoint + ?Sized> RecvPayloadExt for E {}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::endpoint::Channel;
    use crate::error::ChannelError;
    use crate::memory::MemoryChannel;

    #[test]
    fn payloads_roundtrip_through_memory_channel() {
        let channel = MemoryChannel::new();
        let mut inbound = channel.bind_in("payloads").unwrap();
        let mut producer = channel.connect_producer("payloads").unwrap();

        let array = NdArray::from_slice(&[1i32, 2, 3], vec![3]).unwrap();
        producer.send_object(&json!({"x": 1})).unwrap();
        producer.send_array(&array).unwrap();
        producer.send_sentinel().unwrap();

        assert_eq!(
            inbound.recv_payload::<Value>().unwrap(),
            Payload::Object(json!({"x": 1}))
        );
        assert_eq!(
            inbound.recv_payload::<Value>().unwrap(),
            Payload::Array(array)
        );
        assert!(inbound.recv_payload::<Value>().unwrap().is_terminate());
    }

    #[test]
    fn undecodable_message_is_decode_error() {
        let channel = MemoryChannel::new();
        let mut inbound = channel.bind_in("junk").unwrap();
        let mut producer = channel.connect_producer("junk").unwrap();
        producer.send(b"not zlib").unwrap();

        let err = inbound.recv_payload::<Value>().unwrap_err();
        assert!(matches!(err, ChannelError::Decode(_)));
    }
}
