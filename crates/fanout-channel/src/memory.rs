//! In-process channel.
//!
//! A [`MemoryChannel`] is a hub of named addresses. Binding an address creates
//! the endpoint; producers and workers attach to it by the same address from
//! any thread.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tracing::debug;

use crate::balancer::{Balancer, Consumer};
use crate::endpoint::{ensure_parts, Channel, InboundEndpoint, OutboundEndpoint, PartCursor};
use crate::error::{ChannelError, Result};

type Message = Vec<Bytes>;

#[derive(Default)]
struct Hub {
    inbound: HashMap<String, Sender<Message>>,
    outbound: HashMap<String, Arc<Balancer<WorkerSink>>>,
}

/// In-process channel keyed by address strings.
///
/// Cloning is cheap; clones share the same address space.
#[derive(Clone, Default)]
pub struct MemoryChannel {
    hub: Arc<Mutex<Hub>>,
    min_consumers: usize,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the first send on outbound endpoints bound after this call wait
    /// until `count` workers have attached.
    pub fn with_min_consumers(mut self, count: usize) -> Self {
        self.min_consumers = count;
        self
    }

    fn hub(&self) -> MutexGuard<'_, Hub> {
        self.hub.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attach a producer to a bound inbound endpoint.
    pub fn connect_producer(&self, address: &str) -> Result<MemoryProducer> {
        let sender = self
            .hub()
            .inbound
            .get(address)
            .cloned()
            .ok_or_else(|| ChannelError::NotBound(address.to_string()))?;
        debug!(address, "producer attached");
        Ok(MemoryProducer {
            sender: Some(sender),
        })
    }

    /// Attach a worker to a bound outbound endpoint.
    pub fn connect_worker(&self, address: &str) -> Result<MemoryWorker> {
        let balancer = self
            .hub()
            .outbound
            .get(address)
            .cloned()
            .ok_or_else(|| ChannelError::NotBound(address.to_string()))?;

        let (tx, rx) = mpsc::channel();
        if !balancer.attach(WorkerSink { sender: tx }) {
            return Err(ChannelError::Closed);
        }
        Ok(MemoryWorker {
            receiver: Some(rx),
            cursor: PartCursor::default(),
        })
    }
}

impl Channel for MemoryChannel {
    type Inbound = MemoryInbound;
    type Outbound = MemoryOutbound;

    fn bind_in(&self, address: &str) -> Result<MemoryInbound> {
        let mut hub = self.hub();
        if hub.inbound.contains_key(address) {
            return Err(ChannelError::Bind {
                address: address.to_string(),
                reason: "address already in use".to_string(),
            });
        }
        let (tx, rx) = mpsc::channel();
        hub.inbound.insert(address.to_string(), tx);
        debug!(address, "memory inbound bound");

        Ok(MemoryInbound {
            address: address.to_string(),
            hub: Arc::clone(&self.hub),
            receiver: Some(rx),
            cursor: PartCursor::default(),
        })
    }

    fn bind_out(&self, address: &str) -> Result<MemoryOutbound> {
        let mut hub = self.hub();
        if hub.outbound.contains_key(address) {
            return Err(ChannelError::Bind {
                address: address.to_string(),
                reason: "address already in use".to_string(),
            });
        }
        let balancer = Arc::new(Balancer::new(self.min_consumers));
        hub.outbound
            .insert(address.to_string(), Arc::clone(&balancer));
        debug!(address, "memory outbound bound");

        Ok(MemoryOutbound {
            address: address.to_string(),
            hub: Arc::clone(&self.hub),
            balancer: Some(balancer),
        })
    }
}

/// Receiving endpoint bound on a [`MemoryChannel`].
pub struct MemoryInbound {
    address: String,
    hub: Arc<Mutex<Hub>>,
    receiver: Option<Receiver<Message>>,
    cursor: PartCursor,
}

impl MemoryInbound {
    fn fetch(receiver: &Option<Receiver<Message>>) -> Result<Message> {
        receiver
            .as_ref()
            .ok_or(ChannelError::Closed)?
            .recv()
            .map_err(|_| ChannelError::Closed)
    }
}

impl InboundEndpoint for MemoryInbound {
    fn recv(&mut self) -> Result<Bytes> {
        let receiver = &self.receiver;
        self.cursor.next_part(|| Self::fetch(receiver))
    }

    fn recv_multipart(&mut self) -> Result<Vec<Bytes>> {
        let receiver = &self.receiver;
        self.cursor.rest(|| Self::fetch(receiver))
    }

    fn close(&mut self) -> Result<()> {
        if self.receiver.take().is_some() {
            self.hub
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .inbound
                .remove(&self.address);
            self.cursor.clear();
            debug!(address = %self.address, "memory inbound closed");
        }
        Ok(())
    }
}

impl Drop for MemoryInbound {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Fan-out endpoint bound on a [`MemoryChannel`].
pub struct MemoryOutbound {
    address: String,
    hub: Arc<Mutex<Hub>>,
    balancer: Option<Arc<Balancer<WorkerSink>>>,
}

impl MemoryOutbound {
    /// Workers currently attached.
    pub fn connected(&self) -> usize {
        self.balancer.as_ref().map_or(0, |b| b.connected())
    }
}

impl OutboundEndpoint for MemoryOutbound {
    fn send_multipart(&mut self, parts: &[Bytes]) -> Result<()> {
        ensure_parts(parts)?;
        self.balancer
            .as_ref()
            .ok_or(ChannelError::Closed)?
            .dispatch(parts)
    }

    fn close(&mut self) -> Result<()> {
        if let Some(balancer) = self.balancer.take() {
            self.hub
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .outbound
                .remove(&self.address);
            balancer.close();
            debug!(address = %self.address, "memory outbound closed");
        }
        Ok(())
    }
}

impl Drop for MemoryOutbound {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

struct WorkerSink {
    sender: Sender<Message>,
}

impl Consumer for WorkerSink {
    fn deliver(&mut self, parts: &[Bytes]) -> Result<()> {
        self.sender
            .send(parts.to_vec())
            .map_err(|_| ChannelError::Closed)
    }
}

/// Producer attached to a [`MemoryInbound`].
pub struct MemoryProducer {
    sender: Option<Sender<Message>>,
}

impl OutboundEndpoint for MemoryProducer {
    fn send_multipart(&mut self, parts: &[Bytes]) -> Result<()> {
        ensure_parts(parts)?;
        self.sender
            .as_ref()
            .ok_or(ChannelError::Closed)?
            .send(parts.to_vec())
            .map_err(|_| ChannelError::Closed)
    }

    fn close(&mut self) -> Result<()> {
        self.sender = None;
        Ok(())
    }
}

/// Worker attached to a [`MemoryOutbound`].
///
/// Receives until the outbound endpoint closes, then fails with
/// [`ChannelError::Closed`].
pub struct MemoryWorker {
    receiver: Option<Receiver<Message>>,
    cursor: PartCursor,
}

impl InboundEndpoint for MemoryWorker {
    fn recv(&mut self) -> Result<Bytes> {
        let receiver = &self.receiver;
        self.cursor.next_part(|| MemoryInbound::fetch(receiver))
    }

    fn recv_multipart(&mut self) -> Result<Vec<Bytes>> {
        let receiver = &self.receiver;
        self.cursor.rest(|| MemoryInbound::fetch(receiver))
    }

    fn close(&mut self) -> Result<()> {
        self.receiver = None;
        self.cursor.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn parts(items: &[&'static [u8]]) -> Vec<Bytes> {
        items.iter().map(|p| Bytes::from_static(p)).collect()
    }

    #[test]
    fn producer_to_inbound_keeps_order_and_parts() {
        let channel = MemoryChannel::new();
        let mut inbound = channel.bind_in("jobs").unwrap();
        let mut producer = channel.connect_producer("jobs").unwrap();

        producer.send(b"a").unwrap();
        producer.send_multipart(&parts(&[b"meta", b"raw"])).unwrap();
        producer.send(b"c").unwrap();

        assert_eq!(inbound.recv_multipart().unwrap(), parts(&[b"a"]));
        assert_eq!(inbound.recv().unwrap().as_ref(), b"meta");
        assert_eq!(inbound.recv().unwrap().as_ref(), b"raw");
        assert_eq!(inbound.recv_multipart().unwrap(), parts(&[b"c"]));
    }

    #[test]
    fn outbound_round_robins_whole_messages() {
        let channel = MemoryChannel::new();
        let mut outbound = channel.bind_out("work").unwrap();
        let mut w1 = channel.connect_worker("work").unwrap();
        let mut w2 = channel.connect_worker("work").unwrap();
        assert_eq!(outbound.connected(), 2);

        outbound.send_multipart(&parts(&[b"m1", b"r1"])).unwrap();
        outbound.send(b"two").unwrap();
        outbound.send(b"three").unwrap();

        assert_eq!(w1.recv_multipart().unwrap(), parts(&[b"m1", b"r1"]));
        assert_eq!(w2.recv_multipart().unwrap(), parts(&[b"two"]));
        assert_eq!(w1.recv_multipart().unwrap(), parts(&[b"three"]));
    }

    #[test]
    fn workers_see_closed_after_outbound_closes() {
        let channel = MemoryChannel::new();
        let mut outbound = channel.bind_out("work").unwrap();
        let mut worker = channel.connect_worker("work").unwrap();

        outbound.send(b"last").unwrap();
        outbound.close().unwrap();
        outbound.close().unwrap();

        assert_eq!(worker.recv().unwrap().as_ref(), b"last");
        assert!(matches!(worker.recv().unwrap_err(), ChannelError::Closed));
        assert!(matches!(
            outbound.send(b"late").unwrap_err(),
            ChannelError::Closed
        ));
    }

    #[test]
    fn binding_twice_fails() {
        let channel = MemoryChannel::new();
        let _inbound = channel.bind_in("dup").unwrap();
        let err = channel.bind_in("dup").err().unwrap();
        assert!(matches!(err, ChannelError::Bind { .. }));

        let _outbound = channel.bind_out("dup").unwrap();
        let err = channel.bind_out("dup").err().unwrap();
        assert!(matches!(err, ChannelError::Bind { .. }));
    }

    #[test]
    fn closing_inbound_frees_the_address() {
        let channel = MemoryChannel::new();
        let mut inbound = channel.bind_in("reuse").unwrap();
        inbound.close().unwrap();
        assert!(matches!(
            channel.connect_producer("reuse").err().unwrap(),
            ChannelError::NotBound(_)
        ));
        assert!(channel.bind_in("reuse").is_ok());
    }

    #[test]
    fn unbound_address_rejected() {
        let channel = MemoryChannel::new();
        assert!(matches!(
            channel.connect_worker("nowhere").err().unwrap(),
            ChannelError::NotBound(_)
        ));
    }

    #[test]
    fn empty_message_rejected() {
        let channel = MemoryChannel::new();
        let _inbound = channel.bind_in("jobs").unwrap();
        let mut producer = channel.connect_producer("jobs").unwrap();
        assert!(matches!(
            producer.send_multipart(&[]).unwrap_err(),
            ChannelError::EmptyMessage
        ));
    }

    #[test]
    fn min_consumers_holds_first_send() {
        let channel = MemoryChannel::new().with_min_consumers(2);
        let mut outbound = channel.bind_out("gate").unwrap();
        let mut w1 = channel.connect_worker("gate").unwrap();

        let sender = thread::spawn(move || {
            outbound.send(b"go").unwrap();
            outbound.send(b"go").unwrap();
            outbound
        });

        let mut w2 = channel.connect_worker("gate").unwrap();
        let _outbound = sender.join().unwrap();

        assert_eq!(w1.recv().unwrap().as_ref(), b"go");
        assert_eq!(w2.recv().unwrap().as_ref(), b"go");
    }
}
