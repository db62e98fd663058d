//! Endpoint abstraction consumed by the fanout proxy.
//!
//! A [`Channel`] binds two endpoint roles by address:
//! - an [`InboundEndpoint`] that receives messages from any number of producers
//! - an [`OutboundEndpoint`] that delivers each message whole to exactly one
//!   of its connected workers, round-robin
//!
//! Two channels ship with the crate: [`MemoryChannel`] for in-process use and
//! [`UdsChannel`] over Unix domain sockets. Payload helpers for producers and
//! workers live in [`ext`].

mod balancer;
pub mod endpoint;
pub mod error;
pub mod ext;
pub mod memory;
#[cfg(unix)]
pub mod uds;

pub use endpoint::{Channel, InboundEndpoint, OutboundEndpoint};
pub use error::{ChannelError, Result};
pub use ext::{RecvPayloadExt, SendPayloadExt};
pub use memory::{MemoryChannel, MemoryInbound, MemoryOutbound, MemoryProducer, MemoryWorker};
#[cfg(unix)]
pub use uds::{UdsChannel, UdsInbound, UdsOutbound, UdsProducer, UdsWorker};
