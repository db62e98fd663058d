//! Local socket transport for fanout.
//!
//! Provides bind/accept/connect over Unix domain sockets and the
//! [`IpcStream`] byte stream that the framing layer reads from and writes to.
//! Message boundaries, load balancing and termination live in the layers above.

pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use traits::IpcStream;

#[cfg(unix)]
pub use uds::UnixDomainSocket;
