//! Fan-out proxy.
//!
//! Receives work items on one inbound endpoint and redistributes them to a
//! fixed pool of workers behind an outbound endpoint. When the termination
//! sentinel arrives it is replicated once per worker, so every worker sees its
//! own stop signal, and both endpoints are closed.
//!
//! ```no_run
//! use fanout_channel::UdsChannel;
//! use fanout_proxy::{FanOutProxy, ProxyConfig};
//!
//! let config = ProxyConfig {
//!     workers: 4,
//!     ..ProxyConfig::default()
//! };
//! let channel = UdsChannel::new().with_min_consumers(config.workers);
//! let proxy = FanOutProxy::bind(&channel, config)?;
//! let report = proxy.run()?;
//! println!("forwarded {} messages", report.forwarded);
//! # Ok::<(), fanout_proxy::ProxyError>(())
//! ```

pub mod config;
pub mod error;
pub mod proxy;

pub use config::ProxyConfig;
pub use error::{ProxyError, Result};
pub use proxy::{FanOutProxy, ProxyReport, ProxyState};
