use std::fmt;
use std::thread::{self, JoinHandle};

use bytes::Bytes;
use fanout_channel::{Channel, InboundEndpoint, OutboundEndpoint};
use fanout_codec::{is_sentinel, SENTINEL};
use tracing::{debug, info, trace, warn};

use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};

/// Lifecycle of a proxy run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyState {
    /// Forwarding inbound messages to the outbound endpoint.
    Running,
    /// Broadcasting the sentinel, once per worker.
    Draining,
    /// Endpoints closed.
    Terminated,
}

impl fmt::Display for ProxyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProxyState::Running => "running",
            ProxyState::Draining => "draining",
            ProxyState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Counters from a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProxyReport {
    /// Data messages forwarded before the sentinel.
    pub forwarded: u64,
    /// Sentinels pushed to the outbound endpoint.
    pub sentinels_sent: usize,
}

/// Forwards inbound messages to a pool of workers until the sentinel arrives.
///
/// The proxy owns both endpoints. [`run`](Self::run) consumes it, so a proxy
/// runs at most once.
pub struct FanOutProxy<I, O> {
    worker_count: usize,
    inbound: I,
    outbound: O,
    state: ProxyState,
}

impl<I: InboundEndpoint, O: OutboundEndpoint> FanOutProxy<I, O> {
    /// Build a proxy from endpoints that are already bound.
    pub fn new(worker_count: usize, inbound: I, outbound: O) -> Result<Self> {
        if worker_count == 0 {
            return Err(ProxyError::InvalidConfig(
                "worker count must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            worker_count,
            inbound,
            outbound,
            state: ProxyState::Running,
        })
    }

    /// Validate `config` and bind both endpoints on `channel`.
    pub fn bind<C>(channel: &C, config: ProxyConfig) -> Result<Self>
    where
        C: Channel<Inbound = I, Outbound = O>,
    {
        config.validate()?;

        let mut inbound = channel.bind_in(&config.inbound).map_err(ProxyError::Bind)?;
        let outbound = match channel.bind_out(&config.outbound) {
            Ok(outbound) => outbound,
            Err(err) => {
                if let Err(close_err) = inbound.close() {
                    warn!(error = %close_err, "failed to release inbound after bind failure");
                }
                return Err(ProxyError::Bind(err));
            }
        };

        info!(
            workers = config.workers,
            inbound = %config.inbound,
            outbound = %config.outbound,
            "proxy bound"
        );
        Self::new(config.workers, inbound, outbound)
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn state(&self) -> ProxyState {
        self.state
    }

    /// Forward until the sentinel, broadcast it, then close both endpoints.
    ///
    /// Any receive or send failure stops the loop at once; the endpoints are
    /// still closed before the error is returned.
    pub fn run(mut self) -> Result<ProxyReport> {
        info!(workers = self.worker_count, "proxy running");
        let mut report = ProxyReport::default();

        let outcome = self.pump(&mut report);
        if let Err(err) = &outcome {
            warn!(state = %self.state, error = %err, "proxy stopped on failure");
        }

        self.transition(ProxyState::Terminated);
        let closed = self.close_endpoints();
        outcome?;
        closed?;

        info!(
            forwarded = report.forwarded,
            sentinels = report.sentinels_sent,
            "proxy terminated"
        );
        Ok(report)
    }

    fn pump(&mut self, report: &mut ProxyReport) -> Result<()> {
        loop {
            let parts = self.inbound.recv_multipart().map_err(ProxyError::Transport)?;
            if matches!(parts.as_slice(), [single] if is_sentinel(single)) {
                debug!(forwarded = report.forwarded, "sentinel received");
                break;
            }
            self.outbound
                .send_multipart(&parts)
                .map_err(ProxyError::Transport)?;
            report.forwarded += 1;
            trace!(parts = parts.len(), "forwarded message");
        }

        self.transition(ProxyState::Draining);
        let sentinel = [Bytes::from_static(SENTINEL)];
        for n in 1..=self.worker_count {
            self.outbound
                .send_multipart(&sentinel)
                .map_err(ProxyError::Transport)?;
            report.sentinels_sent += 1;
            debug!(sent = n, of = self.worker_count, "sentinel pushed");
        }
        Ok(())
    }

    fn transition(&mut self, next: ProxyState) {
        debug!(from = %self.state, to = %next, "proxy state change");
        self.state = next;
    }

    fn close_endpoints(&mut self) -> Result<()> {
        let inbound = self.inbound.close();
        let outbound = self.outbound.close();
        inbound.map_err(ProxyError::Transport)?;
        outbound.map_err(ProxyError::Transport)
    }
}

impl<I, O> FanOutProxy<I, O>
where
    I: InboundEndpoint + 'static,
    O: OutboundEndpoint + 'static,
{
    /// Run the proxy on a dedicated thread.
    pub fn spawn(self) -> std::io::Result<JoinHandle<Result<ProxyReport>>> {
        thread::Builder::new()
            .name("fanout-proxy".to_string())
            .spawn(move || self.run())
    }
}
