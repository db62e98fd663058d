//! Channel over Unix domain sockets.
//!
//! Addresses are filesystem paths. Each bound endpoint owns a listener that an
//! acceptor thread polls; the inbound side spawns one reader thread per
//! producer and funnels whole messages into a queue, the outbound side writes
//! each message to one connected worker.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use fanout_frame::{FrameConfig, FrameError, FrameReader, FrameWriter};
use fanout_transport::{IpcStream, UnixDomainSocket};
use tracing::{debug, info, warn};

use crate::balancer::{Balancer, Consumer};
use crate::endpoint::{ensure_parts, Channel, InboundEndpoint, OutboundEndpoint, PartCursor};
use crate::error::{ChannelError, Result};

const ACCEPT_POLL: Duration = Duration::from_millis(10);

type Message = Vec<Bytes>;

/// Unix domain socket channel.
#[derive(Debug, Clone, Default)]
pub struct UdsChannel {
    frame_config: FrameConfig,
    min_consumers: usize,
}

impl UdsChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Framing limits and timeouts for accepted connections.
    ///
    /// `max_payload_size` applies on both sides. `write_timeout` bounds each
    /// delivery to a worker; a worker that stalls past it is dropped and the
    /// message goes to the next one. `read_timeout` is not applied to producer
    /// connections: readers wait on idle producers until they disconnect or
    /// the endpoint closes.
    pub fn with_frame_config(mut self, config: FrameConfig) -> Self {
        self.frame_config = config;
        self
    }

    /// Make the first send on an outbound endpoint wait until `count` workers
    /// have connected.
    pub fn with_min_consumers(mut self, count: usize) -> Self {
        self.min_consumers = count;
        self
    }

    fn listen(address: &str) -> Result<UnixDomainSocket> {
        let bind_err = |reason: String| ChannelError::Bind {
            address: address.to_string(),
            reason,
        };
        let socket = UnixDomainSocket::bind(address).map_err(|e| bind_err(e.to_string()))?;
        socket
            .set_nonblocking(true)
            .map_err(|e| bind_err(e.to_string()))?;
        Ok(socket)
    }
}

impl Channel for UdsChannel {
    type Inbound = UdsInbound;
    type Outbound = UdsOutbound;

    fn bind_in(&self, address: &str) -> Result<UdsInbound> {
        let socket = Self::listen(address)?;
        let shared = Arc::new(Shared::default());
        let (tx, rx) = mpsc::channel();

        let acceptor = {
            let shared = Arc::clone(&shared);
            let config = self.frame_config.clone();
            spawn_acceptor("fanout-in-accept", address, socket, Arc::clone(&shared), move |stream| {
                spawn_reader(stream, &shared, &config, tx.clone());
            })?
        };

        Ok(UdsInbound {
            address: address.to_string(),
            shared,
            acceptor: Some(acceptor),
            receiver: Some(rx),
            cursor: PartCursor::default(),
        })
    }

    fn bind_out(&self, address: &str) -> Result<UdsOutbound> {
        let socket = Self::listen(address)?;
        let shared = Arc::new(Shared::default());
        let balancer = Arc::new(Balancer::new(self.min_consumers));

        let acceptor = {
            let balancer = Arc::clone(&balancer);
            let config = self.frame_config.clone();
            spawn_acceptor("fanout-out-accept", address, socket, Arc::clone(&shared), move |stream| {
                if let Some((uid, gid, pid)) = stream.peer_credentials() {
                    debug!(pid, uid, gid, "worker credentials");
                }
                match FrameWriter::with_config_ipc(stream, config.clone()) {
                    Ok(writer) => {
                        if !balancer.attach(FramedWorker { writer }) {
                            debug!("outbound closed; refusing worker");
                        }
                    }
                    Err(err) => warn!(error = %err, "failed to set up worker connection"),
                }
            })?
        };

        Ok(UdsOutbound {
            address: address.to_string(),
            shared,
            acceptor: Some(acceptor),
            balancer,
        })
    }
}

#[derive(Default)]
struct Shared {
    shutdown: AtomicBool,
    producers: Mutex<Vec<ProducerConn>>,
}

/// A producer connection: a handle for shutting the stream down and the
/// thread reading from it.
struct ProducerConn {
    stream: IpcStream,
    reader: JoinHandle<()>,
}

impl Shared {
    fn stop(&self, acceptor: Option<JoinHandle<()>>) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = acceptor {
            if handle.join().is_err() {
                warn!("acceptor thread panicked");
            }
        }

        let producers = std::mem::take(
            &mut *self.producers.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for conn in &producers {
            if let Err(err) = conn.stream.shutdown() {
                debug!(error = %err, "stream shutdown failed");
            }
        }
        for conn in producers {
            if conn.reader.join().is_err() {
                warn!("reader thread panicked");
            }
        }
    }
}

fn spawn_acceptor(
    name: &str,
    address: &str,
    socket: UnixDomainSocket,
    shared: Arc<Shared>,
    mut on_accept: impl FnMut(IpcStream) + Send + 'static,
) -> Result<JoinHandle<()>> {
    let address = address.to_string();
    let bind_address = address.clone();
    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            while !shared.shutdown.load(Ordering::SeqCst) {
                match socket.try_accept() {
                    Ok(Some(stream)) => on_accept(stream),
                    Ok(None) => thread::sleep(ACCEPT_POLL),
                    Err(err) => {
                        warn!(address = %address, error = %err, "accept failed");
                        thread::sleep(ACCEPT_POLL);
                    }
                }
            }
            debug!(address = %address, "acceptor stopped");
        })
        .map_err(|e| ChannelError::Bind {
            address: bind_address,
            reason: e.to_string(),
        })
}

fn spawn_reader(stream: IpcStream, shared: &Arc<Shared>, config: &FrameConfig, tx: Sender<Message>) {
    let handle = match stream.try_clone() {
        Ok(handle) => handle,
        Err(err) => {
            warn!(error = %err, "failed to register producer connection");
            return;
        }
    };
    let mut reader = FrameReader::with_config(stream, config.clone());

    let thread_shared = Arc::clone(shared);
    let spawned = thread::Builder::new()
        .name("fanout-in-reader".to_string())
        .spawn(move || loop {
            match reader.read_message() {
                Ok(parts) => {
                    if tx.send(parts).is_err() {
                        break;
                    }
                }
                Err(FrameError::ConnectionClosed) => {
                    debug!("producer disconnected");
                    break;
                }
                Err(err) if thread_shared.shutdown.load(Ordering::SeqCst) => {
                    debug!(error = %err, "reader stopped during shutdown");
                    break;
                }
                Err(err) => {
                    warn!(error = %err, "dropping producer after read error");
                    break;
                }
            }
        });

    match spawned {
        Ok(reader) => {
            let mut producers = shared.producers.lock().unwrap_or_else(PoisonError::into_inner);
            producers.retain(|conn| !conn.reader.is_finished());
            producers.push(ProducerConn {
                stream: handle,
                reader,
            });
            debug!(connected = producers.len(), "producer connected");
        }
        Err(err) => warn!(error = %err, "failed to spawn reader thread"),
    }
}

fn recv_error(err: FrameError) -> ChannelError {
    match err {
        FrameError::ConnectionClosed => ChannelError::Closed,
        other => ChannelError::Frame(other),
    }
}

/// Receiving endpoint bound to a socket path.
pub struct UdsInbound {
    address: String,
    shared: Arc<Shared>,
    acceptor: Option<JoinHandle<()>>,
    receiver: Option<Receiver<Message>>,
    cursor: PartCursor,
}

impl UdsInbound {
    /// The bound socket path.
    pub fn address(&self) -> &str {
        &self.address
    }

    fn fetch(receiver: &Option<Receiver<Message>>) -> Result<Message> {
        receiver
            .as_ref()
            .ok_or(ChannelError::Closed)?
            .recv()
            .map_err(|_| ChannelError::Closed)
    }
}

impl InboundEndpoint for UdsInbound {
    fn recv(&mut self) -> Result<Bytes> {
        let receiver = &self.receiver;
        self.cursor.next_part(|| Self::fetch(receiver))
    }

    fn recv_multipart(&mut self) -> Result<Vec<Bytes>> {
        let receiver = &self.receiver;
        self.cursor.rest(|| Self::fetch(receiver))
    }

    fn close(&mut self) -> Result<()> {
        if self.receiver.is_none() {
            return Ok(());
        }
        self.shared.stop(self.acceptor.take());
        self.receiver = None;
        self.cursor.clear();
        info!(address = %self.address, "inbound closed");
        Ok(())
    }
}

impl Drop for UdsInbound {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Fan-out endpoint bound to a socket path.
pub struct UdsOutbound {
    address: String,
    shared: Arc<Shared>,
    acceptor: Option<JoinHandle<()>>,
    balancer: Arc<Balancer<FramedWorker>>,
}

impl UdsOutbound {
    /// The bound socket path.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Workers currently connected.
    pub fn connected(&self) -> usize {
        self.balancer.connected()
    }
}

impl OutboundEndpoint for UdsOutbound {
    fn send_multipart(&mut self, parts: &[Bytes]) -> Result<()> {
        ensure_parts(parts)?;
        if self.acceptor.is_none() {
            return Err(ChannelError::Closed);
        }
        self.balancer.dispatch(parts)
    }

    fn close(&mut self) -> Result<()> {
        if self.acceptor.is_none() {
            return Ok(());
        }
        self.shared.stop(self.acceptor.take());
        self.balancer.close();
        info!(address = %self.address, "outbound closed");
        Ok(())
    }
}

impl Drop for UdsOutbound {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

struct FramedWorker {
    writer: FrameWriter<IpcStream>,
}

impl Consumer for FramedWorker {
    fn deliver(&mut self, parts: &[Bytes]) -> Result<()> {
        self.writer.send_multipart(parts).map_err(ChannelError::from)
    }
}

/// Producer connected to a [`UdsInbound`].
pub struct UdsProducer {
    writer: Option<FrameWriter<IpcStream>>,
}

impl UdsProducer {
    /// Connect to the inbound socket at `path`.
    pub fn connect(path: impl AsRef<Path>) -> Result<Self> {
        Self::connect_with_config(path, FrameConfig::default())
    }

    pub fn connect_with_config(path: impl AsRef<Path>, config: FrameConfig) -> Result<Self> {
        let stream = UnixDomainSocket::connect(path)?;
        let writer = FrameWriter::with_config_ipc(stream, config)?;
        Ok(Self {
            writer: Some(writer),
        })
    }
}

impl OutboundEndpoint for UdsProducer {
    fn send_multipart(&mut self, parts: &[Bytes]) -> Result<()> {
        ensure_parts(parts)?;
        self.writer
            .as_mut()
            .ok_or(ChannelError::Closed)?
            .send_multipart(parts)
            .map_err(ChannelError::from)
    }

    fn close(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer.get_ref().shutdown()?;
        }
        Ok(())
    }
}

/// Worker connected to a [`UdsOutbound`].
///
/// Reports [`ChannelError::Closed`] once the proxy closes its end.
pub struct UdsWorker {
    reader: Option<FrameReader<IpcStream>>,
    cursor: PartCursor,
}

impl UdsWorker {
    /// Connect to the outbound socket at `path`.
    pub fn connect(path: impl AsRef<Path>) -> Result<Self> {
        Self::connect_with_config(path, FrameConfig::default())
    }

    pub fn connect_with_config(path: impl AsRef<Path>, config: FrameConfig) -> Result<Self> {
        let stream = UnixDomainSocket::connect(path)?;
        let reader = FrameReader::with_config_ipc(stream, config)?;
        Ok(Self {
            reader: Some(reader),
            cursor: PartCursor::default(),
        })
    }

    fn fetch(reader: &mut Option<FrameReader<IpcStream>>) -> Result<Message> {
        reader
            .as_mut()
            .ok_or(ChannelError::Closed)?
            .read_message()
            .map_err(recv_error)
    }
}

impl InboundEndpoint for UdsWorker {
    fn recv(&mut self) -> Result<Bytes> {
        let reader = &mut self.reader;
        self.cursor.next_part(|| Self::fetch(reader))
    }

    fn recv_multipart(&mut self) -> Result<Vec<Bytes>> {
        let reader = &mut self.reader;
        self.cursor.rest(|| Self::fetch(reader))
    }

    fn close(&mut self) -> Result<()> {
        if let Some(reader) = self.reader.take() {
            reader.get_ref().shutdown()?;
        }
        self.cursor.clear();
        Ok(())
    }
}
