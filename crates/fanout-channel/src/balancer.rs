//! Round-robin delivery across the consumers of an outbound endpoint.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tracing::{debug, warn};

use crate::error::{ChannelError, Result};

/// One connected consumer.
pub(crate) trait Consumer: Send {
    fn deliver(&mut self, parts: &[Bytes]) -> Result<()>;
}

struct State<C> {
    consumers: Vec<C>,
    next: usize,
    attached: usize,
    closed: bool,
}

/// Consumers shared between an outbound endpoint and its attach side
/// (acceptor thread or in-process hub).
///
/// Dispatch blocks until `min_consumers` have attached. A consumer whose
/// delivery fails is dropped and the message moves on to the next one.
pub(crate) struct Balancer<C> {
    state: Mutex<State<C>>,
    joined: Condvar,
    min_consumers: usize,
}

impl<C: Consumer> Balancer<C> {
    pub(crate) fn new(min_consumers: usize) -> Self {
        Self {
            state: Mutex::new(State {
                consumers: Vec::new(),
                next: 0,
                attached: 0,
                closed: false,
            }),
            joined: Condvar::new(),
            min_consumers: min_consumers.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<C>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a consumer. Returns `false` once the balancer is closed.
    pub(crate) fn attach(&self, consumer: C) -> bool {
        let mut state = self.lock();
        if state.closed {
            return false;
        }
        state.consumers.push(consumer);
        state.attached += 1;
        debug!(
            connected = state.consumers.len(),
            attached = state.attached,
            "consumer attached"
        );
        self.joined.notify_all();
        true
    }

    pub(crate) fn dispatch(&self, parts: &[Bytes]) -> Result<()> {
        let mut state = self.lock();
        while !state.closed && state.attached < self.min_consumers {
            state = self
                .joined
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }

        loop {
            if state.closed {
                return Err(ChannelError::Closed);
            }
            if state.consumers.is_empty() {
                return Err(ChannelError::NoConsumers);
            }

            let index = state.next % state.consumers.len();
            match state.consumers[index].deliver(parts) {
                Ok(()) => {
                    state.next = index + 1;
                    return Ok(());
                }
                Err(err) => {
                    warn!(error = %err, "dropping consumer after failed delivery");
                    state.consumers.remove(index);
                    state.next = index;
                }
            }
        }
    }

    /// Currently connected consumers.
    pub(crate) fn connected(&self) -> usize {
        self.lock().consumers.len()
    }

    /// Drop every consumer and refuse new ones.
    pub(crate) fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        state.consumers.clear();
        self.joined.notify_all();
    }
}
