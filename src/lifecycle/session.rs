//! Capture session state: active listeners and their shutdown handles.

use uuid::Uuid;

use crate::observability::metrics;
use crate::output::SinkSet;
use crate::protocols::{ListenerHandle, Protocol};

/// A started listener and the handle that stops it.
pub struct RegisteredListener {
    pub protocol: Protocol,
    pub address: String,
    handle: Box<dyn ListenerHandle>,
}

impl RegisteredListener {
    fn shutdown(self) {
        tracing::debug!(protocol = %self.protocol, address = %self.address, "Stopping listener");
        self.handle.shutdown();
    }
}

/// Counts from a completed teardown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Listener shutdown handlers invoked.
    pub listeners_stopped: usize,
    /// Sink cleanup handlers invoked.
    pub sinks_cleaned: usize,
}

/// One orchestration instance.
pub struct Session {
    id: Uuid,
    active_protocol_count: usize,
    shutdown_handlers: Vec<RegisteredListener>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            active_protocol_count: 0,
            shutdown_handlers: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Number of listeners that started successfully.
    pub fn active_protocol_count(&self) -> usize {
        self.active_protocol_count
    }

    /// Registered listeners in registration order.
    pub fn listeners(&self) -> impl Iterator<Item = (Protocol, &str)> {
        self.shutdown_handlers
            .iter()
            .map(|l| (l.protocol, l.address.as_str()))
    }

    /// Record a successfully spawned listener. Call only after the spawn succeeded.
    pub fn register(&mut self, protocol: Protocol, address: String, handle: Box<dyn ListenerHandle>) {
        self.active_protocol_count += 1;
        self.shutdown_handlers.push(RegisteredListener {
            protocol,
            address,
            handle,
        });
        metrics::set_active_listeners(self.active_protocol_count);
    }

    /// Invoke every listener shutdown handler in registration order.
    pub fn shutdown_listeners(&mut self) -> usize {
        let handlers = std::mem::take(&mut self.shutdown_handlers);
        let stopped = handlers.len();
        for listener in handlers {
            listener.shutdown();
        }
        metrics::set_active_listeners(0);
        stopped
    }

    /// Full teardown: listeners first, then stop output, then sink cleanup.
    pub fn teardown(&mut self, sinks: &SinkSet) -> ShutdownReport {
        let listeners_stopped = self.shutdown_listeners();
        sinks.done();
        let sinks_cleaned = sinks.cleanup();
        ShutdownReport {
            listeners_stopped,
            sinks_cleaned,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
