//! Protocol engine contract.
//!
//! An engine starts one listener per [`ProtocolConfig`] and hands back a
//! [`ListenerHandle`] that stops it. Everything the listener does after that
//! (handshakes, credential extraction) belongs to the engine.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::net::{HostKey, TlsError, TlsMaterial};
use crate::output::SinkSet;
use crate::protocols::Protocol;

/// Bind parameters for a single listener instance.
#[derive(Debug, Clone)]
pub struct ProtocolConfig {
    pub protocol: Protocol,
    pub bind_host: String,
    pub bind_port: u16,
    pub sinks: Arc<SinkSet>,
    /// Present for TLS-dependent protocols.
    pub tls: Option<Arc<TlsMaterial>>,
    /// Present for SSH.
    pub host_key: Option<Arc<HostKey>>,
    pub session_id: Uuid,
}

impl ProtocolConfig {
    pub fn bind_address(&self) -> String {
        if self.bind_host.contains(':') {
            format!("[{}]:{}", self.bind_host, self.bind_port)
        } else {
            format!("{}:{}", self.bind_host, self.bind_port)
        }
    }
}

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TLS material: {0}")]
    Tls(#[from] TlsError),

    #[error("missing {0}")]
    MissingMaterial(&'static str),

    #[error("{0}")]
    Engine(String),
}

/// Stops one running listener.
pub trait ListenerHandle: Send {
    /// Stop the listener. Consumes the handle, so it runs at most once.
    fn shutdown(self: Box<Self>);
}

/// Starts listeners for one protocol family.
pub trait ProtocolEngine: Send + Sync {
    fn spawn(&self, config: ProtocolConfig) -> Result<Box<dyn ListenerHandle>, SpawnError>;
}

/// Engines keyed by protocol family.
#[derive(Clone, Default)]
pub struct EngineSet {
    engines: HashMap<Protocol, Arc<dyn ProtocolEngine>>,
}

impl EngineSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in probe engines for every family.
    pub fn builtin() -> Self {
        Protocol::ALL.into_iter().fold(Self::new(), |set, protocol| {
            set.with(protocol, Arc::new(crate::protocols::ProbeEngine::new(protocol)))
        })
    }

    pub fn with(mut self, protocol: Protocol, engine: Arc<dyn ProtocolEngine>) -> Self {
        self.engines.insert(protocol, engine);
        self
    }

    pub fn get(&self, protocol: Protocol) -> Option<&Arc<dyn ProtocolEngine>> {
        self.engines.get(&protocol)
    }
}
