//! Built-in probe engine.
//!
//! # Responsibilities
//! - Bind the listener's port (TCP, or UDP for SNMP)
//! - Record every inbound connection or datagram through the sink set
//! - Stop accepting when the listener handle is shut down
//!
//! Protocol handshakes are not emulated; a probe record carries the source
//! address and the port that was touched.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, UdpSocket};
use tokio::task::JoinHandle;

use crate::lifecycle::shutdown::{Shutdown, ShutdownListener};
use crate::observability::metrics;
use crate::output::{CapturedRecord, SinkSet};
use crate::protocols::engine::{ListenerHandle, ProtocolConfig, ProtocolEngine, SpawnError};
use crate::protocols::{Protocol, Transport};

/// Largest datagram read from a UDP probe.
const MAX_DATAGRAM: usize = 64 * 1024;

/// Engine that binds a port and records inbound probes.
#[derive(Debug, Clone, Copy)]
pub struct ProbeEngine {
    protocol: Protocol,
}

impl ProbeEngine {
    pub fn new(protocol: Protocol) -> Self {
        Self { protocol }
    }
}

impl ProtocolEngine for ProbeEngine {
    fn spawn(&self, config: ProtocolConfig) -> Result<Box<dyn ListenerHandle>, SpawnError> {
        if self.protocol.requires_tls() {
            config
                .tls
                .as_ref()
                .ok_or(SpawnError::MissingMaterial("TLS material"))?
                .validate()?;
        }
        if self.protocol == Protocol::Ssh && config.host_key.is_none() {
            return Err(SpawnError::MissingMaterial("ssh host key"));
        }

        let address = config.bind_address();
        let bind_error = |source: std::io::Error| SpawnError::Bind {
            address: address.clone(),
            source,
        };

        let shutdown = Shutdown::new();
        let context = ProbeContext {
            protocol: self.protocol,
            port: config.bind_port,
            sinks: config.sinks.clone(),
            session: config.session_id.to_string(),
        };

        let task = match self.protocol.transport() {
            Transport::Tcp => {
                let std_listener = std::net::TcpListener::bind((config.bind_host.as_str(), config.bind_port))
                    .map_err(bind_error)?;
                std_listener.set_nonblocking(true).map_err(bind_error)?;
                let listener = TcpListener::from_std(std_listener).map_err(bind_error)?;
                tokio::spawn(accept_loop(listener, context, shutdown.subscribe()))
            }
            Transport::Udp => {
                let std_socket = std::net::UdpSocket::bind((config.bind_host.as_str(), config.bind_port))
                    .map_err(bind_error)?;
                std_socket.set_nonblocking(true).map_err(bind_error)?;
                let socket = UdpSocket::from_std(std_socket).map_err(bind_error)?;
                tokio::spawn(recv_loop(socket, context, shutdown.subscribe()))
            }
        };

        tracing::info!(protocol = %self.protocol, address = %address, "Listener started");
        Ok(Box::new(ProbeListener {
            protocol: self.protocol,
            address,
            shutdown,
            _task: task,
        }))
    }
}

struct ProbeContext {
    protocol: Protocol,
    port: u16,
    sinks: Arc<SinkSet>,
    session: String,
}

impl ProbeContext {
    fn record(&self, peer: SocketAddr, event: &str) -> CapturedRecord {
        CapturedRecord::new()
            .with("protocol", self.protocol.as_str())
            .with("event", event)
            .with("src_host", peer.ip().to_string())
            .with("src_port", peer.port().to_string())
            .with("dst_port", self.port.to_string())
            .with("session", self.session.clone())
    }

    /// Deliver off the accept path so a slow sink never stalls the listener.
    fn emit(&self, record: CapturedRecord) {
        metrics::record_probe(self.protocol.as_str());
        let sinks = self.sinks.clone();
        tokio::spawn(async move {
            if let Err(e) = sinks.deliver(&record).await {
                tracing::debug!(error = %e, "Probe record not fully delivered");
            }
        });
    }
}

async fn accept_loop(listener: TcpListener, context: ProbeContext, mut shutdown: ShutdownListener) {
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tracing::debug!(protocol = %context.protocol, peer_addr = %peer, "Connection accepted");
                    drop(stream);
                    context.emit(context.record(peer, "connect"));
                }
                Err(e) => {
                    tracing::warn!(protocol = %context.protocol, error = %e, "Accept failed");
                }
            },
            _ = shutdown.recv() => break,
        }
    }
}

async fn recv_loop(socket: UdpSocket, context: ProbeContext, mut shutdown: ShutdownListener) {
    let mut buf = vec![0u8; MAX_DATAGRAM];
    loop {
        tokio::select! {
            received = socket.recv_from(&mut buf) => match received {
                Ok((len, peer)) => {
                    tracing::debug!(protocol = %context.protocol, peer_addr = %peer, bytes = len, "Datagram received");
                    let record = context.record(peer, "datagram").with("bytes", len.to_string());
                    context.emit(record);
                }
                Err(e) => {
                    tracing::warn!(protocol = %context.protocol, error = %e, "Receive failed");
                }
            },
            _ = shutdown.recv() => break,
        }
    }
}

/// Handle for a running probe listener.
struct ProbeListener {
    protocol: Protocol,
    address: String,
    shutdown: Shutdown,
    _task: JoinHandle<()>,
}

impl ListenerHandle for ProbeListener {
    fn shutdown(self: Box<Self>) {
        self.shutdown.trigger();
        tracing::info!(protocol = %self.protocol, address = %self.address, "Listener stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::{resolve_host_key, TlsMaterial};
    use crate::output::{DeliveryError, OutputSink, SinkKind};
    use futures_util::future::BoxFuture;
    use futures_util::FutureExt;
    use std::sync::Mutex;
    use std::time::Duration;
    use uuid::Uuid;

    struct Collect(Arc<Mutex<Vec<CapturedRecord>>>);

    impl OutputSink for Collect {
        fn kind(&self) -> SinkKind {
            SinkKind::File
        }

        fn target(&self) -> &str {
            "memory"
        }

        fn deliver<'a>(&'a self, record: &'a CapturedRecord) -> BoxFuture<'a, Result<(), DeliveryError>> {
            self.0.lock().unwrap().push(record.clone());
            async { Ok(()) }.boxed()
        }
    }

    fn collecting(records: &Arc<Mutex<Vec<CapturedRecord>>>) -> Arc<SinkSet> {
        let sink: Box<dyn OutputSink> = Box::new(Collect(records.clone()));
        Arc::new(SinkSet::from_sinks(vec![sink]))
    }

    fn config(protocol: Protocol, sinks: Arc<SinkSet>) -> ProtocolConfig {
        ProtocolConfig {
            protocol,
            bind_host: "127.0.0.1".to_string(),
            bind_port: 0,
            sinks,
            tls: None,
            host_key: None,
            session_id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn tcp_probe_is_recorded() {
        let port = {
            let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            probe.local_addr().unwrap().port()
        };
        let records = Arc::new(Mutex::new(Vec::new()));
        let sinks = collecting(&records);

        let mut config = config(Protocol::Ldap, sinks);
        config.bind_port = port;
        let handle = ProbeEngine::new(Protocol::Ldap).spawn(config).unwrap();

        let _client = tokio::net::TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        for _ in 0..50 {
            if !records.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        handle.shutdown();

        let records = records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("protocol"), Some("ldap"));
        assert_eq!(records[0].get("event"), Some("connect"));
        assert_eq!(records[0].get("dst_port"), Some(port.to_string().as_str()));
        assert_eq!(records[0].get("src_host"), Some("127.0.0.1"));
    }

    #[tokio::test]
    async fn occupied_port_fails_to_spawn() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let sinks = Arc::new(SinkSet::from_sinks(Vec::new()));
        let mut config = config(Protocol::Ldap, sinks);
        config.bind_port = taken.local_addr().unwrap().port();

        let result = ProbeEngine::new(Protocol::Ldap).spawn(config);
        assert!(matches!(result, Err(SpawnError::Bind { .. })));
    }

    #[tokio::test]
    async fn ldaps_requires_tls_material() {
        let sinks = Arc::new(SinkSet::from_sinks(Vec::new()));
        let result = ProbeEngine::new(Protocol::Ldaps).spawn(config(Protocol::Ldaps, sinks.clone()));
        assert!(matches!(result, Err(SpawnError::MissingMaterial(_))));

        let mut config = config(Protocol::Ldaps, sinks);
        config.tls = Some(Arc::new(TlsMaterial::generate("localhost").unwrap()));
        let handle = ProbeEngine::new(Protocol::Ldaps).spawn(config).unwrap();
        handle.shutdown();
    }

    #[tokio::test]
    async fn ssh_requires_host_key() {
        let sinks = Arc::new(SinkSet::from_sinks(Vec::new()));
        let result = ProbeEngine::new(Protocol::Ssh).spawn(config(Protocol::Ssh, sinks.clone()));
        assert!(matches!(result, Err(SpawnError::MissingMaterial(_))));

        let mut config = config(Protocol::Ssh, sinks);
        config.host_key = Some(Arc::new(resolve_host_key(None).unwrap()));
        ProbeEngine::new(Protocol::Ssh).spawn(config).unwrap().shutdown();
    }

    #[tokio::test]
    async fn udp_datagram_is_recorded() {
        let records = Arc::new(Mutex::new(Vec::new()));
        let sinks = collecting(&records);
        let port = {
            let probe = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
            probe.local_addr().unwrap().port()
        };
        let mut config = config(Protocol::Snmp, sinks);
        config.bind_port = port;
        let handle = ProbeEngine::new(Protocol::Snmp).spawn(config).unwrap();

        let client = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client.send_to(b"public", ("127.0.0.1", port)).await.unwrap();
        for _ in 0..50 {
            if !records.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        handle.shutdown();

        let records = records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("event"), Some("datagram"));
        assert_eq!(records[0].get("bytes"), Some("6"));
    }
}
