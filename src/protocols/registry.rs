//! Protocol listener registry.
//!
//! Per protocol: parse the port spec, resolve protocol material, spawn one
//! listener per port, and register each successful listener with the session.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::lifecycle::session::Session;
use crate::net::{parse_ports, resolve_host_key, HostKeyError, PortSpecError, TlsMaterial};
use crate::observability::metrics;
use crate::output::SinkSet;
use crate::protocols::engine::{ProtocolConfig, ProtocolEngine, SpawnError};
use crate::protocols::Protocol;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("failed to process {protocol} ports '{spec}': {source}")]
    Ports {
        protocol: Protocol,
        spec: String,
        #[source]
        source: PortSpecError,
    },

    #[error(transparent)]
    HostKey(#[from] HostKeyError),

    #[error("failed to start {protocol} server {address}: {source}")]
    Spawn {
        protocol: Protocol,
        address: String,
        #[source]
        source: SpawnError,
    },
}

/// Shared inputs for every protocol setup in a session.
#[derive(Debug, Clone)]
pub struct SetupContext {
    pub bind_host: String,
    pub sinks: Arc<SinkSet>,
    pub tls: Arc<TlsMaterial>,
    pub ssh_host_key_file: Option<PathBuf>,
    pub ignore_failures: bool,
}

/// Start every listener for `protocol` on the ports in `port_spec`.
///
/// Returns the number of listeners registered with `session`. A failed
/// spawn is logged and skipped when `ignore_failures` is set, otherwise it
/// aborts the setup; listeners registered before it stay in the session.
pub fn setup_protocol(
    session: &mut Session,
    engine: &dyn ProtocolEngine,
    protocol: Protocol,
    port_spec: &str,
    context: &SetupContext,
) -> Result<usize, SetupError> {
    let ports = parse_ports(port_spec).map_err(|source| SetupError::Ports {
        protocol,
        spec: port_spec.to_string(),
        source,
    })?;

    let host_key = match protocol {
        Protocol::Ssh => Some(Arc::new(resolve_host_key(
            context.ssh_host_key_file.as_deref(),
        )?)),
        _ => None,
    };
    let tls = protocol.requires_tls().then(|| context.tls.clone());

    let mut started = 0;
    for port in ports {
        let config = ProtocolConfig {
            protocol,
            bind_host: context.bind_host.clone(),
            bind_port: port,
            sinks: context.sinks.clone(),
            tls: tls.clone(),
            host_key: host_key.clone(),
            session_id: session.id(),
        };
        let address = config.bind_address();

        match engine.spawn(config) {
            Ok(handle) => {
                session.register(protocol, address, handle);
                started += 1;
            }
            Err(source) => {
                metrics::record_spawn_failure(protocol.as_str());
                if !context.ignore_failures {
                    return Err(SetupError::Spawn {
                        protocol,
                        address,
                        source,
                    });
                }
                tracing::error!(
                    protocol = %protocol,
                    address = %address,
                    error = %source,
                    "Failed to start server"
                );
            }
        }
    }

    Ok(started)
}
