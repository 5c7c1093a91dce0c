//! Session lifecycle controller.
//!
//! Builds the sink set and TLS material, registers every enabled protocol's
//! listeners, flips the session to `Running`, then waits for a termination
//! request and tears everything down in registration order.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::config::CaptureConfig;
use crate::lifecycle::session::{Session, ShutdownReport};
use crate::lifecycle::state::LifecycleState;
use crate::net::{TlsError, TlsMaterial};
use crate::output::{SinkError, SinkSet};
use crate::protocols::{
    setup_protocol, EngineSet, Protocol, SetupContext, SetupError, UnknownProtocol,
};

/// Fatal session errors. All of them end the process.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to configure output: {0}")]
    Output(#[from] SinkError),

    #[error("failed to read TLS certificate: {0}")]
    Tls(#[from] TlsError),

    #[error(transparent)]
    Protocol(#[from] UnknownProtocol),

    #[error("no engine available for {0}")]
    NoEngine(Protocol),

    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error("at least one protocol must be enabled")]
    NoActiveProtocols,
}

/// Drives one capture session from configuration to teardown.
pub struct Controller {
    config: CaptureConfig,
    engines: EngineSet,
    state: LifecycleState,
}

impl Controller {
    pub fn new(config: CaptureConfig, engines: EngineSet) -> Self {
        Self {
            config,
            engines,
            state: LifecycleState::new(),
        }
    }

    /// Lifecycle state shared with the signal watcher.
    pub fn state(&self) -> LifecycleState {
        self.state.clone()
    }

    /// Run the session until a graceful termination request is handled.
    ///
    /// Startup failures stop any listener already started and clean up the
    /// sinks before the error is returned.
    pub async fn run(self) -> Result<ShutdownReport, SessionError> {
        let Controller {
            config,
            engines,
            state,
        } = self;

        state.begin_configuring();
        let mut session = Session::new();
        tracing::info!(session_id = %session.id(), "Configuring capture session");

        let sinks = Arc::new(SinkSet::build(&config.outputs)?);

        if let Err(e) = start_listeners(&config, &engines, &mut session, &sinks) {
            let report = session.teardown(&sinks);
            tracing::debug!(
                listeners_stopped = report.listeners_stopped,
                sinks_cleaned = report.sinks_cleaned,
                "Partial cleanup after failed startup"
            );
            state.mark_terminated();
            return Err(e);
        }

        state.mark_running();
        tracing::info!(
            session_id = %session.id(),
            listeners = session.active_protocol_count(),
            outputs = sinks.len(),
            "Capture session running"
        );

        state.wait_for_shutdown().await;
        tracing::info!("shutting down...");

        let report = session.teardown(&sinks);
        state.mark_terminated();
        tracing::info!(
            listeners_stopped = report.listeners_stopped,
            sinks_cleaned = report.sinks_cleaned,
            "Shutdown complete"
        );
        Ok(report)
    }
}

fn start_listeners(
    config: &CaptureConfig,
    engines: &EngineSet,
    session: &mut Session,
    sinks: &Arc<SinkSet>,
) -> Result<(), SessionError> {
    let protocols = Protocol::enabled(&config.protocols)?;

    let tls = TlsMaterial::resolve(
        config.tls.cert_file.as_deref().map(Path::new),
        config.tls.key_file.as_deref().map(Path::new),
        &config.tls.server_name,
    )?;

    let context = SetupContext {
        bind_host: config.listeners.bind_host.clone(),
        sinks: sinks.clone(),
        tls: Arc::new(tls),
        ssh_host_key_file: config.ssh.host_key_file.as_ref().map(PathBuf::from),
        ignore_failures: config.ignore_failures,
    };

    for protocol in protocols {
        let engine = engines.get(protocol).ok_or(SessionError::NoEngine(protocol))?;
        let spec = port_spec(config, protocol);
        let started = setup_protocol(session, engine.as_ref(), protocol, spec, &context)?;
        tracing::debug!(protocol = %protocol, ports = %spec, started, "Protocol configured");
    }

    if session.active_protocol_count() == 0 {
        return Err(SessionError::NoActiveProtocols);
    }
    Ok(())
}

fn port_spec(config: &CaptureConfig, protocol: Protocol) -> &str {
    let listeners = &config.listeners;
    match protocol {
        Protocol::Ssh => &listeners.ssh_ports,
        Protocol::Snmp => &listeners.snmp_ports,
        Protocol::Ldap => &listeners.ldap_ports,
        Protocol::Ldaps => &listeners.ldaps_ports,
    }
}
