//! credsnare: credential-capture honeypot.
//!
//! # Architecture Overview
//!
//! ```text
//!   CLI flags + config file
//!            │
//!            ▼
//!   ┌────────────────┐     ┌───────────────────────────────────────┐
//!   │     config     │────▶│         lifecycle::Controller         │
//!   └────────────────┘     │                                       │
//!                          │  output::SinkSet  (console/file/hook) │
//!   SIGINT / SIGTERM       │  protocols::setup_protocol per family │
//!   ───────────────────────┼─▶ LifecycleState (early / graceful)   │
//!                          └───────────────────┬───────────────────┘
//!                                              │ one listener per port
//!                                              ▼
//!                          SNMP (udp)  SSH (tcp)  LDAP  LDAPS (tls)
//! ```
//!
//! # Exit Codes
//! - 0: graceful shutdown after a signal
//! - 1: signal received before startup completed
//! - 2: invalid configuration or fatal startup failure

use std::process::ExitCode;

use clap::Parser;

use credsnare::config::{Cli, ObservabilityConfig};
use credsnare::lifecycle::signals::{spawn_watcher, termination_signal, EARLY_EXIT_CODE};
use credsnare::observability::{logging, metrics};
use credsnare::{Controller, EngineSet};

const FATAL_EXIT_CODE: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            logging::init(&ObservabilityConfig::default());
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::from(FATAL_EXIT_CODE);
        }
    };

    logging::init(&config.observability);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        protocols = ?config.protocols,
        outputs = ?config.outputs,
        "credsnare starting"
    );

    if config.observability.metrics_enabled {
        // Validated while loading the configuration.
        if let Ok(addr) = config.observability.metrics_socket_addr() {
            metrics::init_metrics(addr);
        }
    }

    let controller = Controller::new(config, EngineSet::builtin());
    spawn_watcher(controller.state(), termination_signal(), || {
        std::process::exit(EARLY_EXIT_CODE)
    });

    match controller.run().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Capture session failed");
            ExitCode::from(FATAL_EXIT_CODE)
        }
    }
}
