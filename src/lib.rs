//! Credential-capture honeypot orchestrator.
//!
//! Configures output sinks, starts SSH, SNMP and LDAP/LDAPS listeners on
//! the configured ports, and tears everything down in order when the
//! process is asked to stop.

pub mod config;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod output;
pub mod protocols;

pub use config::schema::CaptureConfig;
pub use lifecycle::{Controller, SessionError};
pub use output::{CapturedRecord, SinkSet};
pub use protocols::{EngineSet, Protocol};
