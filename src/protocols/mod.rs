//! Protocol listener subsystem.
//!
//! # Data Flow
//! ```text
//! enabled protocol names ("ssh", "snmp", "ldap", ...)
//!     → Protocol::enabled (fixed setup order: SNMP, SSH, LDAP, LDAPS)
//!     → registry.rs, once per protocol:
//!         port spec → ports → ProtocolConfig per port
//!         → engine.rs ProtocolEngine::spawn
//!         → success: Session::register (count + shutdown handle)
//!         → failure: fatal, or logged and skipped when tolerated
//! ```
//!
//! # Design Decisions
//! - One listener per bound port, each with its own shutdown handle
//! - Engines are trait objects so tests can substitute mocks
//! - probe.rs is the built-in engine: it binds and records inbound probes

pub mod engine;
pub mod probe;
pub mod registry;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use engine::{EngineSet, ListenerHandle, ProtocolConfig, ProtocolEngine, SpawnError};
pub use probe::ProbeEngine;
pub use registry::{setup_protocol, SetupContext, SetupError};

/// Emulated protocol families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Snmp,
    Ssh,
    Ldap,
    Ldaps,
}

/// Socket type a protocol listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Tcp,
    Udp,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown protocol '{0}'")]
pub struct UnknownProtocol(pub String);

impl Protocol {
    /// All families in setup order.
    pub const ALL: [Protocol; 4] = [Protocol::Snmp, Protocol::Ssh, Protocol::Ldap, Protocol::Ldaps];

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Snmp => "snmp",
            Protocol::Ssh => "ssh",
            Protocol::Ldap => "ldap",
            Protocol::Ldaps => "ldaps",
        }
    }

    pub fn transport(&self) -> Transport {
        match self {
            Protocol::Snmp => Transport::Udp,
            Protocol::Ssh | Protocol::Ldap | Protocol::Ldaps => Transport::Tcp,
        }
    }

    /// Whether listeners need the session's TLS material.
    pub fn requires_tls(&self) -> bool {
        matches!(self, Protocol::Ldaps)
    }

    /// Resolve enabled protocol names into families, in setup order.
    ///
    /// `ldap` enables both LDAP and LDAPS. Names are trimmed and
    /// case-insensitive; empty entries are ignored.
    pub fn enabled<S: AsRef<str>>(names: &[S]) -> Result<Vec<Protocol>, UnknownProtocol> {
        let mut enabled = std::collections::BTreeSet::new();
        for name in names {
            let name = name.as_ref().trim().to_ascii_lowercase();
            match name.as_str() {
                "" => continue,
                "snmp" => {
                    enabled.insert(Protocol::Snmp);
                }
                "ssh" => {
                    enabled.insert(Protocol::Ssh);
                }
                "ldap" => {
                    enabled.insert(Protocol::Ldap);
                    enabled.insert(Protocol::Ldaps);
                }
                "ldaps" => {
                    enabled.insert(Protocol::Ldaps);
                }
                _ => return Err(UnknownProtocol(name)),
            }
        }
        Ok(enabled.into_iter().collect())
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabled_uses_setup_order() {
        let enabled = Protocol::enabled(&["ldap", " SSH ", "snmp"]).unwrap();
        assert_eq!(
            enabled,
            vec![Protocol::Snmp, Protocol::Ssh, Protocol::Ldap, Protocol::Ldaps]
        );
    }

    #[test]
    fn ldaps_alone() {
        assert_eq!(Protocol::enabled(&["ldaps"]).unwrap(), vec![Protocol::Ldaps]);
    }

    #[test]
    fn unknown_name_is_rejected() {
        assert_eq!(
            Protocol::enabled(&["ssh", "telnet"]),
            Err(UnknownProtocol("telnet".to_string()))
        );
    }
}
