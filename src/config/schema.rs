//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for a capture
//! session. All types derive Serde traits for deserialization from config files.

use std::net::{AddrParseError, SocketAddr};

use serde::{Deserialize, Serialize};

/// Root configuration for a capture session.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Enabled protocol families (`ssh`, `snmp`, `ldap`, `ldaps`).
    ///
    /// `ldap` enables both the plaintext and the TLS LDAP listeners.
    pub protocols: Vec<String>,

    /// Listener bind parameters.
    pub listeners: ListenerConfig,

    /// TLS material for TLS-dependent listeners.
    pub tls: TlsConfig,

    /// SSH settings.
    pub ssh: SshConfig,

    /// Output destinations: `-` for console, an http(s) URL for a webhook,
    /// anything else is a file path.
    pub outputs: Vec<String>,

    /// Log and skip listeners that fail to start instead of aborting.
    pub ignore_failures: bool,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            protocols: vec!["ssh".to_string(), "snmp".to_string(), "ldap".to_string()],
            listeners: ListenerConfig::default(),
            tls: TlsConfig::default(),
            ssh: SshConfig::default(),
            outputs: Vec::new(),
            ignore_failures: false,
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Host every listener binds to (e.g., "0.0.0.0").
    pub bind_host: String,

    /// SSH port specification (e.g., "22,2222").
    pub ssh_ports: String,

    /// SNMP port specification.
    pub snmp_ports: String,

    /// LDAP port specification.
    pub ldap_ports: String,

    /// LDAPS port specification.
    pub ldaps_ports: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            ssh_ports: "22".to_string(),
            snmp_ports: "161".to_string(),
            ldap_ports: "389".to_string(),
            ldaps_ports: "636".to_string(),
        }
    }
}

/// TLS certificate configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Path to certificate file (PEM). May also contain the private key.
    pub cert_file: Option<String>,

    /// Path to private key file (PEM).
    pub key_file: Option<String>,

    /// Subject name used when a certificate is synthesized.
    pub server_name: String,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            cert_file: None,
            key_file: None,
            server_name: "localhost".to_string(),
        }
    }
}

/// SSH configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SshConfig {
    /// Path to a PEM host key. A fresh key is generated when unset.
    pub host_key_file: Option<String>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable debug-level logging.
    pub verbose: bool,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl ObservabilityConfig {
    /// Parsed metrics endpoint address.
    pub fn metrics_socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        self.metrics_address.parse()
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
