//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Protocol names must be known, and at least one enabled
//! - Port specs of enabled protocols must parse
//! - Webhook destinations must be valid URLs
//! - An enabled metrics endpoint must have a socket address
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: CaptureConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::CaptureConfig;
use crate::net::{parse_ports, PortSpecError};
use crate::protocols::Protocol;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unknown protocol '{0}'")]
    UnknownProtocol(String),

    #[error("no protocols enabled")]
    NoProtocols,

    #[error("invalid {protocol} ports '{spec}': {source}")]
    InvalidPorts {
        protocol: Protocol,
        spec: String,
        source: PortSpecError,
    },

    #[error("invalid webhook url '{url}': {reason}")]
    InvalidWebhookUrl { url: String, reason: String },

    #[error("bind host is empty")]
    EmptyBindHost,

    #[error("invalid metrics address '{address}': {reason}")]
    InvalidMetricsAddress { address: String, reason: String },
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &CaptureConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut enabled = Vec::new();
    for name in &config.protocols {
        match Protocol::enabled(&[name]) {
            Ok(protocols) => enabled.extend(protocols),
            Err(e) => errors.push(ValidationError::UnknownProtocol(e.0)),
        }
    }
    enabled.sort();
    enabled.dedup();
    if enabled.is_empty() && errors.is_empty() {
        errors.push(ValidationError::NoProtocols);
    }

    let listeners = &config.listeners;
    if listeners.bind_host.trim().is_empty() {
        errors.push(ValidationError::EmptyBindHost);
    }

    for protocol in enabled {
        let spec = match protocol {
            Protocol::Ssh => &listeners.ssh_ports,
            Protocol::Snmp => &listeners.snmp_ports,
            Protocol::Ldap => &listeners.ldap_ports,
            Protocol::Ldaps => &listeners.ldaps_ports,
        };
        if let Err(source) = parse_ports(spec) {
            errors.push(ValidationError::InvalidPorts {
                protocol,
                spec: spec.clone(),
                source,
            });
        }
    }

    for output in &config.outputs {
        if output.starts_with("http://") || output.starts_with("https://") {
            if let Err(e) = url::Url::parse(output) {
                errors.push(ValidationError::InvalidWebhookUrl {
                    url: output.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    let observability = &config.observability;
    if observability.metrics_enabled {
        if let Err(e) = observability.metrics_socket_addr() {
            errors.push(ValidationError::InvalidMetricsAddress {
                address: observability.metrics_address.clone(),
                reason: e.to_string(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&CaptureConfig::default()), Ok(()));
    }

    #[test]
    fn collects_every_error() {
        let mut config = CaptureConfig::default();
        config.protocols = vec!["ssh".into(), "telnet".into(), "ldap".into()];
        config.listeners.ssh_ports = "22-".into();
        config.listeners.ldaps_ports = "0".into();
        config.outputs = vec!["-".into(), "https://".into()];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert_eq!(errors[0], ValidationError::UnknownProtocol("telnet".into()));
        assert!(matches!(
            errors[1],
            ValidationError::InvalidPorts { protocol: Protocol::Ssh, .. }
        ));
        assert!(matches!(
            errors[2],
            ValidationError::InvalidPorts { protocol: Protocol::Ldaps, .. }
        ));
        assert!(matches!(errors[3], ValidationError::InvalidWebhookUrl { .. }));
    }

    #[test]
    fn disabled_protocol_ports_are_not_checked() {
        let mut config = CaptureConfig::default();
        config.protocols = vec!["snmp".into()];
        config.listeners.ssh_ports = "nonsense".into();
        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn metrics_address_checked_only_when_enabled() {
        let mut config = CaptureConfig::default();
        config.observability.metrics_address = "localhost-ish".into();
        assert_eq!(validate_config(&config), Ok(()));

        config.observability.metrics_enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(
            &errors[..],
            [ValidationError::InvalidMetricsAddress { address, .. }] if address == "localhost-ish"
        ));
    }

    #[test]
    fn empty_protocol_list_is_rejected() {
        let mut config = CaptureConfig::default();
        config.protocols = vec![" ".into()];
        assert_eq!(validate_config(&config), Err(vec![ValidationError::NoProtocols]));
    }
}
