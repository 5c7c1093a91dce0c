//! Command-line surface. Flags override values from the config file.

use std::path::PathBuf;

use clap::Parser;

use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::{CaptureConfig, LogFormat};

#[derive(Parser, Debug, Default)]
#[command(name = "credsnare")]
#[command(version)]
#[command(about = "Credential-capturing honeypot listeners for SSH, SNMP and LDAP")]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "CREDSNARE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Protocols to enable (ssh, snmp, ldap, ldaps)
    #[arg(short, long, env = "CREDSNARE_PROTOCOLS", value_delimiter = ',')]
    pub protocols: Option<Vec<String>>,

    /// Host to bind every listener to
    #[arg(long, env = "CREDSNARE_BIND_HOST")]
    pub bind_host: Option<String>,

    /// SSH ports, e.g. "22,2222"
    #[arg(long, env = "CREDSNARE_SSH_PORTS")]
    pub ssh_ports: Option<String>,

    /// SNMP ports
    #[arg(long, env = "CREDSNARE_SNMP_PORTS")]
    pub snmp_ports: Option<String>,

    /// LDAP ports
    #[arg(long, env = "CREDSNARE_LDAP_PORTS")]
    pub ldap_ports: Option<String>,

    /// LDAPS ports
    #[arg(long, env = "CREDSNARE_LDAPS_PORTS")]
    pub ldaps_ports: Option<String>,

    /// TLS certificate (PEM); may also hold the key
    #[arg(long, env = "CREDSNARE_TLS_CERT")]
    pub tls_cert: Option<String>,

    /// TLS private key (PEM)
    #[arg(long, env = "CREDSNARE_TLS_KEY")]
    pub tls_key: Option<String>,

    /// Subject name for a generated certificate
    #[arg(long, env = "CREDSNARE_TLS_NAME")]
    pub tls_name: Option<String>,

    /// SSH host key (PEM)
    #[arg(long, env = "CREDSNARE_SSH_HOST_KEY")]
    pub ssh_host_key: Option<String>,

    /// Log and skip listeners that fail to start
    #[arg(short = 'I', long)]
    pub ignore_failures: bool,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,

    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Serve Prometheus metrics on this address
    #[arg(long, env = "CREDSNARE_METRICS_ADDRESS")]
    pub metrics_address: Option<String>,

    /// Output destinations: "-" (console), http(s) URL (webhook), or file path
    pub outputs: Vec<String>,
}

impl Cli {
    /// Overlay command-line values onto `config`.
    pub fn apply(self, config: &mut CaptureConfig) {
        if let Some(protocols) = self.protocols {
            config.protocols = protocols;
        }

        let listeners = &mut config.listeners;
        overlay(&mut listeners.bind_host, self.bind_host);
        overlay(&mut listeners.ssh_ports, self.ssh_ports);
        overlay(&mut listeners.snmp_ports, self.snmp_ports);
        overlay(&mut listeners.ldap_ports, self.ldap_ports);
        overlay(&mut listeners.ldaps_ports, self.ldaps_ports);

        if self.tls_cert.is_some() {
            config.tls.cert_file = self.tls_cert;
        }
        if self.tls_key.is_some() {
            config.tls.key_file = self.tls_key;
        }
        overlay(&mut config.tls.server_name, self.tls_name);
        if self.ssh_host_key.is_some() {
            config.ssh.host_key_file = self.ssh_host_key;
        }

        if !self.outputs.is_empty() {
            config.outputs = self.outputs;
        }
        config.ignore_failures |= self.ignore_failures;

        let observability = &mut config.observability;
        observability.verbose |= self.verbose;
        if let Some(format) = self.log_format {
            observability.log_format = format;
        }
        if let Some(address) = self.metrics_address {
            observability.metrics_enabled = true;
            observability.metrics_address = address;
        }
    }

    /// Build the effective, validated configuration.
    pub fn into_config(self) -> Result<CaptureConfig, ConfigError> {
        let path = self.config.clone();
        load_config(path.as_deref(), |config| self.apply(config))
    }
}

fn overlay(field: &mut String, value: Option<String>) {
    if let Some(value) = value {
        *field = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "credsnare",
            "--protocols",
            "ssh,ldaps",
            "--ssh-ports",
            "2222",
            "-I",
            "--log-format",
            "json",
            "-",
            "/tmp/creds.log",
        ])
        .unwrap();

        let config = cli.into_config().unwrap();
        assert_eq!(config.protocols, vec!["ssh", "ldaps"]);
        assert_eq!(config.listeners.ssh_ports, "2222");
        assert_eq!(config.listeners.ldap_ports, "389");
        assert!(config.ignore_failures);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.outputs, vec!["-", "/tmp/creds.log"]);
    }

    #[test]
    fn flags_override_file_values() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            "outputs = [\"/var/log/a.log\"]\n[listeners]\nsnmp_ports = \"1161\"\nssh_ports = \"22\"\n",
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "credsnare",
            "--config",
            file.path().to_str().unwrap(),
            "--ssh-ports",
            "2022",
        ])
        .unwrap();
        let config = cli.into_config().unwrap();
        assert_eq!(config.listeners.snmp_ports, "1161");
        assert_eq!(config.listeners.ssh_ports, "2022");
        assert_eq!(config.outputs, vec!["/var/log/a.log"]);
    }

    #[test]
    fn invalid_overrides_fail_validation() {
        let cli = Cli::try_parse_from(["credsnare", "--snmp-ports", "99999"]).unwrap();
        assert!(matches!(cli.into_config(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn unparsable_metrics_address_is_rejected() {
        let cli = Cli::try_parse_from(["credsnare", "--metrics-address", "nowhere"]).unwrap();
        match cli.into_config() {
            Err(ConfigError::Validation(errors)) => {
                assert!(matches!(
                    &errors[..],
                    [crate::config::ValidationError::InvalidMetricsAddress { .. }]
                ));
            }
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn metrics_address_enables_metrics() {
        let mut config = CaptureConfig::default();
        Cli {
            metrics_address: Some("0.0.0.0:9100".into()),
            ..Cli::default()
        }
        .apply(&mut config);
        assert!(config.observability.metrics_enabled);
        assert_eq!(config.observability.metrics_address, "0.0.0.0:9100");
    }
}
