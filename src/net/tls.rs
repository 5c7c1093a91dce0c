//! TLS material bootstrap.
//!
//! Resolves certificate and key bytes from configured files, or synthesizes
//! a self-signed pair that lives for the rest of the session.

use std::io::BufReader;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors produced while resolving TLS material.
#[derive(Debug, Error)]
pub enum TlsError {
    #[error("failed to read TLS file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to generate self-signed certificate: {0}")]
    Generate(#[from] rcgen::Error),

    #[error("invalid PEM data: {0}")]
    Pem(std::io::Error),

    #[error("no certificate found in TLS material")]
    MissingCertificate,

    #[error("no private key found in TLS material")]
    MissingPrivateKey,
}

/// Certificate and private key bytes shared by TLS-dependent listeners.
#[derive(Clone)]
pub struct TlsMaterial {
    certificate: Vec<u8>,
    private_key: Vec<u8>,
    generated: bool,
}

impl TlsMaterial {
    /// Resolve TLS material for a session.
    ///
    /// A certificate file doubles as the key source unless a key file is also
    /// given. When either side ends up empty a fresh pair is generated.
    pub fn resolve(
        cert_path: Option<&Path>,
        key_path: Option<&Path>,
        server_name: &str,
    ) -> Result<Self, TlsError> {
        let mut certificate = Vec::new();
        let mut private_key = Vec::new();

        if let Some(cert_path) = cert_path {
            certificate = read_file(cert_path)?;
            private_key = certificate.clone();

            if let Some(key_path) = key_path {
                private_key = read_file(key_path)?;
            }
        } else if key_path.is_some() {
            tracing::warn!("TLS key file ignored without a certificate file");
        }

        if certificate.is_empty() || private_key.is_empty() {
            return Self::generate(server_name);
        }

        tracing::info!(cert = ?cert_path, "Loaded TLS material");
        Ok(Self {
            certificate,
            private_key,
            generated: false,
        })
    }

    /// Generate a self-signed certificate for `server_name`.
    pub fn generate(server_name: &str) -> Result<Self, TlsError> {
        let certified = rcgen::generate_simple_self_signed(vec![server_name.to_string()])?;
        tracing::info!(server_name = %server_name, "Generated self-signed TLS certificate");

        Ok(Self {
            certificate: certified.cert.pem().into_bytes(),
            private_key: certified.key_pair.serialize_pem().into_bytes(),
            generated: true,
        })
    }

    /// PEM certificate bytes.
    pub fn certificate(&self) -> &[u8] {
        &self.certificate
    }

    /// PEM private key bytes.
    pub fn private_key(&self) -> &[u8] {
        &self.private_key
    }

    /// Whether this material was synthesized for the session.
    pub fn is_generated(&self) -> bool {
        self.generated
    }

    /// Check that the material holds at least one certificate and a private key.
    pub fn validate(&self) -> Result<(), TlsError> {
        let certs = rustls_pemfile::certs(&mut BufReader::new(self.certificate.as_slice()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(TlsError::Pem)?;
        if certs.is_empty() {
            return Err(TlsError::MissingCertificate);
        }

        rustls_pemfile::private_key(&mut BufReader::new(self.private_key.as_slice()))
            .map_err(TlsError::Pem)?
            .ok_or(TlsError::MissingPrivateKey)?;

        Ok(())
    }
}

impl std::fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("certificate_len", &self.certificate.len())
            .field("private_key", &"<redacted>")
            .field("generated", &self.generated)
            .finish()
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, TlsError> {
    std::fs::read(path).map_err(|source| TlsError::Read {
        path: path.to_path_buf(),
        source,
    })
}
