//! TLS support
//!
//! PEM certificate loading and the rustls server configuration behind
//! [`crate::App::serve_tls`]:
//!
//! - Certificate chains and private keys from files or memory
//! - ALPN advertising HTTP/2 and HTTP/1.1

use crate::error::Error;
use rustls::ServerConfig;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls_pemfile::{certs, private_key};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

/// TLS configuration for the HTTPS listener.
#[derive(Clone, Debug)]
pub struct TlsConfig {
    pub server_config: Arc<ServerConfig>,
}

impl TlsConfig {
    /// Build from PEM certificate-chain and private-key files.
    pub fn from_pem_files(
        cert_path: impl AsRef<Path>,
        key_path: impl AsRef<Path>,
    ) -> Result<Self, Error> {
        let certs = load_certs(cert_path.as_ref())?;
        let key = load_private_key(key_path.as_ref())?;
        Self::from_pem_parts(certs, key)
    }

    /// Build from PEM bytes already in memory.
    pub fn from_pem_bytes(cert_pem: &[u8], key_pem: &[u8]) -> Result<Self, Error> {
        let certs = parse_certs(cert_pem)?;
        let key = parse_private_key(key_pem)?;
        Self::from_pem_parts(certs, key)
    }

    fn from_pem_parts(
        certs: Vec<CertificateDer<'static>>,
        key: PrivateKeyDer<'static>,
    ) -> Result<Self, Error> {
        let mut config = ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .map_err(|e| Error::Tls(format!("failed to create TLS config: {e}")))?;

        // Advertise HTTP/2 and HTTP/1.1 via ALPN.
        config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

        Ok(Self {
            server_config: Arc::new(config),
        })
    }
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, Error> {
    let file = File::open(path)
        .map_err(|e| Error::Tls(format!("failed to open certificate file: {e}")))?;
    let mut reader = BufReader::new(file);
    certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| Error::Tls(format!("failed to parse certificates: {e}")))
}

fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, Error> {
    let file =
        File::open(path).map_err(|e| Error::Tls(format!("failed to open key file: {e}")))?;
    let mut reader = BufReader::new(file);
    private_key(&mut reader)
        .map_err(|e| Error::Tls(format!("failed to parse private key: {e}")))?
        .ok_or_else(|| Error::Tls("no private key found in file".to_string()))
}

fn parse_certs(pem: &[u8]) -> Result<Vec<CertificateDer<'static>>, Error> {
    let mut reader = BufReader::new(pem);
    certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| Error::Tls(format!("failed to parse certificates: {e}")))
}

fn parse_private_key(pem: &[u8]) -> Result<PrivateKeyDer<'static>, Error> {
    let mut reader = BufReader::new(pem);
    private_key(&mut reader)
        .map_err(|e| Error::Tls(format!("failed to parse private key: {e}")))?
        .ok_or_else(|| Error::Tls("no private key found".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pem_bytes_rejects_garbage() {
        let result = TlsConfig::from_pem_bytes(b"not a certificate", b"not a key");
        assert!(result.is_err());
    }

    #[test]
    fn test_from_pem_bytes_rejects_empty_input() {
        let result = TlsConfig::from_pem_bytes(b"", b"");
        assert!(matches!(result, Err(Error::Tls(_))));
    }

    #[test]
    fn test_from_pem_files_missing_file() {
        let result = TlsConfig::from_pem_files("/nonexistent/cert.pem", "/nonexistent/key.pem");
        assert!(matches!(result, Err(Error::Tls(_))));
    }

    #[test]
    fn test_parse_private_key_without_key_block() {
        let pem = b"-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n";
        let result = parse_private_key(pem);
        assert!(result.is_err());
    }
}
