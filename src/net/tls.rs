//! Mutual-TLS configuration and certificate loading.
//!
//! # Responsibilities
//! - Load the trust root, server certificate chain and private key (PEM)
//! - Build a rustls server config that requires and verifies client certificates
//!
//! # Design Decisions
//! - Fail closed: an empty trust root or a policy without client auth is
//!   rejected here, never downgraded to server-only TLS
//! - TLS 1.2 is the floor; `min_version` can raise it to 1.3
//! - Cipher suite selection follows the server's preference order

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig, SupportedProtocolVersion};
use thiserror::Error;

use crate::config::{TlsPolicy, TlsVersion};

/// Invalid or unreadable TLS material.
#[derive(Debug, Error)]
pub enum TlsError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no certificate found in {0}")]
    NoCertificate(PathBuf),

    #[error("no private key found in {0}")]
    NoPrivateKey(PathBuf),

    #[error("trust root {0} holds no usable CA certificate")]
    EmptyTrustRoot(PathBuf),

    #[error("client certificate verifier: {0}")]
    Verifier(String),

    #[error("rejected by rustls: {0}")]
    Rustls(#[from] rustls::Error),

    #[error("policy violation: {0}")]
    Policy(&'static str),
}

/// Build the axum-server TLS acceptor config for `policy`.
pub fn load_mtls_config(policy: &TlsPolicy) -> Result<RustlsConfig, TlsError> {
    let config = build_server_config(policy)?;
    Ok(RustlsConfig::from_config(Arc::new(config)))
}

/// Build a rustls [`ServerConfig`] enforcing mutual TLS.
pub fn build_server_config(policy: &TlsPolicy) -> Result<ServerConfig, TlsError> {
    if !policy.client_auth_required {
        return Err(TlsError::Policy("client authentication cannot be disabled"));
    }

    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let roots = load_trust_root(&policy.ca_path)?;
    let certs = load_certs(&policy.cert_path)?;
    let key = load_private_key(&policy.key_path)?;

    let verifier = WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider.clone())
        .build()
        .map_err(|e| TlsError::Verifier(e.to_string()))?;

    let mut config = ServerConfig::builder_with_provider(provider)
        .with_protocol_versions(protocol_versions(policy.min_version))?
        .with_client_cert_verifier(verifier)
        .with_single_cert(certs, key)?;

    config.ignore_client_order = true;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    tracing::info!(
        ca = %policy.ca_path.display(),
        cert = %policy.cert_path.display(),
        min_version = ?policy.min_version,
        "Mutual TLS configured"
    );

    Ok(config)
}

static TLS13_ONLY: &[&SupportedProtocolVersion] = &[&rustls::version::TLS13];

fn protocol_versions(min: TlsVersion) -> &'static [&'static SupportedProtocolVersion] {
    match min {
        TlsVersion::Tls12 => rustls::ALL_VERSIONS,
        TlsVersion::Tls13 => TLS13_ONLY,
    }
}

fn open(path: &Path) -> Result<BufReader<File>, TlsError> {
    File::open(path).map(BufReader::new).map_err(|source| TlsError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let mut reader = open(path)?;
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| TlsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    if certs.is_empty() {
        return Err(TlsError::NoCertificate(path.to_path_buf()));
    }
    Ok(certs)
}

fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, TlsError> {
    let mut reader = open(path)?;
    rustls_pemfile::private_key(&mut reader)
        .map_err(|source| TlsError::Read {
            path: path.to_path_buf(),
            source,
        })?
        .ok_or_else(|| TlsError::NoPrivateKey(path.to_path_buf()))
}

fn load_trust_root(path: &Path) -> Result<RootCertStore, TlsError> {
    let certs = load_certs(path).map_err(|e| match e {
        TlsError::NoCertificate(p) => TlsError::EmptyTrustRoot(p),
        other => other,
    })?;
    let mut roots = RootCertStore::empty();
    let (added, ignored) = roots.add_parsable_certificates(certs);
    if ignored > 0 {
        tracing::warn!(path = %path.display(), ignored, "Skipped unparsable CA certificates");
    }
    if added == 0 {
        return Err(TlsError::EmptyTrustRoot(path.to_path_buf()));
    }
    Ok(roots)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/tls").join(name)
    }

    fn policy() -> TlsPolicy {
        TlsPolicy {
            enabled: true,
            ca_path: fixture("cacert.pem"),
            cert_path: fixture("servercert.pem"),
            key_path: fixture("serverkey.pem"),
            ..TlsPolicy::default()
        }
    }

    #[test]
    fn builds_config_from_valid_material() {
        let config = build_server_config(&policy()).unwrap();
        assert!(config.ignore_client_order);
        assert_eq!(config.alpn_protocols[0], b"h2".to_vec());
    }

    #[test]
    fn missing_file_is_read_error() {
        let mut p = policy();
        p.key_path = fixture("absent.pem");
        assert!(matches!(build_server_config(&p), Err(TlsError::Read { .. })));
    }

    #[test]
    fn key_file_without_certificate_is_empty_trust_root() {
        let mut p = policy();
        p.ca_path = fixture("serverkey.pem");
        assert!(matches!(build_server_config(&p), Err(TlsError::EmptyTrustRoot(_))));
    }

    #[test]
    fn certificate_file_without_key_rejected() {
        let mut p = policy();
        p.key_path = fixture("servercert.pem");
        assert!(matches!(build_server_config(&p), Err(TlsError::NoPrivateKey(_))));
    }

    #[test]
    fn client_auth_cannot_be_disabled() {
        let mut p = policy();
        p.client_auth_required = false;
        assert!(matches!(build_server_config(&p), Err(TlsError::Policy(_))));
    }

    #[test]
    fn tls13_floor_builds() {
        let mut p = policy();
        p.min_version = TlsVersion::Tls13;
        assert!(build_server_config(&p).is_ok());
    }
}
