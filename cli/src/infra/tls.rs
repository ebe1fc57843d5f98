//! rustls client configuration for talking to Foreman.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::domain::config::TlsSettings;

/// Client config honouring the CA bundle and client certificate settings.
///
/// Returns `None` when nothing is configured, leaving the HTTP agent on its
/// default roots.
///
/// # Errors
///
/// Returns an error if a configured PEM file cannot be read or parsed.
pub fn client_config(tls: &TlsSettings) -> Result<Option<Arc<rustls::ClientConfig>>> {
    let client_auth = match (&tls.cert, &tls.key) {
        (Some(cert), Some(key)) => Some((cert.as_path(), key.as_path())),
        _ => None,
    };
    if tls.ca.is_none() && client_auth.is_none() {
        return Ok(None);
    }

    let mut root_store = rustls::RootCertStore::empty();
    match &tls.ca {
        Some(ca_path) => {
            for cert in read_certs(ca_path)? {
                root_store
                    .add(cert)
                    .with_context(|| format!("invalid CA certificate in {}", ca_path.display()))?;
            }
        }
        None => root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned()),
    }

    let builder = rustls::ClientConfig::builder().with_root_certificates(root_store);
    let config = match client_auth {
        Some((cert_path, key_path)) => {
            let certs = read_certs(cert_path)?;
            let key_file = File::open(key_path)
                .with_context(|| format!("failed to open client key: {}", key_path.display()))?;
            let key = rustls_pemfile::private_key(&mut BufReader::new(key_file))
                .context("failed to parse client key")?
                .context("no private key found in file")?;
            builder
                .with_client_auth_cert(certs, key)
                .context("failed to build TLS config with client auth")?
        }
        None => builder.with_no_client_auth(),
    };
    Ok(Some(Arc::new(config)))
}

fn read_certs(path: &Path) -> Result<Vec<rustls::pki_types::CertificateDer<'static>>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open certificate: {}", path.display()))?;
    rustls_pemfile::certs(&mut BufReader::new(file))
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("failed to parse certificate: {}", path.display()))
}
