//! Custom CA support for wss:// and https:// targets with self-signed certs.

use std::{fs::File, io::BufReader, path::Path, sync::Arc};

use rustls::{pki_types::CertificateDer, ClientConfig, RootCertStore};

use crate::error::{Error, Result};

fn ca_error(path: &Path, reason: impl ToString) -> Error {
    Error::TlsCa {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Read every certificate from a PEM bundle.
pub fn load_ca_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let file = File::open(path).map_err(|e| ca_error(path, e))?;
    let mut reader = BufReader::new(file);
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| ca_error(path, e))?;
    if certs.is_empty() {
        return Err(ca_error(path, "no certificates found"));
    }
    Ok(certs)
}

/// Client config that trusts only the given CA bundle.
pub fn client_config(path: &Path) -> Result<Arc<ClientConfig>> {
    let mut roots = RootCertStore::empty();
    for cert in load_ca_certs(path)? {
        roots.add(cert).map_err(|e| ca_error(path, e))?;
    }
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let cfg = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| ca_error(path, e))?
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(Arc::new(cfg))
}

/// Same bundle in the form reqwest expects.
pub fn reqwest_certs(path: &Path) -> Result<Vec<reqwest::Certificate>> {
    load_ca_certs(path)?
        .iter()
        .map(|der| reqwest::Certificate::from_der(der.as_ref()).map_err(Error::from))
        .collect()
}
